//! Local user, role, and membership models.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Internal role enum every external role string maps into.
///
/// Variant order matters: `Member < Admin < Owner` is the ordering used by
/// the membership no-downgrade rule.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum InternalRole {
    #[default]
    Member,
    Admin,
    Owner,
}

impl InternalRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Member => "member",
            Self::Admin => "admin",
            Self::Owner => "owner",
        }
    }
}

impl fmt::Display for InternalRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Source of a membership (how it was created).
///
/// JIT memberships come from SSO logins; manual ones from admin action.
/// The distinction matters for later reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MembershipSource {
    #[default]
    Manual,
    Jit,
}

/// Durable local user record as seen through the directory seam.
///
/// The wider application owns this record; the broker only reads and merges
/// into it. `metadata` is the application's free-form bag — SSO fields are
/// merged in via [`SsoAttributes`] without disturbing unrelated keys.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalUser {
    pub id: Uuid,
    pub email: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    /// False for SSO-only accounts (no password credential exists).
    pub has_password: bool,
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A user's membership in an organization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrgMembership {
    pub user_id: Uuid,
    pub tenant: String,
    pub role: InternalRole,
    pub source: MembershipSource,
    pub joined_at: DateTime<Utc>,
}

/// Typed view of the SSO fields stored in the user metadata bag.
///
/// The bag itself is dynamic (the application stores its own keys there);
/// this struct names the keys the broker owns and merges them in without
/// replacing the rest of the bag.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SsoAttributes {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sso_provider: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sso_user_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sso_roles: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sso_groups: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_sso_login: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_via_sso: Option<bool>,
}

impl SsoAttributes {
    /// Merge these attributes into `bag`, overwriting only the keys this
    /// struct carries a value for. Unrelated keys are left intact.
    pub fn merge_into(&self, bag: &mut serde_json::Map<String, serde_json::Value>) {
        let serde_json::Value::Object(fields) =
            serde_json::to_value(self).expect("SsoAttributes serializes to an object")
        else {
            unreachable!("struct serialization always yields an object");
        };
        for (key, value) in fields {
            bag.insert(key, value);
        }
    }
}
