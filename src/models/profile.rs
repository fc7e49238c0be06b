//! Normalized identity profile produced by the federation backend.

use serde::{Deserialize, Serialize};

/// Claims extracted from a validated SAML assertion or OIDC token.
///
/// Transient: produced once per login and consumed by the identity resolver.
/// `email` is the cross-system join key and is required; everything else is
/// best-effort depending on what the IdP releases.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SsoProfile {
    /// Provider-side subject identifier (NameID / `sub`).
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(default)]
    pub groups: Vec<String>,
    /// Full provider claims, preserved untouched for audit.
    #[serde(default)]
    pub raw: serde_json::Map<String, serde_json::Value>,
}
