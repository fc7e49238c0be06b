//! SSO connection model.
//!
//! An `SsoConnection` binds one external identity provider (SAML or OIDC) to
//! one organization. Connections are registered with the federation backend
//! (the source of truth) and cached in the local connection store; the
//! composite identity key is `(tenant, product, client_id)`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;
use validator::Validate;

/// Fixed product namespace for this application's connections.
///
/// The federation backend is shared with other products; every registration
/// made by this broker is namespaced under this string. Callers can never
/// supply their own product — the gateway always stamps this one.
pub const PRODUCT: &str = "ward-ops";

/// Where the identity provider's metadata comes from.
///
/// Exactly one source is configured per connection; the enum makes the
/// mutual exclusion structural. Selecting one source on update clears the
/// other.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetadataSource {
    /// Metadata fetched from the IdP's published metadata endpoint.
    Url { metadata_url: Url },
    /// Raw metadata XML pasted in by the admin.
    Xml { metadata_xml: String },
}

/// A tenant-scoped identity-provider registration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SsoConnection {
    /// Owning organization, sanitized to `[A-Za-z0-9_-]+` before use.
    pub tenant: String,
    /// Product namespace, always [`PRODUCT`].
    pub product: String,
    /// Human label for the connection (e.g. "Corp AD").
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// IdP metadata source (URL or inline XML, mutually exclusive).
    #[serde(flatten)]
    pub metadata: MetadataSource,
    /// Allowed callback URLs. Non-empty; each HTTPS or localhost.
    pub redirect_urls: Vec<Url>,
    /// Member of `redirect_urls` used when the IdP supplies no target.
    pub default_redirect_url: Url,
    /// Assigned by the federation backend at creation. Opaque here.
    pub client_id: String,
    /// Assigned by the federation backend at creation. Opaque here.
    pub client_secret: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SsoConnection {
    /// Whether `url` is an exact member of the registered redirect allow-list.
    pub fn allows_redirect(&self, url: &Url) -> bool {
        self.redirect_urls.iter().any(|u| u == url)
    }
}

/// Request body for creating a connection.
///
/// `metadata_url` and `metadata` are both optional here because the wire
/// format carries two fields; the gateway folds them into [`MetadataSource`]
/// and rejects zero-or-both with `InvalidMetadataSource`.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateSsoConnection {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    #[validate(length(max = 1024))]
    pub description: Option<String>,
    /// URL of the IdP metadata endpoint.
    #[validate(url)]
    pub metadata_url: Option<String>,
    /// Raw IdP metadata XML.
    pub metadata: Option<String>,
    /// Callback URL registered for this connection. Becomes both the
    /// allow-list's first entry and the default redirect.
    #[validate(length(min = 1, max = 2048))]
    pub redirect_url: String,
}

/// Request body for updating a connection.
///
/// All fields optional; absent fields are left untouched. Supplying a
/// metadata field replaces the connection's metadata source entirely
/// (the other source is cleared), and supplying both is rejected.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateSsoConnection {
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,
    #[validate(length(max = 1024))]
    pub description: Option<String>,
    #[validate(url)]
    pub metadata_url: Option<String>,
    pub metadata: Option<String>,
    #[validate(length(min = 1, max = 2048))]
    pub redirect_url: Option<String>,
}
