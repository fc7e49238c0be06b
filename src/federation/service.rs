//! The opaque federation-protocol backend, modeled as a trait.
//!
//! The actual SAML/OIDC machinery (assertion validation, XML
//! canonicalization, certificate checks) lives in an external backend. This
//! trait is the capability surface the broker needs from it: register and
//! manage connections, hand out SP metadata, and "validate assertion,
//! return profile". [`super::remote::HttpFederationService`] talks to a
//! remote backend; tests inject fakes.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::models::{MetadataSource, SsoConnection, SsoProfile};

/// Errors surfaced by the federation backend.
#[derive(Debug, Error)]
pub enum FederationError {
    /// The backend rejected the IdP metadata (malformed XML, unreachable
    /// URL, bad certificate). The description is the backend's own, safe
    /// to show to an admin.
    #[error("Invalid identity provider metadata: {0}")]
    InvalidMetadata(String),

    /// Login-time protocol failure (expired request, signature mismatch).
    /// The description is logged server-side only, never shown to the
    /// browser.
    #[error("Federation protocol error: {description}")]
    Protocol { description: String },

    #[error("Connection not found")]
    NotFound,

    /// Transient backend/transport failure.
    #[error("Federation backend unavailable: {0}")]
    Unavailable(String),
}

pub type FederationResult<T> = Result<T, FederationError>;

/// Fully-validated parameters for registering a connection.
///
/// By the time this struct exists, the tenant is sanitized, the product is
/// stamped by the gateway, and the metadata mutual exclusion has been
/// resolved into [`MetadataSource`].
#[derive(Debug, Clone, Serialize)]
pub struct ConnectionParams {
    pub tenant: String,
    pub product: String,
    pub name: String,
    pub description: Option<String>,
    #[serde(flatten)]
    pub metadata: MetadataSource,
    pub redirect_urls: Vec<Url>,
    pub default_redirect_url: Url,
}

/// Partial update for an existing connection. `None` fields are untouched.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ConnectionPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Replaces the metadata source entirely (the other variant is cleared
    /// by construction).
    #[serde(flatten)]
    pub metadata: Option<MetadataSource>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect_urls: Option<Vec<Url>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_redirect_url: Option<Url>,
}

/// Parameters for starting a login (SP-initiated).
#[derive(Debug, Clone, Serialize)]
pub struct AuthorizeRequest {
    pub tenant: String,
    pub product: String,
    /// Specific connection to use; when absent the backend picks the
    /// tenant's sole connection.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    /// Opaque state echoed back on the callback (RelayState / `state`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relay_state: Option<String>,
}

/// Where to send the browser to authenticate.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthorizeRedirect {
    pub redirect_url: Url,
}

/// Raw callback parameters from the IdP, per protocol.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "protocol", rename_all = "snake_case")]
pub enum CallbackParams {
    /// SAML HTTP-POST binding (Assertion Consumer Service).
    Saml {
        saml_response: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        relay_state: Option<String>,
    },
    /// OIDC authorization-code callback.
    Oidc {
        code: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        state: Option<String>,
    },
}

/// Result of a validated callback: the normalized profile plus the
/// connection that produced it.
#[derive(Debug, Clone, Deserialize)]
pub struct ResolvedCallback {
    pub profile: SsoProfile,
    pub tenant: String,
    pub client_id: String,
    /// Relay/target state echoed back by the IdP, if any.
    #[serde(default)]
    pub relay_state: Option<String>,
}

/// The external protocol library's capability surface.
///
/// One instance exists per process (the backend mandates it); see
/// [`super::gateway::FederationGateway::shared`].
#[async_trait]
pub trait FederationService: Send + Sync {
    async fn create_connection(&self, params: ConnectionParams) -> FederationResult<SsoConnection>;

    async fn get_connection(
        &self,
        tenant: &str,
        product: &str,
        client_id: &str,
    ) -> FederationResult<SsoConnection>;

    async fn get_connections(
        &self,
        tenant: &str,
        product: &str,
    ) -> FederationResult<Vec<SsoConnection>>;

    async fn update_connection(
        &self,
        tenant: &str,
        product: &str,
        client_id: &str,
        patch: ConnectionPatch,
    ) -> FederationResult<SsoConnection>;

    async fn delete_connection(
        &self,
        tenant: &str,
        product: &str,
        client_id: &str,
    ) -> FederationResult<()>;

    /// This application's SP metadata XML for the tenant, for admins to
    /// hand to the IdP side.
    async fn sp_metadata(&self, tenant: &str, product: &str) -> FederationResult<String>;

    async fn authorize(&self, request: AuthorizeRequest) -> FederationResult<AuthorizeRedirect>;

    async fn callback(&self, params: CallbackParams) -> FederationResult<ResolvedCallback>;
}
