//! Federation gateway: the broker's adapter over the protocol backend.
//!
//! The gateway owns two invariants the rest of the crate relies on:
//!
//! 1. **Scoping.** Every backend call carries the sanitized tenant and the
//!    fixed [`PRODUCT`] namespace. A caller-supplied product is never
//!    forwarded.
//! 2. **Singleton init.** The underlying backend handle is a process-wide
//!    singleton, lazily constructed on first use behind a single-flight
//!    guard. Tests bypass the singleton with [`FederationGateway::new`].

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::OnceCell;
use url::Url;

use super::{
    remote::HttpFederationService,
    service::{
        AuthorizeRedirect, AuthorizeRequest, CallbackParams, ConnectionParams, ConnectionPatch,
        FederationError, FederationService, ResolvedCallback,
    },
};
use crate::{
    config::FederationConfig,
    models::{CreateSsoConnection, MetadataSource, PRODUCT, SsoConnection, UpdateSsoConnection},
};

/// Errors surfaced by gateway operations.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Caller supplied zero or both of `metadata_url` / `metadata`.
    /// Rejected before any backend or store write.
    #[error("Provide exactly one of metadata_url or metadata")]
    InvalidMetadataSource,

    /// The backend rejected the IdP metadata. Carries the backend's
    /// description, re-wrapped; never a raw error chain.
    #[error("Invalid identity provider metadata: {0}")]
    InvalidMetadata(String),

    /// Login-time protocol failure. `description` is for server logs only.
    #[error("Sign-in failed")]
    Protocol { description: String },

    #[error("Connection not found")]
    NotFound,

    #[error("Federation backend unavailable: {0}")]
    Unavailable(String),
}

impl From<FederationError> for GatewayError {
    fn from(e: FederationError) -> Self {
        match e {
            FederationError::InvalidMetadata(desc) => GatewayError::InvalidMetadata(desc),
            FederationError::Protocol { description } => GatewayError::Protocol { description },
            FederationError::NotFound => GatewayError::NotFound,
            FederationError::Unavailable(msg) => GatewayError::Unavailable(msg),
        }
    }
}

pub type GatewayResult<T> = Result<T, GatewayError>;

/// Process-wide gateway handle. See [`FederationGateway::shared`].
static SHARED_GATEWAY: OnceCell<Arc<FederationGateway>> = OnceCell::const_new();

/// Adapter over the federation backend with tenant/product scoping.
pub struct FederationGateway {
    service: Arc<dyn FederationService>,
}

impl FederationGateway {
    /// Construct a gateway over an injected backend. This is the seam unit
    /// tests use to substitute a fake service.
    pub fn new(service: Arc<dyn FederationService>) -> Self {
        Self { service }
    }

    /// The process-wide gateway, lazily constructed on first use.
    ///
    /// The backend mandates one instance per process; `OnceCell` gives the
    /// double-checked, single-flight initialization so concurrent first
    /// callers cannot construct two handles against the same database.
    /// The first caller's config wins; later configs are ignored.
    pub async fn shared(config: &FederationConfig) -> GatewayResult<Arc<Self>> {
        SHARED_GATEWAY
            .get_or_try_init(|| async {
                let service = HttpFederationService::connect(config).await?;
                tracing::info!(base_url = %config.base_url, "Federation backend initialized");
                Ok::<_, GatewayError>(Arc::new(Self::new(Arc::new(service))))
            })
            .await
            .cloned()
    }

    /// Register a new connection with the backend.
    ///
    /// Folds the two optional wire fields into [`MetadataSource`],
    /// rejecting zero-or-both before anything is written.
    pub async fn create_connection(
        &self,
        tenant: &str,
        input: &CreateSsoConnection,
        redirect_url: Url,
    ) -> GatewayResult<SsoConnection> {
        let metadata =
            resolve_metadata_source(input.metadata_url.as_deref(), input.metadata.as_deref())?
                .ok_or(GatewayError::InvalidMetadataSource)?;

        let connection = self
            .service
            .create_connection(ConnectionParams {
                tenant: tenant.to_string(),
                product: PRODUCT.to_string(),
                name: input.name.clone(),
                description: input.description.clone(),
                metadata,
                redirect_urls: vec![redirect_url.clone()],
                default_redirect_url: redirect_url,
            })
            .await?;

        Ok(connection)
    }

    pub async fn get_connection(
        &self,
        tenant: &str,
        client_id: &str,
    ) -> GatewayResult<SsoConnection> {
        Ok(self
            .service
            .get_connection(tenant, PRODUCT, client_id)
            .await?)
    }

    pub async fn get_connections(&self, tenant: &str) -> GatewayResult<Vec<SsoConnection>> {
        Ok(self.service.get_connections(tenant, PRODUCT).await?)
    }

    /// Apply a partial update, re-validating the metadata mutual exclusion.
    ///
    /// Supplying one metadata field replaces the connection's metadata
    /// source (the other variant is cleared by construction); supplying
    /// both is rejected.
    pub async fn update_connection(
        &self,
        tenant: &str,
        client_id: &str,
        input: &UpdateSsoConnection,
        redirect_url: Option<Url>,
    ) -> GatewayResult<SsoConnection> {
        let metadata =
            resolve_metadata_source(input.metadata_url.as_deref(), input.metadata.as_deref())?;

        let patch = ConnectionPatch {
            name: input.name.clone(),
            description: input.description.clone(),
            metadata,
            redirect_urls: redirect_url.clone().map(|u| vec![u]),
            default_redirect_url: redirect_url,
        };

        Ok(self
            .service
            .update_connection(tenant, PRODUCT, client_id, patch)
            .await?)
    }

    pub async fn delete_connection(&self, tenant: &str, client_id: &str) -> GatewayResult<()> {
        Ok(self
            .service
            .delete_connection(tenant, PRODUCT, client_id)
            .await?)
    }

    /// This application's SP metadata XML for the tenant.
    pub async fn sp_metadata(&self, tenant: &str) -> GatewayResult<String> {
        Ok(self.service.sp_metadata(tenant, PRODUCT).await?)
    }

    /// Start a login: returns the IdP redirect for the browser.
    pub async fn authorize(
        &self,
        tenant: &str,
        client_id: Option<String>,
        relay_state: Option<String>,
    ) -> GatewayResult<AuthorizeRedirect> {
        Ok(self
            .service
            .authorize(AuthorizeRequest {
                tenant: tenant.to_string(),
                product: PRODUCT.to_string(),
                client_id,
                relay_state,
            })
            .await?)
    }

    /// Validate an IdP callback and return the resolved profile.
    pub async fn callback(&self, params: CallbackParams) -> GatewayResult<ResolvedCallback> {
        Ok(self.service.callback(params).await?)
    }
}

/// Fold the two wire-level metadata fields into the structural enum.
///
/// Returns `Ok(None)` when neither field is present (legal for updates),
/// and `InvalidMetadataSource` when both are.
fn resolve_metadata_source(
    metadata_url: Option<&str>,
    metadata_xml: Option<&str>,
) -> GatewayResult<Option<MetadataSource>> {
    match (metadata_url, metadata_xml) {
        (Some(_), Some(_)) => Err(GatewayError::InvalidMetadataSource),
        (Some(url), None) => {
            let metadata_url = Url::parse(url)
                .map_err(|e| GatewayError::InvalidMetadata(format!("Invalid metadata URL: {e}")))?;
            Ok(Some(MetadataSource::Url { metadata_url }))
        }
        (None, Some(xml)) => {
            if xml.trim().is_empty() {
                return Err(GatewayError::InvalidMetadataSource);
            }
            Ok(Some(MetadataSource::Xml {
                metadata_xml: xml.to_string(),
            }))
        }
        (None, None) => Ok(None),
    }
}
