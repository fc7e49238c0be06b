//! API error type and its HTTP mapping.
//!
//! Validation errors fail fast with stable machine-readable codes.
//! Infrastructure errors keep their kind (503 vs 400 vs 404) so the admin
//! UI can distinguish retryable from terminal. Login-time protocol detail
//! is logged server-side and never sent to the browser.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::{
    federation::GatewayError,
    identity::{ProvisionError, ResolverError},
    store::StoreError,
};

/// JSON error body: `{"error": {"code": ..., "message": ...}}`.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: &'static str,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            error: ErrorBody {
                code,
                message: message.into(),
            },
        }
    }
}

#[derive(Debug)]
pub enum ApiError {
    /// Zero or both of `metadata_url` / `metadata` supplied.
    InvalidMetadataSource,
    /// Redirect URL is not HTTPS or localhost.
    InvalidRedirectUrl(String),
    /// Request payload failed validation.
    Validation(String),
    /// The federation backend rejected the IdP metadata.
    InvalidMetadata(String),
    NotFound,
    /// Connection store transient failure (retryable by the caller).
    StoreUnavailable(String),
    /// Federation backend transient failure (retryable by the caller).
    GatewayUnavailable(String),
    /// Login-time protocol failure. `description` goes to the log only;
    /// the browser sees a generic message.
    SignInFailed { description: String },
    /// User store rejected provisioning; login aborted, no session issued.
    UserProvisioningFailed(String),
}

impl From<GatewayError> for ApiError {
    fn from(e: GatewayError) -> Self {
        match e {
            GatewayError::InvalidMetadataSource => ApiError::InvalidMetadataSource,
            GatewayError::InvalidMetadata(msg) => ApiError::InvalidMetadata(msg),
            GatewayError::Protocol { description } => ApiError::SignInFailed { description },
            GatewayError::NotFound => ApiError::NotFound,
            GatewayError::Unavailable(msg) => ApiError::GatewayUnavailable(msg),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound => ApiError::NotFound,
            StoreError::Unavailable(msg) => ApiError::StoreUnavailable(msg),
        }
    }
}

impl From<ResolverError> for ApiError {
    fn from(e: ResolverError) -> Self {
        let ResolverError::ProvisioningFailed(msg) = e;
        ApiError::UserProvisioningFailed(msg)
    }
}

impl From<ProvisionError> for ApiError {
    fn from(e: ProvisionError) -> Self {
        let ProvisionError::SessionFailed(msg) = e;
        ApiError::UserProvisioningFailed(msg)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            ApiError::InvalidMetadataSource => (
                StatusCode::BAD_REQUEST,
                "invalid_metadata_source",
                "Provide exactly one of metadata_url or metadata".to_string(),
            ),
            ApiError::InvalidRedirectUrl(url) => (
                StatusCode::BAD_REQUEST,
                "invalid_redirect_url",
                format!("Redirect URL must be HTTPS or localhost: {url}"),
            ),
            ApiError::Validation(msg) => (StatusCode::BAD_REQUEST, "validation_error", msg),
            ApiError::InvalidMetadata(msg) => (
                StatusCode::BAD_REQUEST,
                "invalid_metadata",
                format!("Identity provider metadata rejected: {msg}"),
            ),
            ApiError::NotFound => (
                StatusCode::NOT_FOUND,
                "not_found",
                "Connection not found".to_string(),
            ),
            ApiError::StoreUnavailable(msg) => {
                tracing::error!(error = %msg, "Connection store unavailable");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "store_unavailable",
                    "Connection store is temporarily unavailable".to_string(),
                )
            }
            ApiError::GatewayUnavailable(msg) => {
                tracing::error!(error = %msg, "Federation backend unavailable");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "gateway_unavailable",
                    "Federation backend is temporarily unavailable".to_string(),
                )
            }
            ApiError::SignInFailed { description } => {
                // Detail stays out of the browser to avoid leaking
                // federation internals
                tracing::error!(description = %description, "SSO protocol error");
                (
                    StatusCode::UNAUTHORIZED,
                    "sign_in_failed",
                    "Sign-in failed. Please contact your administrator.".to_string(),
                )
            }
            ApiError::UserProvisioningFailed(msg) => {
                tracing::error!(error = %msg, "User provisioning failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "user_provisioning_failed",
                    "Sign-in failed. Please contact your administrator.".to_string(),
                )
            }
        };

        (status, Json(ErrorResponse::new(code, message))).into_response()
    }
}
