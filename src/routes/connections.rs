//! Connection lifecycle API: admin CRUD for a tenant's SSO connections.
//!
//! Writes follow a fixed order: federation backend first (source of truth),
//! local connection store second (cache). When the second write fails the
//! request fails, and a reconciliation line is logged so an operator can
//! re-sync the cache against the backend.

use axum::{
    Json,
    extract::{Path, State},
    http::{StatusCode, header},
    response::IntoResponse,
};
use serde::Serialize;
use url::Url;
use validator::Validate;

use super::error::ApiError;
use crate::{
    AppState,
    models::{CreateSsoConnection, SsoConnection, UpdateSsoConnection},
    store::StoreError,
    validation::{is_valid_redirect_url, sanitize_tenant},
};

/// List envelope for `GET .../connections`.
#[derive(Debug, Serialize)]
pub struct ConnectionList {
    pub data: Vec<SsoConnection>,
    /// Continuation token. Tenants hold a handful of connections, so every
    /// response is currently a single page.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_token: Option<String>,
}

/// Sanitize the path-supplied organization id into a usable tenant key.
fn tenant_from_path(org_id: &str) -> Result<String, ApiError> {
    let tenant = sanitize_tenant(org_id);
    if tenant.is_empty() {
        return Err(ApiError::Validation(
            "Organization id contains no usable characters".to_string(),
        ));
    }
    Ok(tenant)
}

/// Parse and policy-check an admin-supplied redirect URL.
fn parse_redirect_url(raw: &str) -> Result<Url, ApiError> {
    if !is_valid_redirect_url(raw) {
        return Err(ApiError::InvalidRedirectUrl(raw.to_string()));
    }
    Url::parse(raw).map_err(|_| ApiError::InvalidRedirectUrl(raw.to_string()))
}

/// `POST /organizations/{org_id}/sso/connections`
#[tracing::instrument(skip(state, input), fields(%org_id, name = %input.name))]
pub async fn create_connection(
    State(state): State<AppState>,
    Path(org_id): Path<String>,
    Json(input): Json<CreateSsoConnection>,
) -> Result<impl IntoResponse, ApiError> {
    input
        .validate()
        .map_err(|e| ApiError::Validation(e.to_string()))?;
    let tenant = tenant_from_path(&org_id)?;
    let redirect_url = parse_redirect_url(&input.redirect_url)?;

    let connection = state
        .gateway
        .create_connection(&tenant, &input, redirect_url)
        .await?;

    if let Err(e) = state.store.put(connection.clone()).await {
        // The backend registration succeeded, so the connection exists even
        // though this request fails. Leave a reconciliation record.
        tracing::error!(
            tenant = %connection.tenant,
            client_id = %connection.client_id,
            error = %e,
            "reconcile: connection registered with backend but not cached locally"
        );
        return Err(e.into());
    }

    tracing::info!(
        tenant = %connection.tenant,
        client_id = %connection.client_id,
        "SSO connection created"
    );
    Ok((StatusCode::CREATED, Json(connection)))
}

/// `GET /organizations/{org_id}/sso/connections`
#[tracing::instrument(skip(state), fields(%org_id))]
pub async fn list_connections(
    State(state): State<AppState>,
    Path(org_id): Path<String>,
) -> Result<Json<ConnectionList>, ApiError> {
    let tenant = tenant_from_path(&org_id)?;
    let data = state.store.list(&tenant).await?;
    Ok(Json(ConnectionList {
        data,
        page_token: None,
    }))
}

/// `PATCH /organizations/{org_id}/sso/connections/{client_id}`
#[tracing::instrument(skip(state, input), fields(%org_id, %client_id))]
pub async fn update_connection(
    State(state): State<AppState>,
    Path((org_id, client_id)): Path<(String, String)>,
    Json(input): Json<UpdateSsoConnection>,
) -> Result<Json<SsoConnection>, ApiError> {
    input
        .validate()
        .map_err(|e| ApiError::Validation(e.to_string()))?;
    let tenant = tenant_from_path(&org_id)?;
    let redirect_url = input
        .redirect_url
        .as_deref()
        .map(parse_redirect_url)
        .transpose()?;

    let connection = state
        .gateway
        .update_connection(&tenant, &client_id, &input, redirect_url)
        .await?;

    if let Err(e) = state.store.put(connection.clone()).await {
        tracing::error!(
            tenant = %connection.tenant,
            client_id = %connection.client_id,
            error = %e,
            "reconcile: connection updated on backend but cache refresh failed"
        );
        return Err(e.into());
    }

    tracing::info!(tenant = %connection.tenant, client_id = %connection.client_id, "SSO connection updated");
    Ok(Json(connection))
}

/// `DELETE /organizations/{org_id}/sso/connections/{client_id}`
///
/// Backend first so a failed delete never leaves a live connection the
/// admin believes is gone. A cache miss on the second step is fine; a cache
/// failure is logged for reconciliation.
#[tracing::instrument(skip(state), fields(%org_id, %client_id))]
pub async fn delete_connection(
    State(state): State<AppState>,
    Path((org_id, client_id)): Path<(String, String)>,
) -> Result<StatusCode, ApiError> {
    let tenant = tenant_from_path(&org_id)?;

    state.gateway.delete_connection(&tenant, &client_id).await?;

    match state.store.remove(&tenant, &client_id).await {
        Ok(()) | Err(StoreError::NotFound) => {}
        Err(e) => {
            tracing::error!(
                tenant = %tenant,
                client_id = %client_id,
                error = %e,
                "reconcile: connection deleted on backend but still cached locally"
            );
            return Err(e.into());
        }
    }

    tracing::info!(tenant = %tenant, client_id = %client_id, "SSO connection deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /organizations/{org_id}/sso/metadata`
///
/// This application's SP metadata XML, for the admin to hand to the IdP.
#[tracing::instrument(skip(state), fields(%org_id))]
pub async fn sp_metadata(
    State(state): State<AppState>,
    Path(org_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let tenant = tenant_from_path(&org_id)?;
    let xml = state.gateway.sp_metadata(&tenant).await?;
    Ok(([(header::CONTENT_TYPE, "application/xml")], xml))
}
