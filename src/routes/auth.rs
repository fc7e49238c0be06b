//! Browser-facing SSO login routes.
//!
//! `authorize` starts an SP-initiated login by bouncing the browser to the
//! IdP. The callback routes land the browser back here, validate the
//! assertion through the gateway, resolve the profile to a local user,
//! provision a session, and redirect into the application.
//!
//! The post-login redirect target is checked against the connection's
//! registered allow-list; anything else falls back to the connection's
//! default redirect. Relay state is never followed blindly.

use axum::{
    extract::{Form, Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use tower_cookies::{Cookie, Cookies, cookie::SameSite};
use url::Url;

use super::error::ApiError;
use crate::{
    AppState,
    federation::CallbackParams,
    identity::map_roles_to_internal,
    models::SsoConnection,
    validation::sanitize_tenant,
};

#[derive(Debug, Deserialize)]
pub struct AuthorizeQuery {
    /// Organization to log in to.
    pub tenant: String,
    /// Specific connection; absent when the tenant has exactly one.
    pub client_id: Option<String>,
    /// Target URL to return to after login, round-tripped as relay state.
    pub relay_state: Option<String>,
}

/// `GET /auth/sso/authorize`
#[tracing::instrument(skip(state, query), fields(tenant = %query.tenant))]
pub async fn authorize(
    State(state): State<AppState>,
    Query(query): Query<AuthorizeQuery>,
) -> Result<Response, ApiError> {
    let tenant = sanitize_tenant(&query.tenant);
    if tenant.is_empty() {
        return Err(ApiError::Validation(
            "tenant contains no usable characters".to_string(),
        ));
    }

    let redirect = state
        .gateway
        .authorize(&tenant, query.client_id, query.relay_state)
        .await?;

    Ok(found(redirect.redirect_url.as_str()))
}

/// SAML response posted (or redirected) back by the IdP.
#[derive(Debug, Deserialize)]
pub struct SamlCallback {
    #[serde(rename = "SAMLResponse")]
    pub saml_response: String,
    #[serde(rename = "RelayState")]
    pub relay_state: Option<String>,
}

/// `POST /auth/sso/callback` (SAML HTTP-POST binding)
#[tracing::instrument(skip_all)]
pub async fn saml_acs_post(
    State(state): State<AppState>,
    cookies: Cookies,
    Form(form): Form<SamlCallback>,
) -> Result<Response, ApiError> {
    complete_login(
        &state,
        &cookies,
        CallbackParams::Saml {
            saml_response: form.saml_response,
            relay_state: form.relay_state,
        },
        "saml",
    )
    .await
}

/// `GET /auth/sso/callback` (SAML HTTP-Redirect binding)
#[tracing::instrument(skip_all)]
pub async fn saml_acs_get(
    State(state): State<AppState>,
    cookies: Cookies,
    Query(query): Query<SamlCallback>,
) -> Result<Response, ApiError> {
    complete_login(
        &state,
        &cookies,
        CallbackParams::Saml {
            saml_response: query.saml_response,
            relay_state: query.relay_state,
        },
        "saml",
    )
    .await
}

/// OIDC authorization-code callback parameters.
#[derive(Debug, Deserialize)]
pub struct OidcCallback {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

/// `GET /auth/sso/oidc`
#[tracing::instrument(skip_all)]
pub async fn oidc_callback(
    State(state): State<AppState>,
    cookies: Cookies,
    Query(query): Query<OidcCallback>,
) -> Result<Response, ApiError> {
    // The IdP reports denial/failure via `error` instead of a code
    if let Some(error) = query.error {
        let description = query.error_description.unwrap_or_default();
        return Err(ApiError::SignInFailed {
            description: format!("IdP returned error '{error}': {description}"),
        });
    }
    let code = query.code.ok_or_else(|| ApiError::SignInFailed {
        description: "OIDC callback carried neither code nor error".to_string(),
    })?;

    complete_login(
        &state,
        &cookies,
        CallbackParams::Oidc {
            code,
            state: query.state,
        },
        "oidc",
    )
    .await
}

/// Shared tail of every callback: validate, resolve, provision, redirect.
async fn complete_login(
    state: &AppState,
    cookies: &Cookies,
    params: CallbackParams,
    provider: &str,
) -> Result<Response, ApiError> {
    let resolved = state.gateway.callback(params).await?;

    // Resolve the originating connection before any session side effect,
    // so a vanished connection or a backend flake mid-login fails with
    // the same generic rendering as any other protocol failure, and no
    // cookie is issued for a login that did not complete.
    let connection = connection_for(state, &resolved.tenant, &resolved.client_id).await?;

    let user_id = state
        .resolver
        .resolve_or_create_user(&resolved.profile, provider)
        .await?;
    let role = map_roles_to_internal(&resolved.profile.roles);

    let session = state
        .provisioner
        .provision(user_id, &resolved.profile.email, &resolved.tenant, role)
        .await?;

    let cookie = Cookie::build((state.session.cookie_name.clone(), session.id.to_string()))
        .http_only(true)
        .secure(state.session.secure)
        .same_site(SameSite::Lax)
        .path("/")
        .build();
    cookies.add(cookie);

    let target = redirect_target(&connection, resolved.relay_state.as_deref());

    tracing::info!(
        user_id = %user_id,
        tenant = %resolved.tenant,
        client_id = %resolved.client_id,
        "SSO login completed"
    );
    Ok(found(target.as_str()))
}

/// Look up the connection the callback came from, preferring the local
/// cache and falling back to the backend (cold cache after restart).
///
/// A connection that cannot be found or fetched mid-login is a login
/// failure, not an API error: the browser gets the generic message.
async fn connection_for(
    state: &AppState,
    tenant: &str,
    client_id: &str,
) -> Result<SsoConnection, ApiError> {
    if let Ok(connection) = state.store.get(tenant, client_id).await {
        return Ok(connection);
    }
    state
        .gateway
        .get_connection(tenant, client_id)
        .await
        .map_err(|e| ApiError::SignInFailed {
            description: format!(
                "Connection {tenant}/{client_id} unavailable after callback: {e}"
            ),
        })
}

/// Resolve the post-login redirect.
///
/// Relay state is honored only when it parses as a URL on the connection's
/// registered allow-list (exact match). Everything else goes to the
/// connection's default redirect.
fn redirect_target(connection: &SsoConnection, relay_state: Option<&str>) -> Url {
    if let Some(raw) = relay_state {
        if let Ok(url) = Url::parse(raw)
            && connection.allows_redirect(&url)
        {
            return url;
        }
        tracing::warn!(
            tenant = %connection.tenant,
            client_id = %connection.client_id,
            relay_state = %raw,
            "Relay state not on the redirect allow-list; using default"
        );
    }
    connection.default_redirect_url.clone()
}

/// `302 Found` with a `Location` header.
fn found(location: &str) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location.to_string())]).into_response()
}
