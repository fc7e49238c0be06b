//! Scenario tests through the public HTTP surface.

use axum::http::StatusCode;
use serde_json::json;
use uuid::Uuid;

use std::sync::Arc;

use tower::ServiceExt;

use super::{
    TestApp, delete, fake::FailingConnectionStore, get, json_body, patch_json, post_form,
    post_json, text_body,
};
use crate::{
    directory::{MembershipDirectory, UserDirectory},
    federation::ResolvedCallback,
    models::{InternalRole, SsoProfile},
    session::SessionStore,
    store::ConnectionStore,
};

fn create_body() -> serde_json::Value {
    json!({
        "name": "Corp AD",
        "metadata_url": "https://idp.corp.example.com/metadata",
        "redirect_url": "https://app.example.com/home",
    })
}

fn profile(email: &str, roles: &[&str]) -> SsoProfile {
    SsoProfile {
        id: "idp-user-9".to_string(),
        email: email.to_string(),
        first_name: Some("Christine".to_string()),
        last_name: Some("Chapel".to_string()),
        roles: roles.iter().map(|r| r.to_string()).collect(),
        groups: vec![],
        raw: serde_json::Map::new(),
    }
}

/// Extract the session cookie value from a `Set-Cookie` header.
fn session_cookie(response: &axum::response::Response<axum::body::Body>) -> Option<String> {
    let header = response.headers().get("set-cookie")?.to_str().ok()?;
    let (name_value, _) = header.split_once(';')?;
    let (name, value) = name_value.split_once('=')?;
    (name == "ward_session").then(|| value.to_string())
}

// ─── Connection lifecycle ────────────────────────────────────────────────

#[tokio::test]
async fn test_create_connection_returns_scoped_record() {
    let app = TestApp::new();

    let response = app
        .send(post_json(
            "/organizations/org_123/sso/connections",
            &create_body(),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let body = json_body(response).await;
    assert_eq!(body["tenant"], "org_123");
    assert_eq!(body["product"], "ward-ops");
    assert_eq!(body["name"], "Corp AD");
    assert_eq!(body["default_redirect_url"], "https://app.example.com/home");
    assert!(body["client_id"].as_str().unwrap().starts_with("cl_"));

    // Registered with the backend and cached locally
    assert_eq!(app.federation.connection_count(), 1);
    let cached = app.store.list("org_123").await.unwrap();
    assert_eq!(cached.len(), 1);
}

#[tokio::test]
async fn test_create_ignores_caller_supplied_product() {
    let app = TestApp::new();
    let mut body = create_body();
    body["product"] = json!("some-other-product");

    let response = app
        .send(post_json("/organizations/org_123/sso/connections", &body))
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(json_body(response).await["product"], "ward-ops");
}

#[tokio::test]
async fn test_create_rejects_both_metadata_fields_without_writes() {
    let app = TestApp::new();
    let mut body = create_body();
    body["metadata"] = json!("<EntityDescriptor/>");

    let response = app
        .send(post_json("/organizations/org_123/sso/connections", &body))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        json_body(response).await["error"]["code"],
        "invalid_metadata_source"
    );

    // Fail-fast: neither the backend nor the cache saw a write
    assert_eq!(app.federation.connection_count(), 0);
    assert!(app.store.list("org_123").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_create_rejects_missing_metadata_without_writes() {
    let app = TestApp::new();
    let body = json!({
        "name": "Corp AD",
        "redirect_url": "https://app.example.com/home",
    });

    let response = app
        .send(post_json("/organizations/org_123/sso/connections", &body))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(app.federation.connection_count(), 0);
}

#[tokio::test]
async fn test_create_rejects_cleartext_redirect() {
    let app = TestApp::new();
    let mut body = create_body();
    body["redirect_url"] = json!("http://app.example.com/home");

    let response = app
        .send(post_json("/organizations/org_123/sso/connections", &body))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        json_body(response).await["error"]["code"],
        "invalid_redirect_url"
    );
    assert_eq!(app.federation.connection_count(), 0);
}

#[tokio::test]
async fn test_create_sanitizes_org_id() {
    let app = TestApp::new();

    let response = app
        .send(post_json(
            "/organizations/org..123/sso/connections",
            &create_body(),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(json_body(response).await["tenant"], "org123");
}

#[tokio::test]
async fn test_backend_metadata_rejection_surfaces_as_400() {
    let app = TestApp::new();
    *app.federation.reject_metadata.lock().unwrap() =
        Some("could not parse EntityDescriptor".to_string());

    let response = app
        .send(post_json(
            "/organizations/org_123/sso/connections",
            &create_body(),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["error"]["code"], "invalid_metadata");
}

#[tokio::test]
async fn test_create_fails_when_cache_write_fails_after_backend_success() {
    let federation = Arc::new(super::fake::FakeFederation::new());
    let router =
        TestApp::router_with_store(federation.clone(), Arc::new(FailingConnectionStore));

    let response = router
        .oneshot(post_json(
            "/organizations/org_123/sso/connections",
            &create_body(),
        ))
        .await
        .unwrap();

    // The request fails as a whole even though the backend write stuck
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(
        json_body(response).await["error"]["code"],
        "store_unavailable"
    );
    // Backend registration survives; an operator reconciles from the log
    assert_eq!(federation.connection_count(), 1);
}

#[tokio::test]
async fn test_list_is_tenant_scoped() {
    let app = TestApp::new();
    app.send(post_json(
        "/organizations/org_a/sso/connections",
        &create_body(),
    ))
    .await;

    let response = app.send(get("/organizations/org_b/sso/connections")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["data"], json!([]));

    let response = app.send(get("/organizations/org_a/sso/connections")).await;
    let body = json_body(response).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_update_renames_and_refreshes_cache() {
    let app = TestApp::new();
    let created = json_body(
        app.send(post_json(
            "/organizations/org_123/sso/connections",
            &create_body(),
        ))
        .await,
    )
    .await;
    let client_id = created["client_id"].as_str().unwrap();

    let response = app
        .send(patch_json(
            &format!("/organizations/org_123/sso/connections/{client_id}"),
            &json!({ "name": "Corp AD (prod)" }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["name"], "Corp AD (prod)");

    let cached = app.store.get("org_123", client_id).await.unwrap();
    assert_eq!(cached.name, "Corp AD (prod)");
}

#[tokio::test]
async fn test_update_rejects_both_metadata_fields() {
    let app = TestApp::new();
    let created = json_body(
        app.send(post_json(
            "/organizations/org_123/sso/connections",
            &create_body(),
        ))
        .await,
    )
    .await;
    let client_id = created["client_id"].as_str().unwrap();

    let response = app
        .send(patch_json(
            &format!("/organizations/org_123/sso/connections/{client_id}"),
            &json!({
                "metadata_url": "https://idp.example.com/md",
                "metadata": "<EntityDescriptor/>",
            }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        json_body(response).await["error"]["code"],
        "invalid_metadata_source"
    );
}

#[tokio::test]
async fn test_delete_removes_connection() {
    let app = TestApp::new();
    let created = json_body(
        app.send(post_json(
            "/organizations/org_123/sso/connections",
            &create_body(),
        ))
        .await,
    )
    .await;
    let client_id = created["client_id"].as_str().unwrap();
    let uri = format!("/organizations/org_123/sso/connections/{client_id}");

    let response = app.send(delete(&uri)).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert_eq!(app.federation.connection_count(), 0);
    assert!(app.store.list("org_123").await.unwrap().is_empty());

    // Second delete: already gone
    let response = app.send(delete(&uri)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_delete_missing_is_404_without_side_effects() {
    let app = TestApp::new();
    app.send(post_json(
        "/organizations/org_123/sso/connections",
        &create_body(),
    ))
    .await;

    let response = app
        .send(delete("/organizations/org_123/sso/connections/cl_nope"))
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(
        json_body(response).await["error"]["code"],
        "not_found"
    );
    // The existing connection is untouched
    assert_eq!(app.federation.connection_count(), 1);
    assert_eq!(app.store.list("org_123").await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_sp_metadata_is_xml() {
    let app = TestApp::new();

    let response = app.send(get("/organizations/org_123/sso/metadata")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()["content-type"].to_str().unwrap(),
        "application/xml"
    );
    let body = text_body(response).await;
    assert!(body.contains("EntityDescriptor"));
}

// ─── Login flow ──────────────────────────────────────────────────────────

#[tokio::test]
async fn test_authorize_redirects_to_idp() {
    let app = TestApp::new();

    let response = app
        .send(get("/auth/sso/authorize?tenant=org_123"))
        .await;
    assert_eq!(response.status(), StatusCode::FOUND);
    let location = response.headers()["location"].to_str().unwrap();
    assert!(location.starts_with("https://idp.example.com/sso"));
    assert!(location.contains("tenant=org_123"));
}

#[tokio::test]
async fn test_login_creates_user_membership_and_session() {
    let app = TestApp::new();
    let created = json_body(
        app.send(post_json(
            "/organizations/org_123/sso/connections",
            &create_body(),
        ))
        .await,
    )
    .await;
    let client_id = created["client_id"].as_str().unwrap().to_string();

    app.federation.script_callback(ResolvedCallback {
        profile: profile("nurse.chapel@hospital.com", &["user"]),
        tenant: "org_123".to_string(),
        client_id,
        relay_state: None,
    });

    let response = app
        .send(post_form(
            "/auth/sso/callback",
            &[("SAMLResponse", "PHNhbWxwOlJlc3BvbnNlLz4=")],
        ))
        .await;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(
        response.headers()["location"].to_str().unwrap(),
        "https://app.example.com/home"
    );

    // User was JIT-provisioned without a password credential
    let user = app
        .directory
        .find_by_email("nurse.chapel@hospital.com")
        .await
        .unwrap()
        .expect("user exists");
    assert!(!user.has_password);
    assert_eq!(user.metadata["created_via_sso"], json!(true));

    // Membership at the mapped role
    let membership = app
        .directory
        .get_membership(user.id, "org_123")
        .await
        .unwrap()
        .expect("membership exists");
    assert_eq!(membership.role, InternalRole::Member);

    // Cookie references a live session for this tenant
    let cookie = session_cookie(&response).expect("session cookie set");
    let session_id = Uuid::parse_str(&cookie).unwrap();
    let session = app.sessions.get(session_id).await.unwrap();
    assert_eq!(session.user_id, user.id);
    assert_eq!(session.tenant, "org_123");
}

#[tokio::test]
async fn test_login_maps_admin_role() {
    let app = TestApp::new();
    let created = json_body(
        app.send(post_json(
            "/organizations/org_123/sso/connections",
            &create_body(),
        ))
        .await,
    )
    .await;
    let client_id = created["client_id"].as_str().unwrap().to_string();

    app.federation.script_callback(ResolvedCallback {
        profile: profile("head.nurse@hospital.com", &["Administrator"]),
        tenant: "org_123".to_string(),
        client_id,
        relay_state: None,
    });

    let response = app
        .send(post_form("/auth/sso/callback", &[("SAMLResponse", "x")]))
        .await;
    assert_eq!(response.status(), StatusCode::FOUND);

    let user = app
        .directory
        .find_by_email("head.nurse@hospital.com")
        .await
        .unwrap()
        .unwrap();
    let membership = app
        .directory
        .get_membership(user.id, "org_123")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(membership.role, InternalRole::Admin);
}

#[tokio::test]
async fn test_login_relay_state_must_be_allow_listed() {
    let app = TestApp::new();
    let created = json_body(
        app.send(post_json(
            "/organizations/org_123/sso/connections",
            &create_body(),
        ))
        .await,
    )
    .await;
    let client_id = created["client_id"].as_str().unwrap().to_string();

    app.federation.script_callback(ResolvedCallback {
        profile: profile("nurse.chapel@hospital.com", &[]),
        tenant: "org_123".to_string(),
        client_id,
        relay_state: Some("https://evil.example.com/phish".to_string()),
    });

    let response = app
        .send(post_form("/auth/sso/callback", &[("SAMLResponse", "x")]))
        .await;
    assert_eq!(response.status(), StatusCode::FOUND);
    // Off-list relay state falls back to the registered default
    assert_eq!(
        response.headers()["location"].to_str().unwrap(),
        "https://app.example.com/home"
    );
}

#[tokio::test]
async fn test_vanished_connection_mid_login_is_generic_and_cookieless() {
    let app = TestApp::new();
    // Callback validates, but the connection it names no longer exists
    app.federation.script_callback(ResolvedCallback {
        profile: profile("nurse.chapel@hospital.com", &[]),
        tenant: "org_123".to_string(),
        client_id: "cl_ghost".to_string(),
        relay_state: None,
    });

    let response = app
        .send(post_form("/auth/sso/callback", &[("SAMLResponse", "x")]))
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(response.headers().get("set-cookie").is_none());
    assert_eq!(json_body(response).await["error"]["code"], "sign_in_failed");

    // Failing before provisioning means no half-logged-in user either
    let user = app
        .directory
        .find_by_email("nurse.chapel@hospital.com")
        .await
        .unwrap();
    assert!(user.is_none());
}

#[tokio::test]
async fn test_protocol_failure_is_generic_to_the_browser() {
    let app = TestApp::new();
    // No scripted callback: behaves like a signature verification failure

    let response = app
        .send(post_form("/auth/sso/callback", &[("SAMLResponse", "bad")]))
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = json_body(response).await;
    assert_eq!(body["error"]["code"], "sign_in_failed");
    // Backend detail is logged, never returned
    assert!(
        !body["error"]["message"]
            .as_str()
            .unwrap()
            .contains("signature")
    );
}

#[tokio::test]
async fn test_oidc_error_param_is_generic_to_the_browser() {
    let app = TestApp::new();

    let response = app
        .send(get(
            "/auth/sso/oidc?error=access_denied&error_description=user+cancelled",
        ))
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = json_body(response).await;
    assert_eq!(body["error"]["code"], "sign_in_failed");
    assert!(
        !body["error"]["message"]
            .as_str()
            .unwrap()
            .contains("cancelled")
    );
}

#[tokio::test]
async fn test_oidc_code_callback_logs_in() {
    let app = TestApp::new();
    let created = json_body(
        app.send(post_json(
            "/organizations/org_123/sso/connections",
            &create_body(),
        ))
        .await,
    )
    .await;
    let client_id = created["client_id"].as_str().unwrap().to_string();

    app.federation.script_callback(ResolvedCallback {
        profile: profile("dr.crusher@hospital.com", &[]),
        tenant: "org_123".to_string(),
        client_id,
        relay_state: None,
    });

    let response = app.send(get("/auth/sso/oidc?code=authcode123")).await;
    assert_eq!(response.status(), StatusCode::FOUND);

    let user = app
        .directory
        .find_by_email("dr.crusher@hospital.com")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(user.metadata["sso_provider"], json!("oidc"));
}

#[tokio::test]
async fn test_health() {
    let app = TestApp::new();
    let response = app.send(get("/health")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["status"], "ok");
}
