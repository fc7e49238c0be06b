//! End-to-end tests: full router over an in-process fake backend.

mod e2e;

use std::sync::Arc;

use axum::{Router, body::Body, http::Request, response::Response};
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use crate::{
    AppState,
    config::SessionConfig,
    directory::MemoryDirectory,
    federation::FederationGateway,
    routes,
    session::MemorySessionStore,
    store::MemoryConnectionStore,
};
use self::fake::FakeFederation;
use crate::store::ConnectionStore;

/// Fully wired application over fakes, with handles kept for assertions.
pub(crate) struct TestApp {
    router: Router,
    pub federation: Arc<FakeFederation>,
    pub store: Arc<MemoryConnectionStore>,
    pub directory: Arc<MemoryDirectory>,
    pub sessions: Arc<MemorySessionStore>,
}

impl TestApp {
    pub fn new() -> Self {
        let federation = Arc::new(FakeFederation::new());
        let store = Arc::new(MemoryConnectionStore::new());
        let directory = Arc::new(MemoryDirectory::new());
        let sessions = Arc::new(MemorySessionStore::new());

        let state = AppState::new(
            Arc::new(FederationGateway::new(federation.clone())),
            store.clone(),
            directory.clone(),
            directory.clone(),
            sessions.clone(),
            SessionConfig::default(),
        );

        Self {
            router: routes::router(state),
            federation,
            store,
            directory,
            sessions,
        }
    }

    /// Router wired like [`TestApp::new`] but over the given store, for
    /// exercising cache failure branches.
    pub fn router_with_store(
        federation: Arc<FakeFederation>,
        store: Arc<dyn ConnectionStore>,
    ) -> Router {
        let directory = Arc::new(MemoryDirectory::new());
        let state = AppState::new(
            Arc::new(FederationGateway::new(federation)),
            store,
            directory.clone(),
            directory,
            Arc::new(MemorySessionStore::new()),
            SessionConfig::default(),
        );
        routes::router(state)
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router never fails")
    }
}

pub(crate) fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

pub(crate) fn delete(uri: &str) -> Request<Body> {
    Request::builder()
        .method("DELETE")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

pub(crate) fn post_json(uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(body).unwrap()))
        .unwrap()
}

pub(crate) fn patch_json(uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method("PATCH")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(body).unwrap()))
        .unwrap()
}

pub(crate) fn post_form(uri: &str, pairs: &[(&str, &str)]) -> Request<Body> {
    let mut body = url::form_urlencoded::Serializer::new(String::new());
    for (key, value) in pairs {
        body.append_pair(key, value);
    }
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/x-www-form-urlencoded")
        .body(Body::from(body.finish()))
        .unwrap()
}

pub(crate) async fn json_body(response: Response<Body>) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

pub(crate) async fn text_body(response: Response<Body>) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}
