//! wardgate: enterprise SSO connection broker for ward-ops.
//!
//! Sits between organization admins, their identity providers, and the
//! shared federation backend. Admins register SAML/OIDC connections per
//! organization; staff log in through them and come out the other side with
//! a local user, an org membership, and a session cookie.

pub mod config;
pub mod directory;
pub mod federation;
pub mod identity;
pub mod models;
pub mod routes;
pub mod session;
pub mod store;
pub mod validation;

#[cfg(test)]
mod tests;

use std::sync::Arc;

use crate::{
    config::SessionConfig,
    directory::{MembershipDirectory, UserDirectory},
    federation::FederationGateway,
    identity::{IdentityResolver, SessionProvisioner},
    session::SessionStore,
    store::ConnectionStore,
};

/// Shared handles for the HTTP layer.
#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<FederationGateway>,
    pub store: Arc<dyn ConnectionStore>,
    pub resolver: Arc<IdentityResolver>,
    pub provisioner: Arc<SessionProvisioner>,
    pub session: SessionConfig,
}

impl AppState {
    /// Wire the application graph from its storage and gateway handles.
    pub fn new(
        gateway: Arc<FederationGateway>,
        store: Arc<dyn ConnectionStore>,
        users: Arc<dyn UserDirectory>,
        memberships: Arc<dyn MembershipDirectory>,
        sessions: Arc<dyn SessionStore>,
        session: SessionConfig,
    ) -> Self {
        let resolver = Arc::new(IdentityResolver::new(users));
        let provisioner = Arc::new(SessionProvisioner::new(
            sessions,
            memberships,
            session.duration_secs,
        ));
        Self {
            gateway,
            store,
            resolver,
            provisioner,
            session,
        }
    }
}
