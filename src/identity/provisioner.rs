//! Session provisioner: resolved user → authenticated session + membership.

use std::sync::Arc;

use thiserror::Error;
use uuid::Uuid;

use crate::{
    directory::{DirectoryError, MembershipDirectory},
    models::{InternalRole, OrgMembership},
    session::{Session, SessionStore, new_session},
};

#[derive(Debug, Error)]
pub enum ProvisionError {
    /// Session creation failed. Fatal: the login aborts.
    #[error("Failed to establish session: {0}")]
    SessionFailed(String),
}

/// Issues sessions and organization memberships after a resolved login.
pub struct SessionProvisioner {
    sessions: Arc<dyn SessionStore>,
    memberships: Arc<dyn MembershipDirectory>,
    session_duration_secs: u64,
}

impl SessionProvisioner {
    pub fn new(
        sessions: Arc<dyn SessionStore>,
        memberships: Arc<dyn MembershipDirectory>,
        session_duration_secs: u64,
    ) -> Self {
        Self {
            sessions,
            memberships,
            session_duration_secs,
        }
    }

    /// Establish a session and ensure org membership for a resolved user.
    ///
    /// Session creation is fatal on failure. Membership provisioning is
    /// NOT: a user can authenticate without organization membership and be
    /// added later by an admin, so a membership failure is logged for
    /// reconciliation and the session is returned anyway. This asymmetry
    /// is deliberate.
    #[tracing::instrument(skip(self), fields(%user_id, %tenant, %role))]
    pub async fn provision(
        &self,
        user_id: Uuid,
        email: &str,
        tenant: &str,
        role: InternalRole,
    ) -> Result<Session, ProvisionError> {
        let session = self.establish_session(user_id, email, tenant).await?;

        if let Err(e) = self.ensure_org_membership(user_id, tenant, role).await {
            tracing::warn!(
                user_id = %user_id,
                tenant = %tenant,
                error = %e,
                "Membership provisioning failed; login proceeds without org context"
            );
        }

        Ok(session)
    }

    /// Create and persist a session for the user.
    pub async fn establish_session(
        &self,
        user_id: Uuid,
        email: &str,
        tenant: &str,
    ) -> Result<Session, ProvisionError> {
        let session = new_session(user_id, email, tenant, self.session_duration_secs);
        self.sessions
            .create(session.clone())
            .await
            .map_err(|e| ProvisionError::SessionFailed(e.to_string()))?;
        tracing::info!(session_id = %session.id, user_id = %user_id, "Session established");
        Ok(session)
    }

    /// Idempotently ensure the user is a member of the organization.
    ///
    /// Re-sync policy for a changed SSO role on a later login: upgrades are
    /// applied, downgrades are not. The no-downgrade half is contractual
    /// (an admin-granted role must survive an IdP that under-reports);
    /// allowing upgrades is our choice, so a user promoted on the IdP side
    /// does not stay stranded at their first-login role.
    pub async fn ensure_org_membership(
        &self,
        user_id: Uuid,
        tenant: &str,
        role: InternalRole,
    ) -> Result<(), DirectoryError> {
        match self.memberships.get_membership(user_id, tenant).await? {
            Some(existing) => {
                if role > existing.role {
                    self.memberships.update_role(user_id, tenant, role).await?;
                    tracing::info!(
                        user_id = %user_id,
                        tenant = %tenant,
                        from = %existing.role,
                        to = %role,
                        "Upgraded org membership role from SSO login"
                    );
                }
                Ok(())
            }
            None => {
                match self
                    .memberships
                    .insert_membership(OrgMembership::jit(user_id, tenant, role))
                    .await
                {
                    Ok(()) => Ok(()),
                    // Concurrent login created it first; apply the same
                    // upgrade-only rule against the winner's record.
                    Err(DirectoryError::Conflict(_)) => {
                        if let Some(existing) =
                            self.memberships.get_membership(user_id, tenant).await?
                            && role > existing.role
                        {
                            self.memberships.update_role(user_id, tenant, role).await?;
                        }
                        Ok(())
                    }
                    Err(e) => Err(e),
                }
            }
        }
    }
}
