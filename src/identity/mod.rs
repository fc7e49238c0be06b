//! Identity resolution and session provisioning for SSO logins.

mod provisioner;
mod resolver;

pub use provisioner::{ProvisionError, SessionProvisioner};
pub use resolver::{IdentityResolver, ResolverError, map_roles_to_internal};
