mod connection;
mod profile;
mod user;

pub use connection::{
    CreateSsoConnection, MetadataSource, PRODUCT, SsoConnection, UpdateSsoConnection,
};
pub use profile::SsoProfile;
pub use user::{InternalRole, LocalUser, MembershipSource, OrgMembership, SsoAttributes};
