//! Federation gateway and the opaque protocol backend behind it.

mod gateway;
mod remote;
pub mod service;

pub use gateway::{FederationGateway, GatewayError, GatewayResult};
pub use remote::HttpFederationService;
pub use service::{
    AuthorizeRedirect, AuthorizeRequest, CallbackParams, ConnectionParams, ConnectionPatch,
    FederationError, FederationResult, FederationService, ResolvedCallback,
};
