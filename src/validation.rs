//! Input validation for the connection lifecycle API.
//!
//! Two checks sit at the security boundary between admin-supplied input and
//! the shared federation backend:
//!
//! - `sanitize_tenant` strips everything outside `[A-Za-z0-9_-]` from the
//!   organization identifier before it is used as a store/gateway key. The
//!   backend namespaces registrations by `(tenant, product)`; an unsanitized
//!   tenant would let a caller inject into another namespace's keyspace.
//! - `is_valid_redirect_url` restricts callback URLs to HTTPS (or localhost
//!   for development) so tokens are never relayed over cleartext.

use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

static TENANT_FORBIDDEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^A-Za-z0-9_-]").expect("static regex compiles"));

/// Strip all characters outside `[A-Za-z0-9_-]` from a tenant identifier.
///
/// This is a security boundary, not cosmetics: the result is used verbatim
/// as a key in the shared federation backend.
pub fn sanitize_tenant(tenant: &str) -> String {
    TENANT_FORBIDDEN.replace_all(tenant, "").into_owned()
}

/// Whether `url` is acceptable as an SSO callback target.
///
/// Accepts HTTPS anywhere, and plain HTTP only for `localhost` (local
/// development against a real IdP).
pub fn is_valid_redirect_url(url: &str) -> bool {
    let Ok(parsed) = Url::parse(url) else {
        return false;
    };
    match parsed.scheme() {
        "https" => parsed.host_str().is_some(),
        "http" => parsed.host_str() == Some("localhost"),
        _ => false,
    }
}
