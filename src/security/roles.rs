//! Caller identity extracted from gateway headers.
//!
//! The identity-aware gateway in front of this API asserts claims as
//! `X-Auth-*` headers. Only the claims the API actually consumes get named
//! accessors; unrecognized headers are ignored.

use std::collections::HashSet;

use axum::http::HeaderMap;

/// Role granting full management access.
pub const ROLE_ADMIN: &str = "admin";

/// Role granting read-only management access.
pub const ROLE_ADMIN_READ: &str = "admin_r";

const USERID_HEADER: &str = "x-auth-userid";
const ROLES_HEADER: &str = "x-auth-roles";

/// Typed view over the auth claims of a request.
#[derive(Debug, Clone, Default)]
pub struct AuthClaims {
    userid: Option<String>,
    roles: HashSet<String>,
}

impl AuthClaims {
    /// Read the recognized claims from request headers.
    ///
    /// Malformed or missing headers yield empty claims, never an error; a
    /// request without roles simply falls through to the deny path when
    /// roles are required.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let userid = headers
            .get(USERID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.to_string());
        Self {
            userid,
            roles: extract_roles(headers),
        }
    }

    /// The asserted user id, if any.
    pub fn userid(&self) -> Option<&str> {
        self.userid.as_deref()
    }

    /// The asserted role identifiers.
    pub fn roles(&self) -> &HashSet<String> {
        &self.roles
    }
}

/// Extract the set of role identifiers asserted for the caller.
///
/// Roles arrive as a comma separated list in the roles header. Values that
/// are not valid header strings count as "no roles asserted".
pub fn extract_roles(headers: &HeaderMap) -> HashSet<String> {
    headers
        .get(ROLES_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(|v| {
            v.split(',')
                .map(str::trim)
                .filter(|r| !r.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}
