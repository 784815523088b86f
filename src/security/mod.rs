//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → roles.rs (read X-Auth-* claims from gateway headers)
//!     → access_control.rs (match path against pattern table, check
//!       method and roles)
//!     → Allow: pass to handler with claims attached
//!     → Deny: fixed "Forbidden" 403, no detail leaked
//! ```
//!
//! # Design Decisions
//! - Pattern table is compiled eagerly at startup and immutable afterwards
//! - A denied request never learns which pattern matched or why
//! - Missing or malformed claims mean "no roles", not an error

pub mod access_control;
pub mod roles;

pub use access_control::{
    default_permissions, AccessDecision, AccessResolver, PatternError, PermissionRule,
    RoleRequirement,
};
pub use roles::{extract_roles, AuthClaims, ROLE_ADMIN, ROLE_ADMIN_READ};
