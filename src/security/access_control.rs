//! Path-based access control.
//!
//! Every request path is matched against a table of route patterns. Pattern
//! strings are regexes anchored at the start of the path.
//!
//! - The longest matching pattern string wins; ties go to registration order.
//! - If the winning pattern does not list the request method, access is
//!   denied, even when a shorter matching pattern would have allowed it.
//! - The caller needs ANY of the listed roles, unless the pattern is public.

use std::collections::HashSet;

use axum::http::Method;
use regex::Regex;
use thiserror::Error;

use crate::security::roles::{ROLE_ADMIN, ROLE_ADMIN_READ};

/// Error raised when the pattern table cannot be compiled at startup.
#[derive(Debug, Error)]
#[error("invalid route pattern {pattern:?}: {source}")]
pub struct PatternError {
    pub pattern: String,
    #[source]
    pub source: regex::Error,
}

/// Role requirement attached to a route pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoleRequirement {
    /// No role check; any caller may pass.
    Public,
    /// Caller must hold at least one of these roles.
    Any(Vec<String>),
}

impl RoleRequirement {
    fn allows(&self, roles: &HashSet<String>) -> bool {
        match self {
            RoleRequirement::Public => true,
            RoleRequirement::Any(required) => required.iter().any(|r| roles.contains(r)),
        }
    }
}

/// Outcome of an authorization check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessDecision {
    Allow,
    Deny,
}

/// A single rule before compilation.
#[derive(Debug, Clone)]
pub struct PermissionRule {
    pub pattern: String,
    pub methods: Vec<Method>,
    pub roles: RoleRequirement,
}

impl PermissionRule {
    /// Rule open to any caller.
    pub fn public(pattern: impl Into<String>, methods: Vec<Method>) -> Self {
        Self {
            pattern: pattern.into(),
            methods,
            roles: RoleRequirement::Public,
        }
    }

    /// Rule requiring any of the given roles.
    pub fn roles(pattern: impl Into<String>, methods: Vec<Method>, roles: &[&str]) -> Self {
        Self {
            pattern: pattern.into(),
            methods,
            roles: RoleRequirement::Any(roles.iter().map(|r| r.to_string()).collect()),
        }
    }
}

/// A compiled route pattern.
#[derive(Debug)]
struct RoutePattern {
    /// Original pattern string; its length drives match precedence.
    pattern: String,
    regex: Regex,
    methods: Vec<Method>,
    roles: RoleRequirement,
}

/// Immutable authorization table.
///
/// Built once at startup; `authorize` is a pure function of its inputs and
/// needs no locking.
#[derive(Debug)]
pub struct AccessResolver {
    patterns: Vec<RoutePattern>,
}

impl AccessResolver {
    /// Compile the pattern table. Fails fast on invalid regex syntax.
    pub fn new(rules: Vec<PermissionRule>) -> Result<Self, PatternError> {
        let mut patterns = Vec::with_capacity(rules.len());
        for rule in rules {
            let regex = Regex::new(&format!("^(?:{})", rule.pattern)).map_err(|source| {
                PatternError {
                    pattern: rule.pattern.clone(),
                    source,
                }
            })?;
            patterns.push(RoutePattern {
                pattern: rule.pattern,
                regex,
                methods: rule.methods,
                roles: rule.roles,
            });
        }
        Ok(Self { patterns })
    }

    /// Decide whether a request may proceed.
    ///
    /// Deterministic: the same path, method and role set always yield the
    /// same decision against an unchanged table.
    pub fn authorize(&self, path: &str, method: &Method, roles: &HashSet<String>) -> AccessDecision {
        match self.match_path(path) {
            Some(matched) => {
                if !matched.methods.contains(method) {
                    return AccessDecision::Deny;
                }
                if matched.roles.allows(roles) {
                    AccessDecision::Allow
                } else {
                    AccessDecision::Deny
                }
            }
            None => AccessDecision::Deny,
        }
    }

    /// Select the matching pattern with the longest pattern string.
    ///
    /// Strict `>` keeps the first registered pattern on equal lengths.
    fn match_path(&self, path: &str) -> Option<&RoutePattern> {
        let mut best: Option<&RoutePattern> = None;
        for candidate in &self.patterns {
            if !candidate.regex.is_match(path) {
                continue;
            }
            match best {
                Some(current) if candidate.pattern.len() <= current.pattern.len() => {}
                _ => best = Some(candidate),
            }
        }
        best
    }
}

/// The production permission table.
///
/// `base` serves the management endpoints, `public_base` the unauthenticated
/// state endpoints. The trailing catch-all grants read access to
/// administrators.
pub fn default_permissions(base: &str, public_base: &str) -> Vec<PermissionRule> {
    vec![
        PermissionRule::public("/status/health/?", vec![Method::GET]),
        PermissionRule::roles(format!("{base}/job/?"), vec![Method::POST], &[ROLE_ADMIN]),
        PermissionRule::roles(format!("{base}/job/.+"), vec![Method::DELETE], &[ROLE_ADMIN]),
        PermissionRule::public(
            format!("{base}/socket.io/.*"),
            vec![Method::GET, Method::POST],
        ),
        PermissionRule::public(format!("{public_base}/state/.*"), vec![Method::GET]),
        PermissionRule::roles(format!("{base}/queue/.*"), vec![Method::DELETE], &[ROLE_ADMIN]),
        PermissionRule::public(format!("{public_base}/catalogs/?"), vec![Method::GET]),
        PermissionRule::public(format!("{public_base}/queues/?"), vec![Method::GET]),
        PermissionRule::public(
            format!("{public_base}/graphql/?"),
            vec![Method::GET, Method::POST],
        ),
        PermissionRule::roles(
            "/.*",
            vec![Method::GET, Method::POST],
            &[ROLE_ADMIN, ROLE_ADMIN_READ],
        ),
    ]
}
