//! Authorization middleware.
//!
//! Runs before every handler. A denied request gets a fixed generic
//! response; nothing about the matched pattern leaks to the caller.

use std::time::Instant;

use axum::{
    body::Body,
    extract::State,
    http::{Method, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::http::server::AppState;
use crate::observability::metrics;
use crate::security::{AccessDecision, AuthClaims};

pub async fn authorize_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    // Cross-origin preflight never reaches the resolver.
    if req.method() == Method::OPTIONS {
        return next.run(req).await;
    }

    let start = Instant::now();
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let claims = AuthClaims::from_headers(req.headers());

    match state.resolver.authorize(&path, &method, claims.roles()) {
        AccessDecision::Allow => {
            req.extensions_mut().insert(claims);
            let response = next.run(req).await;
            metrics::record_request(method.as_str(), response.status().as_u16(), start);
            response
        }
        AccessDecision::Deny => {
            tracing::debug!(method = %method, path = %path, "request denied");
            metrics::record_forbidden();
            metrics::record_request(method.as_str(), StatusCode::FORBIDDEN.as_u16(), start);
            (StatusCode::FORBIDDEN, "Forbidden").into_response()
        }
    }
}
