use std::sync::Arc;
use axum::extract::State;
use axum::http::header::AUTHORIZATION;
use axum::http::{HeaderMap, Request};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use crate::raft::rpc::error::RpcError;

/// Access check run before any raft route sees the request.
pub trait Authorizer: Send + Sync + 'static {
    fn authorize(&self, headers: &HeaderMap) -> bool;
}

/// Accepts every caller; used when no shared secret is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl Authorizer for AllowAll {
    fn authorize(&self, _headers: &HeaderMap) -> bool {
        true
    }
}

#[derive(Debug, Clone)]
pub struct BearerTokenAuthorizer {
    token: String,
}

impl BearerTokenAuthorizer {
    pub fn new(token: impl Into<String>) -> Self {
        Self { token: token.into() }
    }
}

impl Authorizer for BearerTokenAuthorizer {
    fn authorize(&self, headers: &HeaderMap) -> bool {
        headers.get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .is_some_and(|token| token == self.token)
    }
}

pub(crate) async fn require_authorization<B>(
    State(authorizer): State<Arc<dyn Authorizer>>,
    request: Request<B>,
    next: Next<B>,
) -> Response
where
    B: Send + 'static,
{
    if !authorizer.authorize(request.headers()) {
        tracing::warn!("Rejecting unauthorized call to {}", request.uri().path());
        return RpcError::Unauthorized.into_response();
    }

    next.run(request).await
}
