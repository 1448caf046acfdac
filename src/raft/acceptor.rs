use std::future::Future;
use std::io;
use std::net::TcpListener;
use std::sync::Arc;
use axum::extract::DefaultBodyLimit;
use axum::routing::post;
use axum::{middleware, Router};
use crate::raft::acceptor::authorization::{AllowAll, Authorizer, BearerTokenAuthorizer};
use crate::raft::acceptor::handlers::AcceptorState;
use crate::raft::diagnostics::{Diagnostics, TracingDiagnostics};
use crate::raft::engine::ConsensusEngine;
use crate::raft::model::state::{TransportConfig, DEFAULT_MAX_BODY_BYTES};
use crate::raft::rpc::codec::WireCodec;
use crate::raft::rpc::{Operation, RAFT_NAMESPACE};

pub mod authorization;
pub mod handlers;

/// HTTP front door of a raft node: `POST /raft/appendentries`, `/raft/requestvote` and `/raft/command`.
pub struct RaftRequestAcceptor<E: ConsensusEngine> {
    state: AcceptorState<E>,
    authorizer: Arc<dyn Authorizer>,
    max_body_bytes: usize,
}

impl<E: ConsensusEngine> RaftRequestAcceptor<E> {
    pub fn new(engine: Arc<E>, codec: WireCodec<E::Command, E::Response>) -> Self {
        Self {
            state: AcceptorState {
                engine,
                codec: Arc::new(codec),
                diagnostics: Arc::new(TracingDiagnostics::default()),
            },
            authorizer: Arc::new(AllowAll),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }

    pub fn from_config(config: &TransportConfig, engine: Arc<E>, codec: WireCodec<E::Command, E::Response>) -> Self {
        let authorizer: Arc<dyn Authorizer> = match &config.auth_token {
            Some(token) => Arc::new(BearerTokenAuthorizer::new(token.clone())),
            None => Arc::new(AllowAll),
        };
        let base_url = format!("http://{}", config.socket_addr());

        Self::new(engine, codec)
            .with_diagnostics(Arc::new(TracingDiagnostics::new(base_url)))
            .with_authorizer(authorizer)
            .with_max_body_bytes(config.max_body_bytes)
    }

    pub fn with_diagnostics(mut self, diagnostics: Arc<dyn Diagnostics>) -> Self {
        self.state.diagnostics = diagnostics;
        self
    }

    pub fn with_authorizer(mut self, authorizer: Arc<dyn Authorizer>) -> Self {
        self.authorizer = authorizer;
        self
    }

    pub fn with_max_body_bytes(mut self, max_body_bytes: usize) -> Self {
        self.max_body_bytes = max_body_bytes;
        self
    }

    pub fn router(&self) -> Router {
        let raft_routes = Router::new()
            .route(Operation::AppendEntries.route(), post(handlers::append_entries::<E>))
            .route(Operation::RequestVote.route(), post(handlers::request_vote::<E>))
            .route(Operation::Command.route(), post(handlers::command::<E>))
            .route_layer(middleware::from_fn_with_state(self.authorizer.clone(), authorization::require_authorization))
            .layer(DefaultBodyLimit::max(self.max_body_bytes))
            .with_state(self.state.clone());

        Router::new().nest(RAFT_NAMESPACE, raft_routes)
    }

    pub async fn serve(self, listener: TcpListener) -> io::Result<()> {
        self.serve_with_shutdown(listener, std::future::pending()).await
    }

    /// Every connection is served on its own task; the call returns once `signal` resolves
    /// and in-flight requests have drained.
    pub async fn serve_with_shutdown<F>(self, listener: TcpListener, signal: F) -> io::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        listener.set_nonblocking(true)?;
        let router = self.router();

        axum::Server::from_tcp(listener)
            .map_err(io::Error::other)?
            .serve(router.into_make_service())
            .with_graceful_shutdown(signal)
            .await
            .map_err(io::Error::other)
    }
}
