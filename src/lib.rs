use std::io;
use std::sync::Arc;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};
use crate::raft::acceptor::RaftRequestAcceptor;
use crate::raft::engine::ConsensusEngine;
use crate::raft::model::state::TransportConfig;
use crate::raft::rpc::codec::WireCodec;

pub mod raft;

/// Binds the configured address and serves the raft routes until ctrl-c.
pub async fn start<E: ConsensusEngine>(
    node_config: TransportConfig,
    engine: Arc<E>,
    codec: WireCodec<E::Command, E::Response>,
) -> io::Result<()> {
    let addr = node_config.socket_addr();
    let listener = std::net::TcpListener::bind(addr)?;
    tracing::info!("Raft node with id {} listening on {addr}!", node_config.node_id);

    RaftRequestAcceptor::from_config(&node_config, engine, codec)
        .serve_with_shutdown(listener, shutdown_signal())
        .await
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("Received ctrl-c, shutting down..."),
        Err(error) => {
            tracing::error!("Unable to listen for ctrl-c: {error}");
            std::future::pending::<()>().await
        }
    }
}

pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(env_filter)
        .init();
}
