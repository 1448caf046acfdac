use std::sync::Arc;
use clap::Parser;
use raft_transport::raft::engine::in_memory::InMemoryEngine;
use raft_transport::raft::model::state::{TransportConfig, DEFAULT_MAX_BODY_BYTES, DEFAULT_PORT};
use raft_transport::raft::rpc::application::dto::kv_codec;

#[derive(Parser, Debug)]
#[command(version, about = "Serves the raft RPC routes of a key-value node", long_about = None)]
struct CliArgs {
    #[arg(short, long)]
    node_id: String,

    #[arg(short, long, default_value_t = DEFAULT_PORT)]
    port: u16,

    #[arg(long, default_value = "127.0.0.1")]
    bind_address: std::net::Ipv4Addr,

    /// Bearer token callers must present; when unset every caller is accepted.
    #[arg(long, env = "RAFT_AUTH_TOKEN")]
    auth_token: Option<String>,

    #[arg(long, default_value_t = DEFAULT_MAX_BODY_BYTES)]
    max_body_bytes: usize,

    /// Start as a follower instead of a single-node leader.
    #[arg(long)]
    follower: bool,
}

fn build_transport_config(cli_args: &CliArgs) -> TransportConfig {
    TransportConfig {
        node_id: cli_args.node_id.clone(),
        bind_address: cli_args.bind_address.octets(),
        port: cli_args.port,
        auth_token: cli_args.auth_token.clone(),
        max_body_bytes: cli_args.max_body_bytes,
    }
}

#[tokio::main]
async fn main() {
    let cli_args = CliArgs::parse();
    let node_config = build_transport_config(&cli_args);

    raft_transport::init_tracing();
    tracing::info!("Starting server...");

    let engine = if cli_args.follower {
        InMemoryEngine::new(node_config.node_id.clone())
    } else {
        InMemoryEngine::single_node(node_config.node_id.clone())
    };

    if let Err(error) = raft_transport::start(node_config, Arc::new(engine), kv_codec()).await {
        tracing::error!("Server stopped: {error}");
        std::process::exit(1);
    }
}
