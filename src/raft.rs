pub mod acceptor;
pub mod diagnostics;
pub mod engine;
pub mod model;
pub mod peer_client;
pub mod rpc;
