use thiserror::Error;
use crate::raft::model::state::{NodeRole, NodeSnapshot};
use crate::raft::rpc::codec::TypedPayload;
use crate::raft::rpc::raft::dto::{AppendEntriesRequest, AppendEntriesResponse, RequestVoteRequest, RequestVoteResponse};

pub mod in_memory;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("node {node_id} cannot accept writes while {role}")]
    NotLeader { node_id: String, role: NodeRole },
    #[error("command rejected: {0}")]
    Rejected(String),
    #[error("{0}")]
    Internal(String),
}

/// The consensus node the transport forwards to.
///
/// Every method may be called from several request tasks at once, so implementations do
/// their own synchronization. `handle_append_entries` and `handle_request_vote` answer every
/// expected fault (stale term, log mismatch) with a structured response; only command
/// handling reports failures.
pub trait ConsensusEngine: Send + Sync + 'static {
    type Command: TypedPayload;
    type Response: TypedPayload;

    fn handle_append_entries(&self, request: AppendEntriesRequest<Self::Command>) -> AppendEntriesResponse;

    fn handle_request_vote(&self, request: RequestVoteRequest) -> RequestVoteResponse;

    fn accept_command(&self, command: Self::Command) -> Result<Self::Response, EngineError>;

    /// Must not block nor mutate engine state: it runs on every inbound call.
    fn current_state(&self) -> NodeSnapshot;
}
