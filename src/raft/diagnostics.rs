use crate::raft::engine::EngineError;
use crate::raft::model::state::NodeSnapshot;
use crate::raft::rpc::Operation;

/// Where the transport reports what it is doing. Implementations must not panic: a
/// diagnostics failure is never allowed to fail the request that triggered it.
pub trait Diagnostics: Send + Sync + 'static {
    /// A request decoded cleanly and is about to reach the engine.
    fn dispatching(&self, operation: Operation, node: &NodeSnapshot);

    /// The engine refused a command or panicked on it. Called once per failed command.
    fn command_failed(&self, node: &NodeSnapshot, error: &EngineError);
}

#[derive(Debug, Clone)]
pub struct TracingDiagnostics {
    base_url: String,
}

impl TracingDiagnostics {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self { base_url: base_url.into() }
    }
}

impl Default for TracingDiagnostics {
    fn default() -> Self {
        Self::new("")
    }
}

impl Diagnostics for TracingDiagnostics {
    fn dispatching(&self, operation: Operation, node: &NodeSnapshot) {
        tracing::trace!(
            node_id = %node.node_id,
            role = %node.role,
            "{}{} called, my state is {}", self.base_url, operation.path(), node.role
        );
    }

    fn command_failed(&self, node: &NodeSnapshot, error: &EngineError) {
        tracing::error!(
            node_id = %node.node_id,
            role = %node.role,
            error = %error,
            "There was a problem handling a command on node {}", node.node_id
        );
    }
}
