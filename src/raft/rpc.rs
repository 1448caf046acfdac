use std::fmt;

pub mod application;
pub mod codec;
pub mod error;
pub mod raft;

pub const RAFT_NAMESPACE: &str = "/raft";

/// The three calls a node accepts from the network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    AppendEntries,
    RequestVote,
    Command,
}

impl Operation {
    /// Route relative to [`RAFT_NAMESPACE`].
    pub fn route(self) -> &'static str {
        match self {
            Operation::AppendEntries => "/appendentries",
            Operation::RequestVote => "/requestvote",
            Operation::Command => "/command",
        }
    }

    pub fn path(self) -> String {
        format!("{}{}", RAFT_NAMESPACE, self.route())
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::AppendEntries => "appendentries",
            Operation::RequestVote => "requestvote",
            Operation::Command => "command",
        };
        f.write_str(name)
    }
}
