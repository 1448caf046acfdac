use crate::raft::model::log::LogEntry;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Decoded form of an append entries call. Entry commands are already resolved to the
/// application's command type, so this struct has no serde impl of its own: the codec
/// goes through [`AppendEntriesWire`].
#[derive(Debug, Clone, PartialEq)]
pub struct AppendEntriesRequest<C> {
    pub term: u64,
    pub leader_id: String,
    pub previous_log_index: i64,
    pub previous_log_term: u64,
    pub entries: Vec<LogEntry<C>>,
    pub leader_commit_index: i64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AppendEntriesResponse {
    pub term: u64,
    pub success: bool,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RequestVoteRequest {
    pub term: u64,
    pub candidate_id: String,
    pub last_log_index: i64,
    pub last_log_term: u64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RequestVoteResponse {
    pub term: u64,
    pub vote_granted: bool,
}

#[derive(Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AppendEntriesWire {
    pub term: u64,
    pub leader_id: String,
    pub previous_log_index: i64,
    pub previous_log_term: u64,
    pub entries: Vec<LogEntryWire>,
    pub leader_commit_index: i64,
}

#[derive(Serialize, Deserialize, Debug)]
pub(crate) struct LogEntryWire {
    pub term: u64,
    pub index: i64,
    // tagged command object, resolved through the command registry
    pub command: Value,
}
