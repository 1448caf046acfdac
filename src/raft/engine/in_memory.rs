use std::cmp::min;
use std::sync::{Mutex, MutexGuard, PoisonError};
use crate::raft::engine::{ConsensusEngine, EngineError};
use crate::raft::model::log::Log;
use crate::raft::model::state::{NodeRole, NodeSnapshot, RoleCell};
use crate::raft::model::state_machine::StateMachine;
use crate::raft::rpc::application::dto::{KvCommand, KvResponse};
use crate::raft::rpc::raft::dto::{AppendEntriesRequest, AppendEntriesResponse, RequestVoteRequest, RequestVoteResponse};

#[derive(Debug)]
struct RaftState {
    current_term: u64,
    voted_for: Option<String>,
    log: Log<KvCommand>,
    // volatile state on all servers
    commit_index: i64,
    last_applied: i64,
    state_machine: StateMachine,
}

/// Key-value node that keeps everything in memory. It follows the voting and log
/// matching rules but never replicates on its own, which makes it a standalone
/// leader or a passive follower.
#[derive(Debug)]
pub struct InMemoryEngine {
    node_id: String,
    role: RoleCell,
    raft_state: Mutex<RaftState>,
}

impl InMemoryEngine {
    pub fn new(node_id: impl Into<String>) -> Self {
        Self {
            node_id: node_id.into(),
            role: RoleCell::new(NodeRole::Follower),
            raft_state: Mutex::new(RaftState {
                current_term: 0,
                voted_for: None,
                log: Log::new(),
                commit_index: -1,
                last_applied: -1,
                state_machine: StateMachine::new(),
            }),
        }
    }

    /// A node that is the whole cluster: leader of term 1, commits its own writes immediately.
    pub fn single_node(node_id: impl Into<String>) -> Self {
        let engine = Self::new(node_id);
        {
            let mut raft_state = engine.lock_state();
            raft_state.current_term = 1;
            raft_state.voted_for = Some(engine.node_id.clone());
        }
        engine.role.store(NodeRole::Leader);
        engine
    }

    pub fn current_term(&self) -> u64 {
        self.lock_state().current_term
    }

    pub fn voted_for(&self) -> Option<String> {
        self.lock_state().voted_for.clone()
    }

    pub fn commit_index(&self) -> i64 {
        self.lock_state().commit_index
    }

    pub fn value_of(&self, key: &str) -> Option<String> {
        self.lock_state().state_machine.get(key).map(str::to_owned)
    }

    // a panic while holding the lock leaves plain data behind, nothing half-applied to undo
    fn lock_state(&self) -> MutexGuard<'_, RaftState> {
        self.raft_state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn switch_to_follower_with_term(&self, raft_state: &mut RaftState, term: u64) {
        if term > raft_state.current_term {
            raft_state.current_term = term;
            raft_state.voted_for = None;
        }
        self.role.store(NodeRole::Follower);
    }
}

fn apply_committed_entries(raft_state: &mut RaftState) {
    while raft_state.last_applied < raft_state.commit_index {
        let next = raft_state.last_applied + 1;
        match raft_state.log.entry_at(next) {
            Some(entry) => {
                tracing::debug!("Applying {:?} on this server...", entry);
                raft_state.state_machine.apply(&entry.command);
            },
            None => {
                tracing::error!("Commit index {} points past the end of the log", raft_state.commit_index);
                return
            }
        }
        raft_state.last_applied = next;
    }
}

impl ConsensusEngine for InMemoryEngine {
    type Command = KvCommand;
    type Response = KvResponse;

    fn handle_append_entries(&self, payload: AppendEntriesRequest<KvCommand>) -> AppendEntriesResponse {
        let mut raft_state = self.lock_state();

        if payload.term < raft_state.current_term {
            tracing::info!("Received append entries request with stale term ({}). Current term is {}", payload.term, raft_state.current_term);
            return AppendEntriesResponse { term: raft_state.current_term, success: false }
        }

        // either a heartbeat or new entries: whoever sent it is the leader of this term
        self.switch_to_follower_with_term(&mut raft_state, payload.term);

        if payload.previous_log_index >= 0 {
            let matches = raft_state.log.entry_at(payload.previous_log_index)
                .is_some_and(|it| it.term == payload.previous_log_term);
            if !matches {
                return AppendEntriesResponse { term: raft_state.current_term, success: false }
            }
        }

        // commit only what this leader has vouched for: its previous entry plus what it sent
        let last_new_index = payload.previous_log_index + payload.entries.len() as i64;
        for entry in payload.entries {
            match raft_state.log.entry_at(entry.index) {
                Some(existing) if existing.term == entry.term => continue,
                Some(_) => raft_state.log.truncate_from(entry.index),
                None => {}
            }
            if entry.index != raft_state.log.last_index() + 1 {
                tracing::warn!("Entry {} does not follow the last log index {}", entry.index, raft_state.log.last_index());
                return AppendEntriesResponse { term: raft_state.current_term, success: false }
            }
            raft_state.log.append(entry.term, entry.command);
        }

        let commit_index = min(payload.leader_commit_index, last_new_index);
        if commit_index > raft_state.commit_index {
            raft_state.commit_index = commit_index;
        }
        apply_committed_entries(&mut raft_state);

        AppendEntriesResponse { term: raft_state.current_term, success: true }
    }

    fn handle_request_vote(&self, payload: RequestVoteRequest) -> RequestVoteResponse {
        let mut raft_state = self.lock_state();

        if payload.term < raft_state.current_term {
            return RequestVoteResponse { term: raft_state.current_term, vote_granted: false }
        }

        if payload.term > raft_state.current_term {
            self.switch_to_follower_with_term(&mut raft_state, payload.term);
        }

        // check if I already voted for another member!
        if raft_state.voted_for.as_ref().is_some_and(|voted| *voted != payload.candidate_id) {
            return RequestVoteResponse { term: raft_state.current_term, vote_granted: false }
        }

        let my_last_term = raft_state.log.last_term();
        let candidate_is_up_to_date = payload.last_log_term > my_last_term
            || (payload.last_log_term == my_last_term && payload.last_log_index >= raft_state.log.last_index());
        if !candidate_is_up_to_date {
            return RequestVoteResponse { term: raft_state.current_term, vote_granted: false }
        }

        raft_state.voted_for = Some(payload.candidate_id);
        RequestVoteResponse { term: raft_state.current_term, vote_granted: true }
    }

    fn accept_command(&self, command: KvCommand) -> Result<KvResponse, EngineError> {
        let mut raft_state = self.lock_state();

        if let KvCommand::GetValue(_) = command {
            return Ok(raft_state.state_machine.apply(&command))
        }

        let role = self.role.load();
        if role != NodeRole::Leader {
            return Err(EngineError::NotLeader { node_id: self.node_id.clone(), role })
        }
        if let KvCommand::SetValue(set) = &command {
            if set.key.is_empty() {
                return Err(EngineError::Rejected("key must not be empty".to_string()))
            }
        }

        let term = raft_state.current_term;
        let index = raft_state.log.append(term, command.clone());
        // no followers to wait for: the entry is committed as soon as it is in the log
        raft_state.commit_index = index;
        raft_state.last_applied = index;
        Ok(raft_state.state_machine.apply(&command))
    }

    fn current_state(&self) -> NodeSnapshot {
        NodeSnapshot { node_id: self.node_id.clone(), role: self.role.load() }
    }
}
