use std::collections::HashMap;
use crate::raft::rpc::application::dto::{KvCommand, KvResponse, ValueDeleted, ValueFound, ValueSet};

/// Key-value store that committed [`KvCommand`]s are applied to, in log order.
#[derive(Debug, Default)]
pub struct StateMachine {
    state_by_key: HashMap<String, String>,
}

impl StateMachine {
    pub fn new() -> Self {
        Self {
            state_by_key: HashMap::new(),
        }
    }

    /// Reads go through here too, so a `GetValue` observes every write committed before it.
    pub fn apply(&mut self, command: &KvCommand) -> KvResponse {
        match command {
            KvCommand::SetValue(set) => {
                self.state_by_key.insert(set.key.clone(), set.value.clone());
                KvResponse::from(ValueSet { key: set.key.clone(), value: set.value.clone() })
            },
            KvCommand::GetValue(get) => {
                let value = self.get(&get.key).map(str::to_owned);
                KvResponse::from(ValueFound { key: get.key.clone(), value })
            },
            KvCommand::DeleteValue(delete) => {
                let existed = self.state_by_key.remove(&delete.key).is_some();
                KvResponse::from(ValueDeleted { key: delete.key.clone(), existed })
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.state_by_key.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.state_by_key.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state_by_key.is_empty()
    }
}
