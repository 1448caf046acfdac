#[derive(Debug, Clone, PartialEq)]
pub struct LogEntry<C> {
    pub term: u64,
    pub index: i64,
    pub command: C
}

#[derive(Debug)]
pub struct Log<C> {
    entries: Vec<LogEntry<C>>
}

impl<C> Log<C> {
    pub fn new() -> Log<C> {
        Log {
            entries: vec![]
        }
    }

    pub fn append(&mut self, term: u64, command: C) -> i64 {
        let index = self.entries.len() as i64;
        self.entries.push(LogEntry { term, index, command });
        index
    }

    pub fn last_log_entry(&self) -> Option<&LogEntry<C>> {
        self.entries.last()
    }

    pub fn last_index(&self) -> i64 {
        self.last_log_entry().map_or(-1, |it| it.index)
    }

    pub fn last_term(&self) -> u64 {
        self.last_log_entry().map_or(0, |it| it.term)
    }

    pub fn entry_at(&self, index: i64) -> Option<&LogEntry<C>> {
        if index < 0 {
            return None
        }
        self.entries.get(index as usize)
    }

    /// Drops the entry at `index` and everything after it.
    pub fn truncate_from(&mut self, index: i64) {
        if index >= 0 {
            self.entries.truncate(index as usize);
        }
    }
}

impl<C> Default for Log<C> {
    fn default() -> Self {
        Self::new()
    }
}
