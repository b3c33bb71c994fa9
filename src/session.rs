use std::collections::BTreeSet;

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum_macros::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Status {
    Idle,
    Running,
    Completed,
}

/// Mutable state of a single test run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Session {
    pub status: Status,
    pub current_word_index: usize,
    /// Text typed for the current word, not yet committed
    pub current_input: String,
    pub duration_secs: u32,
    pub elapsed_secs: u32,
    pub remaining_secs: u32,
    /// Offsets into the joined sample text that mismatch in the latest comparison
    pub error_positions: BTreeSet<usize>,
    /// Every offset flagged at any point during the run
    pub mistyped_positions: BTreeSet<usize>,
}

impl Session {
    pub fn new(duration_secs: u32) -> Self {
        Self {
            status: Status::Idle,
            current_word_index: 0,
            current_input: String::new(),
            duration_secs,
            elapsed_secs: 0,
            remaining_secs: duration_secs,
            error_positions: BTreeSet::new(),
            mistyped_positions: BTreeSet::new(),
        }
    }

    pub fn is_running(&self) -> bool {
        self.status == Status::Running
    }

    pub fn is_completed(&self) -> bool {
        self.status == Status::Completed
    }
}
