//! Observable status of the single external worker run.
//!
//! Only the most recent run is remembered. Starting a run overwrites
//! whatever was recorded before.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Status of the most recent worker run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunState {
    /// True between launch and observed termination.
    pub running: bool,
    /// Identifier assigned at launch.
    pub run_id: Option<Uuid>,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    /// Exit code of the last finished run; `None` if it was killed.
    pub last_exit_code: Option<i32>,
}

impl RunState {
    /// Record a fresh run, discarding the previous one.
    pub fn set_running(&mut self, run_id: Uuid) {
        *self = RunState {
            running: true,
            run_id: Some(run_id),
            started_at: Some(Utc::now()),
            ended_at: None,
            last_exit_code: None,
        };
    }

    /// Mark the current run as stopped with the given exit code.
    pub fn set_stopped(&mut self, exit_code: Option<i32>) {
        self.running = false;
        self.ended_at = Some(Utc::now());
        self.last_exit_code = exit_code;
    }

    /// Whether `run_id` is the run this state describes.
    pub fn is_current(&self, run_id: Uuid) -> bool {
        self.run_id == Some(run_id)
    }

    /// Whether `run_id` is current and still running.
    pub fn is_running(&self, run_id: Uuid) -> bool {
        self.running && self.is_current(run_id)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_state_is_idle() {
        let state = RunState::default();
        assert!(!state.running);
        assert!(state.run_id.is_none());
        assert!(state.started_at.is_none());
        assert!(state.last_exit_code.is_none());
    }

    #[test]
    fn set_running_clears_previous_outcome() {
        let mut state = RunState::default();
        let first = Uuid::new_v4();
        state.set_running(first);
        state.set_stopped(Some(2));
        assert_eq!(state.last_exit_code, Some(2));

        let second = Uuid::new_v4();
        state.set_running(second);
        assert!(state.running);
        assert!(state.is_current(second));
        assert!(!state.is_current(first));
        assert!(state.ended_at.is_none());
        assert!(state.last_exit_code.is_none());
    }

    #[test]
    fn set_stopped_keeps_run_id_and_records_end() {
        let mut state = RunState::default();
        let run_id = Uuid::new_v4();
        state.set_running(run_id);
        state.set_stopped(None);

        assert!(!state.running);
        assert!(state.is_current(run_id));
        assert!(!state.is_running(run_id));
        assert!(state.ended_at.is_some());
        assert!(state.ended_at >= state.started_at);
        assert!(state.last_exit_code.is_none());
    }
}
