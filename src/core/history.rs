//! Run transition history.
//!
//! Provides immutable tracking of a run's state changes over time.

use super::state::MigrationState;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Record of a single state transition.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StateTransition {
    /// The state being transitioned from
    pub from: MigrationState,
    /// The state being transitioned to
    pub to: MigrationState,
    /// When the transition occurred
    pub timestamp: DateTime<Utc>,
}

/// Ordered history of a run's transitions.
///
/// History is immutable - `record` returns a new history with the
/// transition appended.
///
/// # Example
///
/// ```rust
/// use remodel::core::{MigrationState, RunHistory, StateTransition};
/// use chrono::Utc;
///
/// let history = RunHistory::new().record(StateTransition {
///     from: MigrationState::NotStarted,
///     to: MigrationState::Scanning,
///     timestamp: Utc::now(),
/// });
///
/// assert_eq!(history.get_path().len(), 2);
/// ```
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct RunHistory {
    transitions: Vec<StateTransition>,
}

impl RunHistory {
    /// Create a new empty history.
    pub fn new() -> Self {
        Self {
            transitions: Vec::new(),
        }
    }

    /// Record a transition, returning a new history.
    pub fn record(&self, transition: StateTransition) -> Self {
        let mut transitions = self.transitions.clone();
        transitions.push(transition);
        Self { transitions }
    }

    /// Get the path of states traversed: the initial state, then the `to`
    /// state of each transition.
    pub fn get_path(&self) -> Vec<&MigrationState> {
        let mut path = Vec::with_capacity(self.transitions.len() + 1);
        if let Some(first) = self.transitions.first() {
            path.push(&first.from);
        }
        path.extend(self.transitions.iter().map(|t| &t.to));
        path
    }

    /// Wall-clock time between the first and last recorded transition.
    pub fn duration(&self) -> Option<Duration> {
        if let (Some(first), Some(last)) = (self.transitions.first(), self.transitions.last()) {
            let duration = last.timestamp.signed_duration_since(first.timestamp);
            duration.to_std().ok()
        } else {
            None
        }
    }

    pub fn transitions(&self) -> &[StateTransition] {
        &self.transitions
    }

    /// The most recent state, if anything was recorded.
    pub fn current(&self) -> Option<&MigrationState> {
        self.transitions.last().map(|t| &t.to)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stage::Stage;

    fn transition(from: MigrationState, to: MigrationState) -> StateTransition {
        StateTransition {
            from,
            to,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn new_history_is_empty() {
        let history = RunHistory::new();
        assert!(history.transitions().is_empty());
        assert!(history.get_path().is_empty());
        assert!(history.duration().is_none());
        assert!(history.current().is_none());
    }

    #[test]
    fn record_is_immutable() {
        let history = RunHistory::new();
        let new_history = history.record(transition(
            MigrationState::NotStarted,
            MigrationState::Scanning,
        ));

        assert_eq!(history.transitions().len(), 0);
        assert_eq!(new_history.transitions().len(), 1);
    }

    #[test]
    fn get_path_returns_state_sequence() {
        let history = RunHistory::new()
            .record(transition(
                MigrationState::NotStarted,
                MigrationState::Running(Stage::ScanConfirm),
            ))
            .record(transition(
                MigrationState::Running(Stage::ScanConfirm),
                MigrationState::Completed,
            ));

        let path = history.get_path();
        assert_eq!(path.len(), 3);
        assert_eq!(path[0], &MigrationState::NotStarted);
        assert_eq!(path[1], &MigrationState::Running(Stage::ScanConfirm));
        assert_eq!(path[2], &MigrationState::Completed);
        assert_eq!(history.current(), Some(&MigrationState::Completed));
    }

    #[test]
    fn history_serializes_correctly() {
        let history = RunHistory::new().record(transition(
            MigrationState::Analyzing,
            MigrationState::Failed(Some(Stage::DataModel)),
        ));

        let json = serde_json::to_string(&history).unwrap();
        let deserialized: RunHistory = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized.transitions(), history.transitions());
    }
}
