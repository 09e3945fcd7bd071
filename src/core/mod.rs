//! Core run state types.
//!
//! This module contains the pure part of the migration state machine:
//! - Run states via [`MigrationState`]
//! - Immutable transition history
//!
//! Nothing in here performs I/O; the [`Migrator`](crate::migrator::Migrator)
//! drives the transitions.

mod history;
mod state;

pub use history::{RunHistory, StateTransition};
pub use state::MigrationState;
