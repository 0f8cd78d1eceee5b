// State machine module for the review-task lifecycle.
//
// Status transitions are guarded updates against the task row; see
// `transitions` for the compare-and-swap semantics and outcome reporting.

pub mod states;
pub mod transitions;

pub use states::TaskStatus;
pub use transitions::{transition_for, TaskEvent, TaskStateMachine, TransitionOutcome};
