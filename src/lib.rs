//! # Imagery Tasking Core
//!
//! Core engine coordinating the lifecycle of review tasks derived from
//! imagery. Images are divided into geographic areas; each area of an image
//! becomes a task assigned to a human reviewer and must pass through a
//! fixed workflow before the parent image can be marked complete.
//!
//! ## Architecture
//!
//! Three subsystems carry the non-trivial logic:
//!
//! - the **task state machine**: guarded status transitions over the task
//!   row, compare-and-swap semantics with structured outcomes;
//! - the **auto-assignment load balancer**: picks the least-loaded eligible
//!   reviewer for each newly ingested area of an image;
//! - the **aggregation engine**: builds the manager and summary read-model
//!   views by joining images, areas, and tasks, resolving reviewer display
//!   names in bulk through the identity cache.
//!
//! Everything else (HTTP routing, OAuth token exchange, import/export,
//! schema provisioning) is an external collaborator consumed through narrow
//! interfaces; see [`identity::IdentityProvider`] for the identity seam.
//!
//! ## Module Organization
//!
//! - [`models`] - Data layer over the `tasking_*` tables
//! - [`state_machine`] - Task status lifecycle and guarded transitions
//! - [`identity`] - Identity provider seam and resolution cache
//! - [`services`] - Auto-assignment, ingestion, image lifecycle
//! - [`aggregation`] - Manager and summary read-model views
//! - [`config`] - Configuration management
//! - [`error`] - Structured error handling
//!
//! ## Concurrency Model
//!
//! Request-parallel and stateless per request: no in-process scheduler or
//! background loop. State transitions rely on row-level guarded updates as
//! the sole concurrency mechanism; the identity cache is a shared,
//! TTL-bounded concurrent map.

pub mod aggregation;
pub mod config;
pub mod error;
pub mod identity;
pub mod logging;
pub mod models;
pub mod services;
pub mod state_machine;

pub use aggregation::{AggregationEngine, DateRange, ManagerView, SummaryView};
pub use config::TaskingConfig;
pub use error::{Result, TaskingError};
pub use identity::{IdentityProvider, IdentityRecord, IdentityResolver};
pub use services::{
    AssignmentOutcome, AutoAssignmentService, CompletionOutcome, ImageLifecycleService,
    IngestRequest, IngestionService,
};
pub use state_machine::{TaskEvent, TaskStateMachine, TaskStatus, TransitionOutcome};
