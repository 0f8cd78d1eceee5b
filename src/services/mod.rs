pub mod auto_assignment;
pub mod image_lifecycle;
pub mod ingestion;

pub use auto_assignment::{pick_least_loaded, AssignmentOutcome, AutoAssignmentService};
pub use image_lifecycle::{CompletionOutcome, ImageLifecycleService, UncompleteOutcome};
pub use ingestion::{IngestRequest, IngestResult, IngestionService};
