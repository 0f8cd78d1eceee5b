pub mod engine;
pub mod types;

pub use engine::{
    assemble_manager, assemble_summary, placeholder_no_areas, AggregationEngine, ManagerJoinRow,
    SummaryJoinRow,
};
pub use types::{
    DateRange, ManagerChildRow, ManagerImageRow, ManagerRecord, ManagerView, SummaryChildRow,
    SummaryImageRow, SummaryRecord, SummaryView, MULTIPLE_ASSIGNEES, NO_AREAS_PLACEHOLDER,
};
