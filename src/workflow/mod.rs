pub mod row_ctx;
pub mod row_flow;
pub mod row_result;

pub use row_ctx::RowCtx;
pub use row_flow::RowFlow;
pub use row_result::{AppliedMapping, ExportOutcome, RowResult, RowStatus, SkipReason, SkippedMapping};
