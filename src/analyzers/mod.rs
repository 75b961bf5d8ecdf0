//! Trip analysis: the orchestrator, its report types and timing.
//!
//! The orchestrator filters a dataset, decides which statistics apply to
//! the active filter and schema, and measures each one as it is computed.

pub mod analyzer;
pub mod timing;
pub mod types;
