pub mod aggregate;
pub mod category;
pub mod config;
pub mod error;
pub mod export;
pub mod filter;
pub mod join;
pub mod metrics;
pub mod report;
pub mod types;

pub use config::{ReportConfig, UnmatchedPolicy};
pub use error::{PipelineError, Result};
pub use filter::FilterState;
pub use metrics::ReportSummary;
pub use report::{ReportInputs, ReportOutput, ReportPipeline};
pub use types::{AggregatedRecords, JoinedRecords};
