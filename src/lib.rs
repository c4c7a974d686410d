pub mod agent;
pub mod config;
pub mod error;
pub mod metrics;
pub mod paths;
pub mod process;
pub mod query_set;
pub mod report;
pub mod runner;
pub mod search;

// Re-export commonly used types
pub use error::{BenchError, Result};
pub use query_set::QueryRecord;
pub use runner::{BenchmarkRunner, QueryOutcome};
pub use search::SearchTool;
