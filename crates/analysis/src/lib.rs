pub mod aggregate;
pub mod export;
pub mod metrics;
pub mod report;

pub use aggregate::{aggregate, by_author, by_day, status_breakdown, AggregateRow, Aggregates, StatusBreakdown};
pub use export::{read_csv, to_csv_string, write_csv, write_records_csv, ExportError};
pub use metrics::{compute, resolve, MetricsOutcome, Resolution, ResolvedMetric};
pub use report::{EmptyResultWarning, KindSummary, MetricsReport, UnresolvedCounts};
