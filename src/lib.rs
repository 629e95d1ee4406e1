//! Physical inventory count normalization and reporting.
//!
//! Raw count-sheet rows go through [`processor::process_batch`] to become
//! canonical [`types::ProcessedItem`]s, which [`aggregate`] rolls up per
//! location and cost center and [`reports`] ranks and tabulates.
pub mod aggregate;
pub mod config;
pub mod error;
pub mod fields;
pub mod filter;
pub mod loader;
pub mod logging;
pub mod output;
pub mod processor;
pub mod reliability;
pub mod reports;
pub mod types;
pub mod util;

pub use aggregate::{aggregate_sede_metrics, summarize};
pub use config::{AppConfig, PipelineConfig};
pub use error::{ReportError, ReportResult};
pub use filter::{DateGranularity, ItemFilter};
pub use processor::{process_batch, process_row};
pub use types::{CellValue, InventoryStatus, ProcessedItem, RawRow, SedeMetrics};
