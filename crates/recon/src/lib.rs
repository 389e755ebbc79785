//! `invoice-recon`: links general-ledger rows to master-financials invoice
//! lines and rolls master lines up to invoices.
//!
//! Pure engine crate: receives already-fetched text, returns records, tables
//! and summaries. No network or filesystem access; diagnostics go through an
//! injected [`report::Reporter`].

pub mod config;
pub mod error;
pub mod group;
pub mod join;
pub mod keys;
pub mod model;
pub mod normalize;
pub mod pipeline;
pub mod report;
pub mod rollup;
pub mod table;

pub use config::{ConfigOverrides, RunConfig};
pub use error::{RunError, SourceRole};
pub use keys::{MatchingStrategy, StrategyKind};
pub use model::{Cell, InvoiceKey, JoinStatus, KeyBasis, OutputRecord, Row, RunRecord};
pub use pipeline::{run_join, run_rollup, RunOutput};
pub use report::{LogReporter, MemoryReporter, NullReporter, Reporter};
