//! Confusion - ranked error analysis for predicted token sequences
//!
//! Aligns each hypothesis against its reference with a unit-cost edit distance,
//! then counts substitution pairs, deleted tokens and inserted tokens across a
//! whole batch and ranks them by frequency.

pub mod aggregate;
pub mod alignment;
pub mod batch;
pub mod config;
pub mod error;
pub mod records;
pub mod report;
pub mod tokenize;

pub use error::{Error, Result};

/// Re-export the main components for convenience
pub use aggregate::{
    ErrorAggregator, ErrorEvent, FrequencyTable, RankedErrors, SubstitutionCount, TokenCount,
    Totals, aggregate,
};
pub use alignment::{AlignedPair, EditMatrix, EditOp, GAP_MARKER, Slot, align};
pub use batch::{AlignedRecord, BatchAlignment, align_records, analyze, summarize};
pub use config::AnalysisConfig;
pub use records::{Record, RecordFormat, read_records, read_records_from_path};
pub use report::{ErrorReport, Summary, render_alignment, render_json, render_text, write_report_files};
pub use tokenize::{TokenMode, tokenize};
