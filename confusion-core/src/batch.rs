//! Batch analysis: tokenize, align and aggregate a set of records
//!
//! Alignment of independent records may run on the rayon pool. Aggregation is
//! always one sequential pass in input order so rankings do not depend on
//! scheduling.

use chrono::Utc;
use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::aggregate::ErrorAggregator;
use crate::alignment::{AlignedPair, EditMatrix, align};
use crate::config::AnalysisConfig;
use crate::records::Record;
use crate::report::{ErrorReport, Summary};
use crate::tokenize::tokenize;

/// Alignment of one input record
#[derive(Debug, Clone)]
pub struct AlignedRecord {
    pub line: usize,
    pub id: Option<String>,
    pub pair: AlignedPair<String>,
}

/// Every aligned record of a batch, in input order
#[derive(Debug, Clone, Default)]
pub struct BatchAlignment {
    pub aligned: Vec<AlignedRecord>,
    /// Records left out because their table exceeded `max_matrix_cells`
    pub skipped: usize,
}

fn align_record(record: &Record, config: &AnalysisConfig) -> Option<AlignedRecord> {
    let reference = tokenize(&record.reference, config.token_mode, config.lowercase);
    let hypothesis = tokenize(&record.hypothesis, config.token_mode, config.lowercase);

    if let Some(max_cells) = config.max_matrix_cells {
        let cells = EditMatrix::cell_count(reference.len(), hypothesis.len());
        if cells > max_cells {
            warn!(
                "Skipping record on line {}: {}x{} tokens need {} cells (limit {})",
                record.line,
                reference.len(),
                hypothesis.len(),
                cells,
                max_cells
            );
            return None;
        }
    }

    let pair = align(&reference, &hypothesis);
    debug!(
        "Aligned line {}: {} (distance {})",
        record.line,
        pair.edit_vector(),
        pair.edit_distance()
    );

    Some(AlignedRecord {
        line: record.line,
        id: record.id.clone(),
        pair,
    })
}

/// Tokenize and align every record
pub fn align_records(records: &[Record], config: &AnalysisConfig) -> BatchAlignment {
    let outcomes: Vec<Option<AlignedRecord>> = if config.parallel {
        records
            .par_iter()
            .map(|record| align_record(record, config))
            .collect()
    } else {
        records
            .iter()
            .map(|record| align_record(record, config))
            .collect()
    };

    let total = outcomes.len();
    let aligned: Vec<AlignedRecord> = outcomes.into_iter().flatten().collect();
    let skipped = total - aligned.len();

    BatchAlignment { aligned, skipped }
}

/// Aggregate an already aligned batch into a ranked report
pub fn summarize(batch: &BatchAlignment) -> ErrorReport {
    let mut aggregator = ErrorAggregator::new();
    for record in &batch.aligned {
        aggregator.record(&record.pair);
    }

    let (totals, ranked) = aggregator.finish();
    let summary = Summary::new(totals, batch.skipped);

    info!(
        "Analyzed {} pairs ({} skipped): {} substitutions, {} deletions, {} insertions, error rate {:.2}%",
        summary.pairs,
        summary.skipped,
        summary.substitutions,
        summary.deletions,
        summary.insertions,
        summary.error_rate * 100.0
    );

    ErrorReport {
        generated_at: Utc::now(),
        summary,
        substitutions: ranked.substitutions,
        deletions: ranked.deletions,
        insertions: ranked.insertions,
    }
}

/// Main entry point: align every record and rank the resulting errors
pub fn analyze(records: &[Record], config: &AnalysisConfig) -> ErrorReport {
    summarize(&align_records(records, config))
}
