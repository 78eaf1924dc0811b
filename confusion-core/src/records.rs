//! Tab-separated input records
//!
//! One record per line: `id<TAB>reference<TAB>hypothesis`. Column positions are
//! configurable; extra fields are ignored and blank lines are skipped.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{Error, Result};

/// Which fields of a record hold the texts to compare
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordFormat {
    pub reference_column: usize,
    pub hypothesis_column: usize,
    /// Log and skip short records instead of failing
    pub skip_malformed: bool,
}

impl RecordFormat {
    pub const DEFAULT_REFERENCE_COLUMN: usize = 1;
    pub const DEFAULT_HYPOTHESIS_COLUMN: usize = 2;

    /// Minimum number of fields a record must have
    pub fn required_fields(&self) -> usize {
        self.reference_column.max(self.hypothesis_column) + 1
    }
}

impl Default for RecordFormat {
    fn default() -> Self {
        Self {
            reference_column: Self::DEFAULT_REFERENCE_COLUMN,
            hypothesis_column: Self::DEFAULT_HYPOTHESIS_COLUMN,
            skip_malformed: false,
        }
    }
}

/// A single reference/hypothesis pair read from input
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Record {
    /// 1-based line number in the input
    pub line: usize,
    /// First field, when it is not one of the compared columns
    pub id: Option<String>,
    pub reference: String,
    pub hypothesis: String,
}

impl Record {
    pub fn new(line: usize, reference: impl Into<String>, hypothesis: impl Into<String>) -> Self {
        Self {
            line,
            id: None,
            reference: reference.into(),
            hypothesis: hypothesis.into(),
        }
    }
}

/// Parse one input line. Blank lines yield `Ok(None)`; a line holding a tab is
/// never blank, since its fields may be whitespace tokens.
pub fn parse_record(line_no: usize, line: &str, format: &RecordFormat) -> Result<Option<Record>> {
    let line = line.trim_end_matches(['\r', '\n']);
    if !line.contains('\t') && line.trim().is_empty() {
        return Ok(None);
    }

    let fields: Vec<&str> = line.split('\t').collect();
    let expected = format.required_fields();
    if fields.len() < expected {
        return Err(Error::MalformedRecord {
            line: line_no,
            expected,
            found: fields.len(),
        });
    }

    let id = if format.reference_column != 0 && format.hypothesis_column != 0 {
        Some(fields[0].to_string())
    } else {
        None
    };

    Ok(Some(Record {
        line: line_no,
        id,
        reference: fields[format.reference_column].to_string(),
        hypothesis: fields[format.hypothesis_column].to_string(),
    }))
}

/// Read every record from `reader`
pub fn read_records<R: BufRead>(reader: R, format: &RecordFormat) -> Result<Vec<Record>> {
    let mut records = Vec::new();
    let mut skipped = 0usize;

    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        match parse_record(idx + 1, &line, format) {
            Ok(Some(record)) => records.push(record),
            Ok(None) => {}
            Err(Error::MalformedRecord {
                line,
                expected,
                found,
            }) if format.skip_malformed => {
                warn!(
                    "Skipping malformed record on line {}: expected {} fields, found {}",
                    line, expected, found
                );
                skipped += 1;
            }
            Err(e) => return Err(e),
        }
    }

    debug!(
        "Read {} records ({} malformed skipped)",
        records.len(),
        skipped
    );

    Ok(records)
}

/// Open `path` and read every record from it
pub fn read_records_from_path<P: AsRef<Path>>(path: P, format: &RecordFormat) -> Result<Vec<Record>> {
    let file = File::open(path.as_ref())?;
    read_records(BufReader::new(file), format)
}
