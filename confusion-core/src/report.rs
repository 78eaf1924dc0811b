//! Ranked error report: model, console/JSON rendering and result files

use std::fmt::{self, Write as _};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use crate::aggregate::{SubstitutionCount, TokenCount, Totals};
use crate::alignment::AlignedPair;
use crate::error::Result;

pub const SUBSTITUTIONS_FILE: &str = "substitutions.tsv";
pub const DELETIONS_FILE: &str = "deletions.tsv";
pub const INSERTIONS_FILE: &str = "insertions.tsv";
pub const SUMMARY_FILE: &str = "summary.json";

/// Batch-level counts
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Summary {
    pub pairs: usize,
    pub skipped: usize,
    pub reference_tokens: usize,
    pub hypothesis_tokens: usize,
    pub matches: usize,
    pub substitutions: usize,
    pub deletions: usize,
    pub insertions: usize,
    pub error_rate: f64,
}

impl Summary {
    pub fn new(totals: Totals, skipped: usize) -> Self {
        Self {
            pairs: totals.pairs,
            skipped,
            reference_tokens: totals.reference_tokens,
            hypothesis_tokens: totals.hypothesis_tokens,
            matches: totals.matches,
            substitutions: totals.substitutions,
            deletions: totals.deletions,
            insertions: totals.insertions,
            error_rate: totals.error_rate(),
        }
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} pairs ({} skipped), {} reference tokens: {} substitutions, {} deletions, {} insertions, error rate {:.2}%",
            self.pairs,
            self.skipped,
            self.reference_tokens,
            self.substitutions,
            self.deletions,
            self.insertions,
            self.error_rate * 100.0
        )
    }
}

/// Result of analyzing one batch
#[derive(Debug, Clone, Serialize)]
pub struct ErrorReport {
    pub generated_at: DateTime<Utc>,
    pub summary: Summary,
    pub substitutions: Vec<SubstitutionCount<String>>,
    pub deletions: Vec<TokenCount<String>>,
    pub insertions: Vec<TokenCount<String>>,
}

impl ErrorReport {
    /// Copy keeping at most `top_n` entries per category
    pub fn truncated(&self, top_n: Option<usize>) -> Self {
        let limit = top_n.unwrap_or(usize::MAX);
        Self {
            generated_at: self.generated_at,
            summary: self.summary,
            substitutions: self.substitutions.iter().take(limit).cloned().collect(),
            deletions: self.deletions.iter().take(limit).cloned().collect(),
            insertions: self.insertions.iter().take(limit).cloned().collect(),
        }
    }
}

/// Console layout: one header per category, one entry per line with its count
pub fn render_text(report: &ErrorReport, top_n: Option<usize>) -> String {
    let report = report.truncated(top_n);
    let mut out = String::new();

    let _ = writeln!(out, "Substitutions:");
    if report.substitutions.is_empty() {
        let _ = writeln!(out, "  (none)");
    }
    for entry in &report.substitutions {
        let _ = writeln!(
            out,
            "({:?}, {:?}) {}",
            entry.reference, entry.hypothesis, entry.count
        );
    }

    for (title, entries) in [
        ("Deletions:", &report.deletions),
        ("Insertions:", &report.insertions),
    ] {
        let _ = writeln!(out, "{title}");
        if entries.is_empty() {
            let _ = writeln!(out, "  (none)");
        }
        for entry in entries {
            let _ = writeln!(out, "{:?} {}", entry.token, entry.count);
        }
    }

    let _ = writeln!(out, "Summary: {}", report.summary);
    out
}

/// Pretty JSON of the (truncated) report
pub fn render_json(report: &ErrorReport, top_n: Option<usize>) -> Result<String> {
    Ok(serde_json::to_string_pretty(&report.truncated(top_n))?)
}

/// Reference, hypothesis and edit vector as three column-aligned lines
pub fn render_alignment<T: fmt::Display>(pair: &AlignedPair<T>) -> String {
    let mut ref_line = String::from("REF:");
    let mut hyp_line = String::from("HYP:");
    let mut ops_line = String::from("OPS:");

    for ((r, h), op) in pair.reference().iter().zip(pair.hypothesis()).zip(pair.ops()) {
        let r = r.to_string();
        let h = h.to_string();
        let width = r.chars().count().max(h.chars().count()).max(1);
        let _ = write!(ref_line, " {r:<width$}");
        let _ = write!(hyp_line, " {h:<width$}");
        let _ = write!(ops_line, " {:<width$}", op.as_char());
    }

    format!(
        "{}\n{}\n{}\n",
        ref_line.trim_end(),
        hyp_line.trim_end(),
        ops_line.trim_end()
    )
}

/// Write one TSV per category plus `summary.json` into `dir`
///
/// Returns the paths written, in a fixed order.
pub fn write_report_files(
    dir: &Path,
    report: &ErrorReport,
    top_n: Option<usize>,
) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(dir)?;
    let report = report.truncated(top_n);

    let substitutions_path = dir.join(SUBSTITUTIONS_FILE);
    let mut writer = BufWriter::new(File::create(&substitutions_path)?);
    for entry in &report.substitutions {
        writeln!(
            writer,
            "{}\t{}\t{}",
            entry.reference, entry.hypothesis, entry.count
        )?;
    }
    writer.flush()?;

    let deletions_path = dir.join(DELETIONS_FILE);
    write_token_counts(&deletions_path, &report.deletions)?;

    let insertions_path = dir.join(INSERTIONS_FILE);
    write_token_counts(&insertions_path, &report.insertions)?;

    let summary_path = dir.join(SUMMARY_FILE);
    let summary = serde_json::json!({
        "generated_at": report.generated_at,
        "summary": report.summary,
    });
    fs::write(&summary_path, serde_json::to_string_pretty(&summary)?)?;

    info!("Wrote report files to {}", dir.display());

    Ok(vec![
        substitutions_path,
        deletions_path,
        insertions_path,
        summary_path,
    ])
}

fn write_token_counts(path: &Path, entries: &[TokenCount<String>]) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    for entry in entries {
        writeln!(writer, "{}\t{}", entry.token, entry.count)?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alignment::align;

    fn sample_report() -> ErrorReport {
        ErrorReport {
            generated_at: Utc::now(),
            summary: Summary {
                pairs: 2,
                skipped: 0,
                reference_tokens: 8,
                hypothesis_tokens: 8,
                matches: 5,
                substitutions: 3,
                deletions: 1,
                insertions: 1,
                error_rate: 0.625,
            },
            substitutions: vec![
                SubstitutionCount {
                    reference: "cat".to_string(),
                    hypothesis: "bat".to_string(),
                    count: 2,
                },
                SubstitutionCount {
                    reference: "a".to_string(),
                    hypothesis: "the".to_string(),
                    count: 1,
                },
            ],
            deletions: vec![TokenCount {
                token: "all".to_string(),
                count: 1,
            }],
            insertions: vec![],
        }
    }

    #[test]
    fn test_render_text_layout() {
        let text = render_text(&sample_report(), None);
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "Substitutions:");
        assert_eq!(lines[1], "(\"cat\", \"bat\") 2");
        assert_eq!(lines[2], "(\"a\", \"the\") 1");
        assert_eq!(lines[3], "Deletions:");
        assert_eq!(lines[4], "\"all\" 1");
        assert_eq!(lines[5], "Insertions:");
        assert_eq!(lines[6], "  (none)");
        assert!(lines[7].starts_with("Summary: 2 pairs (0 skipped)"));
        assert!(lines[7].ends_with("error rate 62.50%"));
    }

    #[test]
    fn test_render_text_top_n() {
        let text = render_text(&sample_report(), Some(1));

        assert!(text.contains("(\"cat\", \"bat\") 2"));
        assert!(!text.contains("\"the\""));
    }

    #[test]
    fn test_render_json() {
        let json = render_json(&sample_report(), Some(1)).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["summary"]["pairs"], 2);
        assert_eq!(value["substitutions"].as_array().unwrap().len(), 1);
        assert_eq!(value["substitutions"][0]["reference"], "cat");
        assert_eq!(value["deletions"][0]["token"], "all");
        assert!(value["generated_at"].is_string());
    }

    #[test]
    fn test_truncated_none_keeps_everything() {
        let report = sample_report();
        let full = report.truncated(None);

        assert_eq!(full.substitutions, report.substitutions);
        assert_eq!(full.deletions, report.deletions);
    }

    #[test]
    fn test_render_alignment() {
        let pair = align(&["the", "cat", "sat"], &["the", "bat", "sat", "down"]);
        let rendered = render_alignment(&pair);
        let lines: Vec<&str> = rendered.lines().collect();

        assert_eq!(lines[0], "REF: the cat sat <epsilon>");
        assert_eq!(lines[1], "HYP: the bat sat down");
        assert_eq!(lines[2], "OPS: M   S   M   I");
    }

    #[test]
    fn test_render_empty_alignment() {
        let empty: Vec<&str> = vec![];
        let rendered = render_alignment(&align(&empty, &empty));
        assert_eq!(rendered, "REF:\nHYP:\nOPS:\n");
    }

    #[test]
    fn test_write_report_files() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("results");

        let paths = write_report_files(&out, &sample_report(), None).unwrap();
        assert_eq!(paths.len(), 4);

        let subs = fs::read_to_string(out.join(SUBSTITUTIONS_FILE)).unwrap();
        assert_eq!(subs, "cat\tbat\t2\na\tthe\t1\n");

        let dels = fs::read_to_string(out.join(DELETIONS_FILE)).unwrap();
        assert_eq!(dels, "all\t1\n");

        let ins = fs::read_to_string(out.join(INSERTIONS_FILE)).unwrap();
        assert!(ins.is_empty());

        let summary: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(out.join(SUMMARY_FILE)).unwrap()).unwrap();
        assert_eq!(summary["summary"]["substitutions"], 3);
    }

    #[test]
    fn test_write_report_files_top_n() {
        let dir = tempfile::tempdir().unwrap();
        write_report_files(dir.path(), &sample_report(), Some(1)).unwrap();

        let subs = fs::read_to_string(dir.path().join(SUBSTITUTIONS_FILE)).unwrap();
        assert_eq!(subs.lines().count(), 1);
    }
}
