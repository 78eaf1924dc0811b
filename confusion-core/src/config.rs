//! Analysis settings, loaded from JSON with defaults for missing keys

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::records::RecordFormat;
use crate::tokenize::TokenMode;

/// Settings for one analysis run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub token_mode: TokenMode,
    /// Fold case before tokenizing
    pub lowercase: bool,
    pub reference_column: usize,
    pub hypothesis_column: usize,
    pub skip_malformed: bool,
    /// Align records on the rayon thread pool
    pub parallel: bool,
    /// Skip records whose edit table would hold more cells than this
    pub max_matrix_cells: Option<usize>,
    /// Entries shown per category; `None` shows everything
    pub top_n: Option<usize>,
}

impl AnalysisConfig {
    pub const DEFAULT_TOP_N: usize = 5;

    /// Load a JSON config file; missing keys take their defaults
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let data = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_json::from_str(&data)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.reference_column == self.hypothesis_column {
            return Err(Error::Config(format!(
                "reference_column and hypothesis_column must differ (both are {})",
                self.reference_column
            )));
        }
        if self.top_n == Some(0) {
            return Err(Error::Config("top_n must be at least 1".to_string()));
        }
        if self.max_matrix_cells == Some(0) {
            return Err(Error::Config(
                "max_matrix_cells must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn record_format(&self) -> RecordFormat {
        RecordFormat {
            reference_column: self.reference_column,
            hypothesis_column: self.hypothesis_column,
            skip_malformed: self.skip_malformed,
        }
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            token_mode: TokenMode::default(),
            lowercase: false,
            reference_column: RecordFormat::DEFAULT_REFERENCE_COLUMN,
            hypothesis_column: RecordFormat::DEFAULT_HYPOTHESIS_COLUMN,
            skip_malformed: false,
            parallel: false,
            max_matrix_cells: None,
            top_n: Some(Self::DEFAULT_TOP_N),
        }
    }
}
