//! Splitting record fields into token sequences

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Unit of comparison for alignment
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenMode {
    /// Every character is a token, whitespace included
    #[default]
    Chars,
    /// Whitespace-separated words
    Words,
}

impl TokenMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Chars => "chars",
            Self::Words => "words",
        }
    }

    /// Get all available modes
    pub fn all() -> &'static [TokenMode] {
        &[TokenMode::Chars, TokenMode::Words]
    }
}

impl fmt::Display for TokenMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TokenMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "chars" | "char" | "characters" => Ok(Self::Chars),
            "words" | "word" => Ok(Self::Words),
            other => Err(Error::Config(format!("unknown token mode '{other}'"))),
        }
    }
}

/// Split `text` into tokens, optionally folding case first
pub fn tokenize(text: &str, mode: TokenMode, lowercase: bool) -> Vec<String> {
    let folded;
    let text = if lowercase {
        folded = text.to_lowercase();
        folded.as_str()
    } else {
        text
    };

    match mode {
        TokenMode::Chars => text.chars().map(String::from).collect(),
        TokenMode::Words => text.split_whitespace().map(String::from).collect(),
    }
}
