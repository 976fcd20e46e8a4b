//! Heredoc separator allocation.

use std::fmt;
use std::str::FromStr;

use tracing::debug;

/// Family of separator tokens an encoder draws from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SeparatorStyle {
    /// `END0`, `END1`, `END2`, ...
    #[default]
    End,
    /// `--0--`, `--1--`, `--2--`, ...
    Dashed,
}

impl SeparatorStyle {
    #[must_use]
    pub fn candidate(self, index: usize) -> String {
        match self {
            Self::End => format!("END{index}"),
            Self::Dashed => format!("--{index}--"),
        }
    }

    /// Picks the first candidate that does not occur anywhere in `value`.
    #[must_use]
    pub fn allocate(self, value: &[u8]) -> String {
        let mut index = 0usize;
        loop {
            let candidate = self.candidate(index);
            if !contains(value, candidate.as_bytes()) {
                if index > 0 {
                    debug!(separator = %candidate, skipped = index, "separator collided with value");
                }
                return candidate;
            }
            index += 1;
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::End => "end",
            Self::Dashed => "dashed",
        }
    }
}

impl fmt::Display for SeparatorStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SeparatorStyle {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "end" => Ok(Self::End),
            "dashed" => Ok(Self::Dashed),
            other => Err(format!("unknown separator style {other:?}")),
        }
    }
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.len() >= needle.len() && haystack.windows(needle.len()).any(|window| window == needle)
}
