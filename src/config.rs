//! Environment configuration.

use std::env;

use crate::separator::SeparatorStyle;

pub const MAX_LINE_LENGTH_ENV: &str = "HJL_MAX_LINE_LENGTH";
pub const SEPARATOR_STYLE_ENV: &str = "HJL_SEPARATOR_STYLE";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CodecConfig {
    /// Longest accepted line in bytes, terminator excluded; `None` is unlimited.
    pub max_line_length: Option<usize>,
    pub separator_style: SeparatorStyle,
}

impl CodecConfig {
    pub fn from_env() -> Self {
        Self {
            max_line_length: env_usize_opt(MAX_LINE_LENGTH_ENV).filter(|limit| *limit > 0),
            separator_style: env_string_opt(SEPARATOR_STYLE_ENV)
                .and_then(|value| value.parse().ok())
                .unwrap_or_default(),
        }
    }
}

fn env_usize_opt(key: &str) -> Option<usize> {
    env_string_opt(key).and_then(|value| value.trim().parse().ok())
}

fn env_string_opt(key: &str) -> Option<String> {
    env::var(key).ok().and_then(|value| {
        if value.trim().is_empty() {
            None
        } else {
            Some(value)
        }
    })
}
