use std::string::FromUtf8Error;

use thiserror::Error;

use crate::line_reader::LineReadError;

/// Broad class of an [`HjlError`], for callers that only need to tell a bad
/// stream apart from a stream that does not fit the expected shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Malformed header JSON, directive line, field path or field spec.
    Syntax,
    /// Well-formed input that conflicts with the record being built.
    Semantic,
    /// The stream ended early or could not be read.
    Truncation,
    /// The record is fine but does not convert to or from the caller's type.
    Shape,
}

#[derive(Debug, Error)]
pub enum HjlError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("line exceeds the maximum length of {limit} bytes")]
    LineTooLong { limit: usize },

    #[error("failed to parse record header: {source}")]
    Header {
        #[source]
        source: serde_json::Error,
    },

    #[error("record header must be a JSON object")]
    HeaderNotObject,

    #[error("invalid field line: {line}")]
    InvalidDirective { line: String },

    #[error("invalid field path {path:?}")]
    InvalidFieldPath { path: String },

    #[error("unknown field transform {transform:?} in {spec:?}")]
    UnknownTransform { spec: String, transform: String },

    #[error("redefinition of {path:?}")]
    Redefinition { path: String },

    #[error("cannot set {path:?}: an intermediate value is not an object")]
    InvalidPath { path: String },

    #[error("heredoc value for {path:?} is not valid UTF-8: {source}")]
    InvalidUtf8 {
        path: String,
        #[source]
        source: FromUtf8Error,
    },

    #[error("stream ended before heredoc terminator {separator:?} for {path:?}")]
    TruncatedHeredoc { path: String, separator: String },

    #[error("decoded record does not match the target type: {0}")]
    Shape(#[source] serde_json::Error),

    #[error("failed to convert value into a record: {0}")]
    Serialize(#[source] serde_json::Error),

    #[error("encoded value must serialize to a JSON object")]
    NotAnObject,
}

impl HjlError {
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Header { .. }
            | Self::HeaderNotObject
            | Self::InvalidDirective { .. }
            | Self::InvalidFieldPath { .. }
            | Self::UnknownTransform { .. } => ErrorCategory::Syntax,
            Self::Redefinition { .. } | Self::InvalidPath { .. } | Self::InvalidUtf8 { .. } => {
                ErrorCategory::Semantic
            }
            Self::Io(_) | Self::LineTooLong { .. } | Self::TruncatedHeredoc { .. } => {
                ErrorCategory::Truncation
            }
            Self::Shape(_) | Self::Serialize(_) | Self::NotAnObject => ErrorCategory::Shape,
        }
    }

    #[must_use]
    pub(crate) fn invalid_directive(line: &[u8]) -> Self {
        Self::InvalidDirective {
            line: String::from_utf8_lossy(line).trim_end().to_string(),
        }
    }
}

impl From<LineReadError> for HjlError {
    fn from(error: LineReadError) -> Self {
        match error {
            LineReadError::Io(source) => Self::Io(source),
            LineReadError::TooLong { limit } => Self::LineTooLong { limit },
        }
    }
}
