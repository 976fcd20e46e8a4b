use std::path::PathBuf;

use hjl::HjlError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionStoreError {
    #[error("I/O error while {operation} at {path}: {source}")]
    Io {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to decode record {record} in {path}: {source}")]
    Decode {
        path: PathBuf,
        record: usize,
        #[source]
        source: HjlError,
    },

    #[error("record {record} in {path} does not match the session schema: {source}")]
    RecordShape {
        path: PathBuf,
        record: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("missing session header record in {path}")]
    MissingHeader { path: PathBuf },

    #[error("record {record} in {path} must be a session header record")]
    InvalidHeaderRecord { path: PathBuf, record: usize },

    #[error("record {record} in {path} has unsupported session version {found}; expected 1")]
    UnsupportedVersion {
        path: PathBuf,
        record: usize,
        found: u32,
    },

    #[error("record {record} in {path} contains a duplicate entry id '{id}'")]
    DuplicateEntryId {
        path: PathBuf,
        record: usize,
        id: String,
    },

    #[error(
        "record {record} in {path} contains dangling parent id '{parent_id}' for entry '{entry_id}'"
    )]
    DanglingParentId {
        path: PathBuf,
        record: usize,
        entry_id: String,
        parent_id: String,
    },

    #[error("record {record} in {path} must be an entry record")]
    InvalidEntryRecord { path: PathBuf, record: usize },

    #[error("record {record} in {path} has unknown entry field '{field}'")]
    UnknownEntryField {
        path: PathBuf,
        record: usize,
        field: String,
    },

    #[error("record {record} in {path} has invalid RFC3339 timestamp in field '{field}': {value}")]
    InvalidTimestamp {
        path: PathBuf,
        record: usize,
        field: &'static str,
        value: String,
    },

    #[error("record {record} in {path} has non-absolute cwd path: {cwd}")]
    NonAbsoluteCwd {
        path: PathBuf,
        record: usize,
        cwd: String,
    },

    #[error("path provided to create_new must resolve to an absolute cwd: {path}")]
    NonAbsoluteCreateCwd { path: PathBuf },

    #[error("no session files found under {root}")]
    NoSessionsFound { root: PathBuf },

    #[error("cannot replay unknown leaf id '{leaf_id}' in {path}")]
    UnknownLeafId { path: PathBuf, leaf_id: String },

    #[error("cycle detected while replaying from leaf '{leaf_id}' in {path}")]
    ReplayCycle { path: PathBuf, leaf_id: String },

    #[error("failed to encode session record for {path}: {source}")]
    Encode {
        path: PathBuf,
        #[source]
        source: HjlError,
    },

    #[error("invalid heredoc field list: {0}")]
    FieldSpec(#[source] HjlError),

    #[error("failed to format current UTC timestamp as RFC3339: {0}")]
    ClockFormat(#[source] time::error::Format),
}

impl SessionStoreError {
    #[must_use]
    pub fn io(operation: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            operation,
            path: path.into(),
            source,
        }
    }

    #[must_use]
    pub fn decode(path: impl Into<PathBuf>, record: usize, source: HjlError) -> Self {
        Self::Decode {
            path: path.into(),
            record,
            source,
        }
    }

    #[must_use]
    pub fn record_shape(path: impl Into<PathBuf>, record: usize, source: serde_json::Error) -> Self {
        Self::RecordShape {
            path: path.into(),
            record,
            source,
        }
    }

    #[must_use]
    pub fn encode(path: impl Into<PathBuf>, source: HjlError) -> Self {
        Self::Encode {
            path: path.into(),
            source,
        }
    }
}
