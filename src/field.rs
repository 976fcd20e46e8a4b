//! Heredoc field selectors.
//!
//! A selector is written `path` or `path:transform`. On the encode side it
//! names a field to move out of the JSON header into a heredoc block; on the
//! decode side a transform says how the raw heredoc bytes become a JSON value.

use std::fmt;
use std::str::FromStr;

use base64::{engine::general_purpose, Engine as _};

use crate::error::HjlError;
use crate::path::FieldPath;

/// Transform applied to a heredoc field where it crosses into the record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transform {
    /// The record holds standard base64; the heredoc holds the raw bytes.
    Base64,
}

impl Transform {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Base64 => "base64",
        }
    }

    fn parse(name: &str) -> Option<Self> {
        match name {
            "base64" => Some(Self::Base64),
            _ => None,
        }
    }

    /// Raw heredoc bytes to the string stored in the record.
    #[must_use]
    pub fn to_record(self, raw: &[u8]) -> String {
        match self {
            Self::Base64 => general_purpose::STANDARD.encode(raw),
        }
    }

    /// Record string to raw heredoc bytes, `None` if it is not in the
    /// transform's format.
    #[must_use]
    pub fn from_record(self, value: &str) -> Option<Vec<u8>> {
        match self {
            Self::Base64 => general_purpose::STANDARD.decode(value).ok(),
        }
    }
}

impl fmt::Display for Transform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    path: FieldPath,
    transform: Option<Transform>,
}

impl FieldSpec {
    #[must_use]
    pub fn new(path: FieldPath) -> Self {
        Self {
            path,
            transform: None,
        }
    }

    #[must_use]
    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = Some(transform);
        self
    }

    pub fn parse(spec: &str) -> Result<Self, HjlError> {
        let Some((path, transform)) = spec.rsplit_once(':') else {
            return Ok(Self::new(FieldPath::parse(spec)?));
        };

        let transform = Transform::parse(transform).ok_or_else(|| HjlError::UnknownTransform {
            spec: spec.to_string(),
            transform: transform.to_string(),
        })?;
        Ok(Self::new(FieldPath::parse(path)?).with_transform(transform))
    }

    #[must_use]
    pub fn path(&self) -> &FieldPath {
        &self.path
    }

    #[must_use]
    pub fn transform(&self) -> Option<Transform> {
        self.transform
    }
}

impl fmt::Display for FieldSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.transform {
            Some(transform) => write!(f, "{}:{transform}", self.path),
            None => write!(f, "{}", self.path),
        }
    }
}

impl FromStr for FieldSpec {
    type Err = HjlError;

    fn from_str(spec: &str) -> Result<Self, Self::Err> {
        Self::parse(spec)
    }
}

/// Parses a list of selectors, failing on the first bad one.
pub fn parse_specs<I, S>(specs: I) -> Result<Vec<FieldSpec>, HjlError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    specs
        .into_iter()
        .map(|spec| FieldSpec::parse(spec.as_ref()))
        .collect()
}

/// Transform configured for `path`. Selectors without a transform do not
/// clear one given earlier; among transformed selectors the last wins.
pub(crate) fn transform_for(fields: &[FieldSpec], path: &FieldPath) -> Option<Transform> {
    fields
        .iter()
        .rev()
        .filter(|spec| spec.path() == path)
        .find_map(FieldSpec::transform)
}
