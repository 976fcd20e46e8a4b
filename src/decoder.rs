use std::io::Read;
use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, trace};

use crate::config::CodecConfig;
use crate::error::HjlError;
use crate::field::{transform_for, FieldSpec};
use crate::line_reader::BoundedLineReader;
use crate::path::{insert, FieldPath, Record};

const COMMENT_MARKER: u8 = b'#';
const FIELD_MARKER: u8 = b'.';
const HEREDOC_MARKER: &str = "<<";

/// Decodes records from a Heredoc JSON Lines stream.
///
/// The decoder reads its source line by line without read-ahead. The one
/// line it does hold back is the header of the next record, which it had to
/// read to see that the current record was finished.
#[derive(Debug)]
pub struct Decoder<R> {
    lines: BoundedLineReader<R>,
    lookahead: Option<Vec<u8>>,
    records: usize,
}

impl<R: Read> Decoder<R> {
    /// Creates a decoder with no line length limit.
    pub fn new(reader: R) -> Self {
        Self::with_max_line_length(reader, None)
    }

    pub fn with_max_line_length(reader: R, max_line_length: Option<usize>) -> Self {
        Self {
            lines: BoundedLineReader::new(reader, max_line_length),
            lookahead: None,
            records: 0,
        }
    }

    pub fn with_config(reader: R, config: &CodecConfig) -> Self {
        Self::with_max_line_length(reader, config.max_line_length)
    }

    /// Decodes the next record into `T`.
    ///
    /// `fields` supplies transforms for heredoc fields; entries without a
    /// transform have no effect here. Returns `Ok(None)` at end of stream.
    pub fn decode<T: DeserializeOwned>(
        &mut self,
        fields: &[FieldSpec],
    ) -> Result<Option<T>, HjlError> {
        let Some(record) = self.decode_record(fields)? else {
            return Ok(None);
        };
        serde_json::from_value(Value::Object(record))
            .map(Some)
            .map_err(HjlError::Shape)
    }

    /// Decodes the next record as a generic JSON object.
    pub fn decode_record(&mut self, fields: &[FieldSpec]) -> Result<Option<Record>, HjlError> {
        let Some(header) = self.next_line()? else {
            return Ok(None);
        };
        let mut record = parse_header(&header)?;

        while let Some(line) = self.next_line()? {
            if line.first() != Some(&FIELD_MARKER) {
                self.lookahead = Some(line);
                break;
            }
            self.read_field(&mut record, &line, fields)?;
        }

        self.records += 1;
        debug!(
            record = self.records,
            keys = record.len(),
            "decoded hjl record"
        );
        Ok(Some(record))
    }

    /// Iterates over the remaining records, stopping after the first error.
    pub fn iter<T: DeserializeOwned>(&mut self, fields: &[FieldSpec]) -> DecodeIter<'_, R, T> {
        DecodeIter {
            decoder: self,
            fields: fields.to_vec(),
            failed: false,
            _target: PhantomData,
        }
    }

    /// Number of records decoded so far.
    #[must_use]
    pub fn records_decoded(&self) -> usize {
        self.records
    }

    pub fn get_ref(&self) -> &R {
        self.lines.get_ref()
    }

    /// Returns the source. A held-back header line is lost.
    pub fn into_inner(self) -> R {
        self.lines.into_inner()
    }

    fn next_line(&mut self) -> Result<Option<Vec<u8>>, HjlError> {
        if let Some(line) = self.lookahead.take() {
            return Ok(Some(line));
        }
        loop {
            match self.lines.read_line()? {
                Some(line) if line.first() == Some(&COMMENT_MARKER) => {
                    trace!(len = line.len(), "skipping comment line");
                }
                other => return Ok(other),
            }
        }
    }

    fn read_field(
        &mut self,
        record: &mut Record,
        line: &[u8],
        fields: &[FieldSpec],
    ) -> Result<(), HjlError> {
        let directive = Directive::parse(line)?;
        trace!(path = %directive.path, separator = %directive.separator, "reading heredoc field");

        let mut terminator = directive.separator.clone().into_bytes();
        terminator.push(b'\n');

        let mut body = Vec::new();
        loop {
            let Some(line) = self.lines.read_line()? else {
                return Err(HjlError::TruncatedHeredoc {
                    path: directive.path.to_string(),
                    separator: directive.separator,
                });
            };
            body.extend_from_slice(&line);
            if body.ends_with(&terminator) {
                body.truncate(body.len() - terminator.len());
                break;
            }
        }

        let value = match transform_for(fields, &directive.path) {
            Some(transform) => transform.to_record(&body),
            None => String::from_utf8(body).map_err(|source| HjlError::InvalidUtf8 {
                path: directive.path.to_string(),
                source,
            })?,
        };
        insert(record, &directive.path, Value::String(value))
    }
}

/// Iterator returned by [`Decoder::iter`].
pub struct DecodeIter<'a, R, T> {
    decoder: &'a mut Decoder<R>,
    fields: Vec<FieldSpec>,
    failed: bool,
    _target: PhantomData<fn() -> T>,
}

impl<R: Read, T: DeserializeOwned> Iterator for DecodeIter<'_, R, T> {
    type Item = Result<T, HjlError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        match self.decoder.decode(&self.fields) {
            Ok(Some(value)) => Some(Ok(value)),
            Ok(None) => None,
            Err(error) => {
                self.failed = true;
                Some(Err(error))
            }
        }
    }
}

fn parse_header(line: &[u8]) -> Result<Record, HjlError> {
    match serde_json::from_slice(line).map_err(|source| HjlError::Header { source })? {
        Value::Object(record) => Ok(record),
        _ => Err(HjlError::HeaderNotObject),
    }
}

/// A parsed `.path = <<SEPARATOR` line.
#[derive(Debug, PartialEq, Eq)]
struct Directive {
    path: FieldPath,
    separator: String,
}

impl Directive {
    fn parse(line: &[u8]) -> Result<Self, HjlError> {
        let text = std::str::from_utf8(line).map_err(|_| HjlError::invalid_directive(line))?;
        let rest = text
            .strip_prefix(FIELD_MARKER as char)
            .ok_or_else(|| HjlError::invalid_directive(line))?;
        let (path, marker) = rest
            .split_once('=')
            .ok_or_else(|| HjlError::invalid_directive(line))?;
        let separator = marker
            .trim()
            .strip_prefix(HEREDOC_MARKER)
            .map(str::trim)
            .filter(|separator| !separator.is_empty())
            .ok_or_else(|| HjlError::invalid_directive(line))?;

        Ok(Self {
            path: FieldPath::parse(path.trim())?,
            separator: separator.to_string(),
        })
    }
}
