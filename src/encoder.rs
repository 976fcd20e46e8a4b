use std::io::Write;

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, trace, warn};

use crate::config::CodecConfig;
use crate::error::HjlError;
use crate::field::FieldSpec;
use crate::path::{extract, insert, FieldPath, Record};
use crate::separator::SeparatorStyle;

/// Writes records to a Heredoc JSON Lines stream.
///
/// Each record is assembled in memory and handed to the writer with a single
/// `write_all`. A serialization failure therefore writes nothing; the write
/// itself is not atomic, so sharing one file between writers needs outside
/// coordination.
#[derive(Debug)]
pub struct Encoder<W> {
    writer: W,
    style: SeparatorStyle,
}

impl<W: Write> Encoder<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            style: SeparatorStyle::default(),
        }
    }

    pub fn with_config(writer: W, config: &CodecConfig) -> Self {
        Self::new(writer).with_separator_style(config.separator_style)
    }

    #[must_use]
    pub fn with_separator_style(mut self, style: SeparatorStyle) -> Self {
        self.style = style;
        self
    }

    /// Encodes `value`, moving each selected string field into a heredoc.
    ///
    /// Selected fields that are missing or not strings stay where they are;
    /// that is not an error.
    pub fn encode<T: Serialize + ?Sized>(
        &mut self,
        value: &T,
        fields: &[FieldSpec],
    ) -> Result<(), HjlError> {
        match serde_json::to_value(value).map_err(HjlError::Serialize)? {
            Value::Object(record) => self.encode_record(record, fields),
            _ => Err(HjlError::NotAnObject),
        }
    }

    pub fn encode_record(
        &mut self,
        mut record: Record,
        fields: &[FieldSpec],
    ) -> Result<(), HjlError> {
        let heredocs = take_heredocs(&mut record, fields)?;

        let mut out = serde_json::to_vec(&record).map_err(HjlError::Serialize)?;
        out.push(b'\n');
        for (path, raw) in &heredocs {
            write_heredoc(&mut out, path, raw, self.style);
        }

        self.writer.write_all(&out)?;
        debug!(
            heredocs = heredocs.len(),
            bytes = out.len(),
            "encoded hjl record"
        );
        Ok(())
    }

    pub fn flush(&mut self) -> Result<(), HjlError> {
        self.writer.flush()?;
        Ok(())
    }

    pub fn get_ref(&self) -> &W {
        &self.writer
    }

    pub fn get_mut(&mut self) -> &mut W {
        &mut self.writer
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

/// Pulls the selected fields out of `record`, in selector order.
fn take_heredocs(
    record: &mut Record,
    fields: &[FieldSpec],
) -> Result<Vec<(FieldPath, Vec<u8>)>, HjlError> {
    let mut heredocs = Vec::with_capacity(fields.len());

    for spec in fields {
        let Some(value) = extract(record, spec.path()) else {
            trace!(path = %spec.path(), "heredoc field absent, skipping");
            continue;
        };

        let raw = match spec.transform() {
            None => value.into_bytes(),
            Some(transform) => match transform.from_record(&value) {
                Some(raw) => raw,
                None => {
                    warn!(
                        path = %spec.path(),
                        %transform,
                        "field is not valid for its transform, keeping it in the header"
                    );
                    insert(record, spec.path(), Value::String(value))?;
                    continue;
                }
            },
        };
        heredocs.push((spec.path().clone(), raw));
    }

    Ok(heredocs)
}

fn write_heredoc(out: &mut Vec<u8>, path: &FieldPath, raw: &[u8], style: SeparatorStyle) {
    let separator = style.allocate(raw);
    out.extend_from_slice(format!(".{path} = <<{separator}\n").as_bytes());
    out.extend_from_slice(raw);
    out.extend_from_slice(separator.as_bytes());
    out.push(b'\n');
}
