//! Line reading without read-ahead.
//!
//! [`BoundedLineReader`] pulls one byte at a time from its source and stops as
//! soon as a `\n` has been consumed, so the bytes after a line stay in the
//! source for whoever reads it next.

use std::io::{ErrorKind, Read};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LineReadError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("line exceeds the maximum length of {limit} bytes")]
    TooLong { limit: usize },
}

/// Reads `\n`-terminated lines from an unbuffered source.
///
/// The optional limit counts the bytes before the terminator. Wrap the source
/// in a `BufReader` when nothing else shares it; each byte is one `read` call.
#[derive(Debug)]
pub struct BoundedLineReader<R> {
    inner: R,
    max_len: Option<usize>,
}

impl<R: Read> BoundedLineReader<R> {
    pub fn new(inner: R, max_len: Option<usize>) -> Self {
        Self { inner, max_len }
    }

    /// Returns the next line including its `\n`, a final unterminated line, or
    /// `None` once the source is exhausted.
    pub fn read_line(&mut self) -> Result<Option<Vec<u8>>, LineReadError> {
        let mut line = Vec::new();
        let mut byte = [0u8; 1];

        loop {
            match self.inner.read(&mut byte) {
                Ok(0) => {
                    return Ok(if line.is_empty() { None } else { Some(line) });
                }
                Ok(_) => {
                    line.push(byte[0]);
                    if byte[0] == b'\n' {
                        return Ok(Some(line));
                    }
                    if let Some(limit) = self.max_len {
                        if line.len() > limit {
                            return Err(LineReadError::TooLong { limit });
                        }
                    }
                }
                Err(error) if error.kind() == ErrorKind::Interrupted => continue,
                Err(error) => return Err(error.into()),
            }
        }
    }

    #[must_use]
    pub fn max_len(&self) -> Option<usize> {
        self.max_len
    }

    pub fn get_ref(&self) -> &R {
        &self.inner
    }

    pub fn get_mut(&mut self) -> &mut R {
        &mut self.inner
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}
