//! Heredoc JSON Lines (HJL).
//!
//! HJL is newline-delimited JSON where each JSON object may be followed by
//! heredoc-style field definitions. Long or multi-line strings live outside
//! the JSON line, verbatim, so transcripts stay readable and diff well:
//!
//! ```text
//! {"type":"assistant_text"}
//! .text = <<END0
//! Here is
//! some output
//! END0
//! {"type":"user_text","text":"thanks"}
//! ```
//!
//! The first record decodes to
//! `{"type": "assistant_text", "text": "Here is\nsome output\n"}`.
//!
//! # Format rules
//! - A field line is `.path = <<SEP`. Paths are dotted (`sub.text`); missing
//!   parent objects are created, and a field may not redefine a value the
//!   header or an earlier field line already set.
//! - The body ends at the first point where it ends with `SEP\n`; that suffix
//!   is stripped. An empty body is `""`, a lone blank line is `"\n"`, and
//!   `Hello, world!END0` gives `"Hello, world!"`. Newlines are never added or
//!   removed.
//! - Lines starting with `#` are comments wherever a header or field line may
//!   appear. Heredoc bodies are never filtered.
//! - The encoder picks the first of `END0`, `END1`, ... that does not occur in
//!   the value.
//!
//! # Example
//! ```
//! use hjl::{parse_specs, Decoder, Encoder};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Debug, PartialEq, Serialize, Deserialize)]
//! struct Turn {
//!     role: String,
//!     text: String,
//! }
//!
//! let fields = parse_specs(["text"])?;
//! let turn = Turn { role: "assistant".into(), text: "line one\nline two".into() };
//!
//! let mut encoder = Encoder::new(Vec::new());
//! encoder.encode(&turn, &fields)?;
//! let bytes = encoder.into_inner();
//! assert_eq!(
//!     String::from_utf8_lossy(&bytes),
//!     "{\"role\":\"assistant\"}\n.text = <<END0\nline one\nline twoEND0\n"
//! );
//!
//! let mut decoder = Decoder::new(bytes.as_slice());
//! assert_eq!(decoder.decode::<Turn>(&fields)?, Some(turn));
//! assert_eq!(decoder.decode::<Turn>(&fields)?, None);
//! # Ok::<(), hjl::HjlError>(())
//! ```

pub mod config;
pub mod decoder;
pub mod encoder;
pub mod error;
pub mod field;
pub mod line_reader;
pub mod path;
pub mod separator;

pub use crate::config::CodecConfig;
pub use crate::decoder::{DecodeIter, Decoder};
pub use crate::encoder::Encoder;
pub use crate::error::{ErrorCategory, HjlError};
pub use crate::field::{parse_specs, FieldSpec, Transform};
pub use crate::line_reader::{BoundedLineReader, LineReadError};
pub use crate::path::{extract, insert, FieldPath, Record};
pub use crate::separator::SeparatorStyle;
