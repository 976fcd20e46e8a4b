use std::fs::File;
use std::io::{self, BufRead, BufReader, Read, Write};
use std::path::Path;

use anyhow::{bail, Context, Result};
use hjl::{CodecConfig, Decoder, Encoder, FieldSpec};
use serde_json::Value;
use session_store::{SessionEntryKind, SessionStore};
use tracing::debug;

pub fn open_input(path: Option<&Path>) -> Result<Box<dyn Read>> {
    match path {
        Some(path) => {
            let file =
                File::open(path).with_context(|| format!("opening {}", path.display()))?;
            Ok(Box::new(file))
        }
        None => Ok(Box::new(io::stdin().lock())),
    }
}

/// Writes each HJL record as one compact JSON line. Returns the record count.
pub fn decode<R: Read, W: Write>(
    input: R,
    mut output: W,
    fields: &[FieldSpec],
    config: &CodecConfig,
) -> Result<usize> {
    let mut decoder = Decoder::with_config(BufReader::new(input), config);
    loop {
        let record_number = decoder.records_decoded() + 1;
        let Some(record) = decoder
            .decode_record(fields)
            .with_context(|| format!("decoding record {record_number}"))?
        else {
            break;
        };
        serde_json::to_writer(&mut output, &record)?;
        output.write_all(b"\n")?;
    }
    output.flush()?;
    Ok(decoder.records_decoded())
}

/// Reads JSON lines and writes them as HJL. Blank lines are skipped.
pub fn encode<R: BufRead, W: Write>(
    input: R,
    output: W,
    fields: &[FieldSpec],
    config: &CodecConfig,
) -> Result<usize> {
    let mut encoder = Encoder::with_config(output, config);
    let mut encoded = 0;
    for (index, line) in input.lines().enumerate() {
        let line_number = index + 1;
        let line = line.with_context(|| format!("reading line {line_number}"))?;
        if line.trim().is_empty() {
            continue;
        }
        let Value::Object(record) = serde_json::from_str(&line)
            .with_context(|| format!("parsing JSON on line {line_number}"))?
        else {
            bail!("line {line_number} is not a JSON object");
        };
        encoder
            .encode_record(record, fields)
            .with_context(|| format!("encoding line {line_number}"))?;
        encoded += 1;
    }
    encoder.flush()?;
    Ok(encoded)
}

/// Decodes every record without keeping it. Returns the record count.
pub fn check<R: Read>(input: R, config: &CodecConfig) -> Result<usize> {
    let mut decoder = Decoder::with_config(BufReader::new(input), config);
    loop {
        let record_number = decoder.records_decoded() + 1;
        match decoder.decode_record(&[]) {
            Ok(Some(_)) => {}
            Ok(None) => break,
            Err(error) => {
                let category = error.category();
                return Err(anyhow::Error::new(error)
                    .context(format!("{category:?} error in record {record_number}")));
            }
        }
    }
    Ok(decoder.records_decoded())
}

/// Prints the branch ending at `leaf` (or the current leaf) of a session file.
pub fn transcript<W: Write>(path: &Path, leaf: Option<&str>, mut output: W) -> Result<()> {
    let store = SessionStore::open(path)?;
    let header = store.header();
    writeln!(output, "session {} ({})", header.session_id, header.created_at)?;
    if let Some(prompt) = &header.system_prompt {
        write_block(&mut output, "system", prompt)?;
    }

    let branch = store.replay_leaf(leaf)?;
    debug!(entries = branch.len(), "replayed session branch");
    for entry in branch {
        match &entry.kind {
            SessionEntryKind::UserText { text } => write_block(&mut output, "user", text)?,
            SessionEntryKind::AssistantText { text } => {
                write_block(&mut output, "assistant", text)?
            }
            SessionEntryKind::ToolCall {
                call_id,
                tool_name,
                arguments,
            } => write_block(
                &mut output,
                &format!("tool call {tool_name} [{call_id}]"),
                &String::from_utf8_lossy(arguments),
            )?,
            SessionEntryKind::ToolResult {
                call_id,
                tool_name,
                content,
                is_error,
            } => {
                let label = if *is_error { "tool error" } else { "tool result" };
                write_block(
                    &mut output,
                    &format!("{label} {tool_name} [{call_id}]"),
                    content,
                )?
            }
        }
    }
    output.flush()?;
    Ok(())
}

fn write_block<W: Write>(output: &mut W, label: &str, body: &str) -> io::Result<()> {
    writeln!(output, "\n[{label}]")?;
    output.write_all(body.as_bytes())?;
    if !body.ends_with('\n') {
        output.write_all(b"\n")?;
    }
    Ok(())
}
