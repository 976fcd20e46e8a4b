mod commands;
mod logging;

use std::io::{self, BufReader};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use hjl::{parse_specs, CodecConfig};
use tracing::info;

/// Inspect and produce Heredoc JSON Lines streams.
#[derive(Parser)]
#[command(name = "hjl", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print each record as one compact JSON line.
    Decode {
        /// Input file; stdin when omitted.
        file: Option<PathBuf>,
        /// Field override such as `data:base64`. Repeatable.
        #[arg(short = 'f', long = "field", value_name = "SPEC")]
        fields: Vec<String>,
    },
    /// Read JSON lines and write them as HJL, moving the given fields into heredocs.
    Encode {
        /// Input file; stdin when omitted.
        file: Option<PathBuf>,
        /// Field to carry as a heredoc, optionally `path:base64`. Repeatable.
        #[arg(short = 'f', long = "field", value_name = "SPEC")]
        fields: Vec<String>,
    },
    /// Decode every record and report how many were read.
    Check {
        /// Input file; stdin when omitted.
        file: Option<PathBuf>,
    },
    /// Print the conversation stored in a session file.
    Transcript {
        file: PathBuf,
        /// Replay the branch ending at this entry instead of the current leaf.
        #[arg(long)]
        leaf: Option<String>,
    },
}

fn main() -> Result<()> {
    logging::init_tracing();
    let cli = Cli::parse();
    let config = CodecConfig::from_env();

    match cli.command {
        Command::Decode { file, fields } => {
            let fields = parse_specs(&fields).context("parsing field overrides")?;
            let input = commands::open_input(file.as_deref())?;
            let count = commands::decode(input, io::stdout().lock(), &fields, &config)?;
            info!(records = count, "decoded");
        }
        Command::Encode { file, fields } => {
            let fields = parse_specs(&fields).context("parsing field selectors")?;
            let input = BufReader::new(commands::open_input(file.as_deref())?);
            let count = commands::encode(input, io::stdout().lock(), &fields, &config)?;
            info!(records = count, "encoded");
        }
        Command::Check { file } => {
            let input = commands::open_input(file.as_deref())?;
            let count = commands::check(input, &config)?;
            println!("ok: {count} records");
        }
        Command::Transcript { file, leaf } => {
            commands::transcript(&file, leaf.as_deref(), io::stdout().lock())?;
        }
    }

    Ok(())
}
