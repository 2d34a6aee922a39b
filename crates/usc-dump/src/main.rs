//! Decode a USC byte stream and print every frame.
//!
//! Reads a capture file (or stdin) one byte at a time through a single
//! decoder, printing each completed frame and each rejected one together
//! with the bytes buffered at that point.
//!
//! ```bash
//! usc-dump capture.txt --address 1
//! printf '!1:10/b?t=10$' | usc-dump -v
//! ```

use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{ArgAction, Parser};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;
use usc_protocol::{ascii, Command, CommandConfig, ParseError, Status};

#[derive(Parser, Debug)]
#[command(name = "usc-dump", author, version, about)]
struct Args {
    /// Input file. Reads stdin when omitted or `-`.
    input: Option<PathBuf>,

    /// Address this endpoint answers to, e.g. `1` or `10.0.2.3`.
    #[arg(short, long, value_parser = parse_address)]
    address: Option<u32>,

    /// Decoder buffer size in bytes.
    #[arg(long)]
    capacity: Option<usize>,

    /// YAML file with decoder settings. Command line flags take precedence.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Stop at the first rejected frame.
    #[arg(long)]
    strict: bool,

    /// Increase log verbosity (-v debug, -vv trace).
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

/// Settings loaded from `--config`.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct DumpConfig {
    decoder: CommandConfig,
    strict: bool,
}

#[derive(Debug, Error)]
enum DumpError {
    #[error("failed to read {path}: {source}")]
    Read { path: String, source: io::Error },

    #[error("invalid config {path}: {source}")]
    Config {
        path: String,
        source: serde_yaml::Error,
    },

    #[error("output error: {0}")]
    Io(#[from] io::Error),

    #[error("rejected frame: {0}")]
    Rejected(ParseError),
}

/// Counters reported after a run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct Summary {
    bytes: u64,
    frames: u64,
    errors: u64,
}

/// Parse an address written the way it appears in a frame.
fn parse_address(text: &str) -> Result<u32, String> {
    let octets: Vec<&str> = text
        .split(|c: char| c.is_ascii() && ascii::is_octet_separator(c as u8))
        .collect();
    if octets.len() > 4 {
        return Err(format!("at most 4 octets, got {}", octets.len()));
    }
    let mut address = 0u32;
    for octet in octets {
        let value: u8 = octet
            .parse()
            .map_err(|_| format!("invalid octet {:?}", octet))?;
        address = (address << 8) | u32::from(value);
    }
    if address == usc_protocol::INVALID_DEVICE {
        return Err("255.255.255.255 is reserved".to_string());
    }
    Ok(address)
}

fn load_config(path: &Path) -> Result<DumpConfig, DumpError> {
    let text = fs::read_to_string(path).map_err(|source| DumpError::Read {
        path: path.display().to_string(),
        source,
    })?;
    serde_yaml::from_str(&text).map_err(|source| DumpError::Config {
        path: path.display().to_string(),
        source,
    })
}

fn read_input(input: Option<&Path>) -> Result<Vec<u8>, DumpError> {
    match input {
        Some(path) if path != Path::new("-") => fs::read(path).map_err(|source| DumpError::Read {
            path: path.display().to_string(),
            source,
        }),
        _ => {
            let mut data = Vec::new();
            io::stdin()
                .lock()
                .read_to_end(&mut data)
                .map_err(|source| DumpError::Read {
                    path: "stdin".to_string(),
                    source,
                })?;
            Ok(data)
        }
    }
}

fn print_frame(out: &mut impl Write, command: &Command) -> io::Result<()> {
    if command.is_response() {
        let body = command.body().unwrap_or_default();
        return writeln!(
            out,
            "'{}' | response: '{}'",
            command.as_bytes().escape_ascii(),
            body.escape_ascii()
        );
    }

    write!(
        out,
        "'{}' | device: 0x{:08X}, component: {}",
        command.as_bytes().escape_ascii(),
        command.device(),
        command.component()
    )?;
    if let Some(action) = command.action() {
        write!(out, ", action: {}", action)?;
    }
    for kv in command.params() {
        match kv.value() {
            Some(value) => write!(out, ", {}={}", kv.key(), value.escape_ascii())?,
            None => write!(out, ", {}", kv.key())?,
        }
    }
    if command.has_checksum() {
        write!(out, ", checksum: {}", command.checksum())?;
    }
    if !command.is_addressed() {
        write!(out, " (not addressed)")?;
    }
    writeln!(out)
}

/// Decode `data` and print every frame and error to `out`.
fn dump(
    data: &[u8],
    config: CommandConfig,
    strict: bool,
    out: &mut impl Write,
) -> Result<Summary, DumpError> {
    let mut command = Command::new(config);
    let mut summary = Summary::default();

    for &byte in data {
        summary.bytes += 1;
        match command.process(byte) {
            Ok(Status::Next) => {}
            Ok(Status::Complete) => {
                summary.frames += 1;
                print_frame(out, &command)?;
            }
            Err(err) => {
                summary.errors += 1;
                writeln!(
                    out,
                    "'{}' ('{}') | {} error: {}, device: 0x{:08X}, component: {}",
                    command.as_bytes().escape_ascii(),
                    byte.escape_ascii(),
                    err.kind(),
                    err,
                    command.device(),
                    command.component()
                )?;
                if strict {
                    return Err(DumpError::Rejected(err));
                }
            }
        }
    }

    if !command.state().is_idle() {
        debug!(state = ?command.state(), "input ended inside a frame");
    }
    Ok(summary)
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn run(args: Args) -> Result<Summary, DumpError> {
    let mut settings = match &args.config {
        Some(path) => load_config(path)?,
        None => DumpConfig::default(),
    };
    if let Some(address) = args.address {
        settings.decoder.address = address;
    }
    if let Some(capacity) = args.capacity {
        settings.decoder.capacity = capacity;
    }
    let strict = args.strict || settings.strict;

    debug!(
        address = settings.decoder.address,
        capacity = settings.decoder.capacity,
        strict,
        "decoder settings"
    );

    let data = read_input(args.input.as_deref())?;
    let stdout = io::stdout();
    let mut out = stdout.lock();
    let summary = dump(&data, settings.decoder, strict, &mut out)?;
    out.flush()?;
    Ok(summary)
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing(args.verbose);

    match run(args) {
        Ok(summary) => {
            info!(
                bytes = summary.bytes,
                frames = summary.frames,
                errors = summary.errors,
                "done"
            );
            ExitCode::SUCCESS
        }
        Err(err @ DumpError::Rejected(_)) => {
            error!("{}", err);
            ExitCode::from(2)
        }
        Err(err) => {
            error!("{}", err);
            ExitCode::FAILURE
        }
    }
}
