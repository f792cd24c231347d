//! Capture files: raw message streams written to disk.
//!
//! A capture holds back-to-back tagged messages exactly as they appear on
//! the socket, so a recording from either side of a bridge can be replayed
//! or inspected.

use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use xbridge::{BinaryReader, BinaryWriter, Registry, Value};

use crate::{OutputFormat, parse_value, render};

/// Arguments for `xbridge encode`.
#[derive(clap::Args)]
pub struct EncodeArgs {
    /// Capture file to create (overwritten if present).
    #[arg(short, long)]
    pub out: PathBuf,

    /// Values to encode, as JSON.
    #[arg(required = true)]
    pub values: Vec<String>,
}

/// Arguments for `xbridge dump`.
#[derive(clap::Args)]
pub struct DumpArgs {
    /// Capture file to read.
    pub file: PathBuf,

    /// Output format.
    #[arg(long, default_value = "table")]
    pub format: OutputFormat,
}

pub fn encode(args: &EncodeArgs) -> Result<()> {
    let values = args
        .values
        .iter()
        .map(|v| parse_value(v))
        .collect::<Result<Vec<_>>>()?;
    write_capture(&args.out, &values)?;
    eprintln!("{} message(s) written to {}", values.len(), args.out.display());
    Ok(())
}

pub fn dump(args: &DumpArgs) -> Result<()> {
    let mut stdout = io::stdout().lock();
    let n = dump_to(&args.file, args.format, &mut stdout)?;
    eprintln!("{n} message(s)");
    Ok(())
}

/// Writes `values` as consecutive messages to a new file at `path`.
fn write_capture(path: &Path, values: &[Value]) -> Result<()> {
    let file = File::create(path).with_context(|| format!("create {}", path.display()))?;
    let registry = Registry::global();
    let mut w = BinaryWriter::new(file);
    for value in values {
        registry.write_value(&mut w, value)?;
    }
    w.flush()?;
    tracing::debug!(path = %path.display(), messages = values.len(), "capture written");
    Ok(())
}

/// Prints every message in the capture at `path`; returns how many.
fn dump_to(path: &Path, format: OutputFormat, out: &mut impl Write) -> Result<usize> {
    let file = File::open(path).with_context(|| format!("open {}", path.display()))?;
    let registry = Registry::global();
    let mut r = BinaryReader::new(file);
    let mut count = 0;
    while !r.at_end()? {
        let value = registry
            .read_value(&mut r)
            .with_context(|| format!("message {count}"))?;
        writeln!(out, "{}", render(&value, format)?)?;
        count += 1;
    }
    tracing::debug!(path = %path.display(), messages = count, "capture read");
    Ok(count)
}
