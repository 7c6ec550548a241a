//! Logger installation for the batch driver.
//!
//! Records go through the `log` facade and are written as `[LEVEL] message`
//! lines to stderr and, when a run directory exists, to its log file.

use anyhow::{Context, Result};
use log::LevelFilter;
use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

/// Duplicates every write to stderr and an optional log file.
pub struct TeeWriter<W: Write> {
    stderr: io::Stderr,
    file: Option<W>,
}

impl<W: Write> TeeWriter<W> {
    pub fn new(file: Option<W>) -> Self {
        Self {
            stderr: io::stderr(),
            file,
        }
    }

    pub fn into_inner(self) -> Option<W> {
        self.file
    }
}

impl<W: Write> Write for TeeWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.stderr.write_all(buf)?;
        if let Some(file) = self.file.as_mut() {
            file.write_all(buf)?;
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.stderr.flush()?;
        if let Some(file) = self.file.as_mut() {
            file.flush()?;
        }
        Ok(())
    }
}

pub fn format_line(level: log::Level, message: &std::fmt::Arguments<'_>) -> String {
    format!("[{}] {}", level, message)
}

/// Install the global logger. Can only succeed once per process.
pub fn init(log_path: Option<&Path>, level: LevelFilter) -> Result<()> {
    let file = log_path
        .map(|path| {
            File::create(path)
                .with_context(|| format!("Failed to create log file {}", path.display()))
        })
        .transpose()?;

    env_logger::Builder::new()
        .filter_level(level)
        .write_style(env_logger::WriteStyle::Never)
        .format(|buf, record| writeln!(buf, "{}", format_line(record.level(), record.args())))
        .target(env_logger::Target::Pipe(Box::new(TeeWriter::new(file))))
        .try_init()
        .context("Logger already initialized")?;

    Ok(())
}
