use csv::{ReaderBuilder, StringRecord};
use std::io::{BufRead, Read};
use std::path::{Path, PathBuf};

use crate::error::{PipelineError, Result};
use crate::reader::{open_text_reader, DEFAULT_BUFFER_SIZE};

/// An in-memory delimited text export with its header row.
#[derive(Debug, Clone)]
pub struct DelimitedTable {
    pub path: PathBuf,
    pub delimiter: u8,
    pub headers: StringRecord,
    pub rows: Vec<StringRecord>,
}

impl DelimitedTable {
    /// Reads a comma- or tab-separated file. The delimiter is sniffed from the
    /// header line, never from the file extension.
    pub fn read(path: &Path) -> Result<Self> {
        Self::read_buffered(path, DEFAULT_BUFFER_SIZE)
    }

    /// [`DelimitedTable::read`] through a read buffer of `buffer_size` bytes.
    pub fn read_buffered(path: &Path, buffer_size: usize) -> Result<Self> {
        let mut reader = open_text_reader(path, buffer_size)?;
        let mut header_line = String::new();
        reader.read_line(&mut header_line)?;
        strip_bom(&mut header_line);
        let delimiter = sniff_delimiter(&header_line);

        let mut rest = Vec::new();
        reader.read_to_end(&mut rest)?;
        let chained = header_line.as_bytes().chain(rest.as_slice());

        let mut csv_reader = ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(true)
            .flexible(true)
            .from_reader(chained);

        let headers = csv_reader.headers()?.clone();
        let rows = csv_reader
            .records()
            .collect::<std::result::Result<Vec<_>, _>>()?;

        log::debug!(
            "Read {} rows from {} (delimiter {:?})",
            rows.len(),
            path.display(),
            delimiter as char
        );

        Ok(Self {
            path: path.to_path_buf(),
            delimiter,
            headers,
            rows,
        })
    }

    /// Reads only the header row, used by format detection.
    pub fn read_headers(path: &Path) -> Result<StringRecord> {
        let mut reader = open_text_reader(path, DEFAULT_BUFFER_SIZE)?;
        let mut header_line = String::new();
        reader.read_line(&mut header_line)?;
        strip_bom(&mut header_line);
        let delimiter = sniff_delimiter(&header_line);
        let mut csv_reader = ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(true)
            .from_reader(header_line.as_bytes());
        Ok(csv_reader.headers()?.clone())
    }

    pub fn column(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h.trim() == name)
    }

    pub fn has_columns(&self, names: &[&str]) -> bool {
        names.iter().all(|name| self.column(name).is_some())
    }

    /// Resolves the indices of `names`, failing with `MissingColumns` naming `tool`.
    pub fn require_columns(&self, tool: &'static str, names: &[&str]) -> Result<Vec<usize>> {
        let missing: Vec<String> = names
            .iter()
            .filter(|name| self.column(name).is_none())
            .map(|name| name.to_string())
            .collect();

        if !missing.is_empty() {
            return Err(PipelineError::MissingColumns {
                tool,
                missing,
                path: self.path.clone(),
            });
        }

        Ok(names.iter().filter_map(|name| self.column(name)).collect())
    }
}

/// Returns the trimmed value of a cell, treating absent cells as empty.
pub fn cell(row: &StringRecord, index: usize) -> &str {
    row.get(index).map(str::trim).unwrap_or("")
}

fn strip_bom(line: &mut String) {
    if line.starts_with('\u{feff}') {
        line.drain(..'\u{feff}'.len_utf8());
    }
}

fn sniff_delimiter(header_line: &str) -> u8 {
    let tabs = header_line.matches('\t').count();
    let commas = header_line.matches(',').count();
    if tabs > 0 && tabs >= commas {
        b'\t'
    } else {
        b','
    }
}
