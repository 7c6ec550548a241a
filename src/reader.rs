use flate2::read::GzDecoder;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::error::{PipelineError, Result};

pub const DEFAULT_BUFFER_SIZE: usize = 256 * 1024;

/// Opens a text file for buffered reading.
/// Automatically detects .gz files and applies gzip decompression.
/// A missing file is reported as `FileNotFound` rather than a bare IO error.
pub fn open_text_reader(path: &Path, buffer_size: usize) -> Result<Box<dyn BufRead + Send>> {
    let file = File::open(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => PipelineError::FileNotFound {
            path: path.to_path_buf(),
        },
        _ => PipelineError::Io(e),
    })?;

    let reader: Box<dyn BufRead + Send> = if is_gzipped(path) {
        // Gzipped file: File -> GzDecoder -> BufReader
        Box::new(BufReader::with_capacity(buffer_size, GzDecoder::new(file)))
    } else {
        Box::new(BufReader::with_capacity(buffer_size, file))
    };

    Ok(reader)
}

/// Rejects files above `limit_bytes` before any parsing starts.
pub fn check_file_size(path: &Path, limit_bytes: u64) -> Result<u64> {
    let metadata = std::fs::metadata(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => PipelineError::FileNotFound {
            path: path.to_path_buf(),
        },
        _ => PipelineError::Io(e),
    })?;

    let size_bytes = metadata.len();
    if size_bytes > limit_bytes {
        return Err(PipelineError::FileTooLarge {
            path: path.to_path_buf(),
            size_bytes,
            limit_bytes,
        });
    }
    Ok(size_bytes)
}

fn is_gzipped(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "gz")
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::{Read, Write};

    #[test]
    fn missing_file_is_reported_as_not_found() {
        let path = std::env::temp_dir().join("pepmap_reader_does_not_exist.tsv");
        let err = open_text_reader(&path, DEFAULT_BUFFER_SIZE).err().unwrap();
        assert!(matches!(err, PipelineError::FileNotFound { .. }));
    }

    #[test]
    fn reads_gzipped_text_transparently() {
        let path = std::env::temp_dir().join("pepmap_reader_test.txt.gz");
        let file = File::create(&path).unwrap();
        let mut encoder = GzEncoder::new(file, Compression::default());
        encoder.write_all(b">sp|P1|X\nMPEPTIDE\n").unwrap();
        encoder.finish().unwrap();

        let mut text = String::new();
        open_text_reader(&path, DEFAULT_BUFFER_SIZE)
            .unwrap()
            .read_to_string(&mut text)
            .unwrap();
        assert_eq!(text, ">sp|P1|X\nMPEPTIDE\n");

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn size_ceiling_is_enforced() {
        let path = std::env::temp_dir().join("pepmap_reader_size_test.csv");
        std::fs::write(&path, "a,b,c\n1,2,3\n").unwrap();

        assert_eq!(check_file_size(&path, 1024).unwrap(), 12);
        let err = check_file_size(&path, 4).unwrap_err();
        assert!(matches!(err, PipelineError::FileTooLarge { size_bytes: 12, .. }));

        let _ = std::fs::remove_file(&path);
    }
}
