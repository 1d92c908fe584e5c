use crate::SourceError;
use std::fs::File;
use std::io::{BufRead, BufReader, ErrorKind};
use std::path::Path;
use tracing::{debug, info};

/// Read every line up front, trimmed of surrounding whitespace.
///
/// Blank lines are kept: each one still becomes an outcome downstream, so the
/// number of outcomes always equals the number of lines read here.
pub fn read_lines<R: BufRead>(reader: R) -> Result<Vec<String>, SourceError> {
    let mut lines = Vec::new();

    for line_result in reader.lines() {
        let line = line_result?;
        lines.push(line.trim().to_string());
    }

    debug!("Read {} lines from source", lines.len());
    Ok(lines)
}

/// Open `path` and read its lines. A missing file is reported as
/// [`SourceError::NotFound`] before anything is parsed.
pub fn read_log_file(path: impl AsRef<Path>) -> Result<Vec<String>, SourceError> {
    let path = path.as_ref();
    info!("Reading log file: {}", path.display());

    let file = File::open(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => SourceError::NotFound(path.display().to_string()),
        _ => SourceError::Io(e),
    })?;

    read_lines(BufReader::new(file))
}
