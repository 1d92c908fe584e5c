use crate::{base_parser::Parser, FieldError, LogLevel, LogRecord, ParseFailure, ParseOutcome};
use once_cell::sync::Lazy;
use regex::Regex;

/// Separator between the four fields of a line.
pub const DELIMITER: &str = " - ";
pub const FIELD_COUNT: usize = 4;

static TIMESTAMP_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2} \d{2}:\d{2}:\d{2}$").expect("timestamp pattern is valid"));
static SERVICE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^Service[A-Z]$").expect("service pattern is valid"));

/// Parser for `date_time - service_name - log_level - message` lines
/// Example: `2024-01-01 10:00:00 - ServiceA - INFO - started`
pub struct DashedLineParser;

impl DashedLineParser {
    pub(crate) fn parse_fields(line: &str) -> Result<LogRecord, FieldError> {
        let parts: Vec<&str> = line.split(DELIMITER).collect();
        if parts.len() != FIELD_COUNT {
            return Err(FieldError::FieldCount(parts.len()));
        }

        let (timestamp, service_name, level, message) = (parts[0], parts[1], parts[2], parts[3]);

        if !TIMESTAMP_RE.is_match(timestamp) {
            return Err(FieldError::InvalidTimestamp(timestamp.to_string()));
        }
        if !SERVICE_RE.is_match(service_name) {
            return Err(FieldError::InvalidService(service_name.to_string()));
        }
        let log_level: LogLevel = level.parse()?;
        if message.is_empty() {
            return Err(FieldError::EmptyMessage);
        }

        Ok(LogRecord::new(
            timestamp.to_string(),
            service_name.to_string(),
            log_level,
            message.to_string(),
        ))
    }
}

impl Parser for DashedLineParser {
    fn name(&self) -> &'static str {
        "dashed"
    }

    fn parse(&self, line: &str) -> ParseOutcome {
        match Self::parse_fields(line) {
            Ok(record) => ParseOutcome::Record(record),
            Err(e) => ParseOutcome::Failure(ParseFailure::new(line, e)),
        }
    }
}
