use crate::dashed_parser::{DashedLineParser, DELIMITER};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Severity of a log record.
///
/// Only these four spellings are accepted. `WARNING` and `CRITICAL` are
/// rejected like any other unknown level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub const ALL: [LogLevel; 4] = [LogLevel::Debug, LogLevel::Info, LogLevel::Warn, LogLevel::Error];

    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = FieldError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "DEBUG" => Ok(LogLevel::Debug),
            "INFO" => Ok(LogLevel::Info),
            "WARN" => Ok(LogLevel::Warn),
            "ERROR" => Ok(LogLevel::Error),
            other => Err(FieldError::InvalidLevel(other.to_string())),
        }
    }
}

/// A validated log line.
///
/// Fields are private so a record can only come out of a parser, and never
/// changes afterwards. Deserialized records go through the same field checks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawLogRecord")]
pub struct LogRecord {
    #[serde(rename = "date_time")]
    timestamp: String,
    service_name: String,
    log_level: LogLevel,
    message: String,
}

impl LogRecord {
    pub(crate) fn new(timestamp: String, service_name: String, log_level: LogLevel, message: String) -> Self {
        Self {
            timestamp,
            service_name,
            log_level,
            message,
        }
    }

    pub fn timestamp(&self) -> &str {
        &self.timestamp
    }

    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    pub fn log_level(&self) -> LogLevel {
        self.log_level
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

#[derive(Deserialize)]
struct RawLogRecord {
    date_time: String,
    service_name: String,
    log_level: String,
    message: String,
}

impl TryFrom<RawLogRecord> for LogRecord {
    type Error = FieldError;

    fn try_from(raw: RawLogRecord) -> Result<Self, Self::Error> {
        let line = [raw.date_time, raw.service_name, raw.log_level, raw.message].join(DELIMITER);
        DashedLineParser::parse_fields(&line)
    }
}

/// A line that could not be turned into a [`LogRecord`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseFailure {
    pub raw_line: String,
    pub error_detail: String,
}

impl ParseFailure {
    pub fn new(raw_line: impl Into<String>, error: impl fmt::Display) -> Self {
        Self {
            raw_line: raw_line.into(),
            error_detail: error.to_string(),
        }
    }
}

/// Result of parsing exactly one input line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParseOutcome {
    Record(LogRecord),
    Failure(ParseFailure),
}

impl ParseOutcome {
    pub fn is_record(&self) -> bool {
        matches!(self, ParseOutcome::Record(_))
    }

    pub fn as_record(&self) -> Option<&LogRecord> {
        match self {
            ParseOutcome::Record(record) => Some(record),
            ParseOutcome::Failure(_) => None,
        }
    }

    pub fn as_failure(&self) -> Option<&ParseFailure> {
        match self {
            ParseOutcome::Record(_) => None,
            ParseOutcome::Failure(failure) => Some(failure),
        }
    }
}

impl From<LogRecord> for ParseOutcome {
    fn from(record: LogRecord) -> Self {
        ParseOutcome::Record(record)
    }
}

impl From<ParseFailure> for ParseOutcome {
    fn from(failure: ParseFailure) -> Self {
        ParseOutcome::Failure(failure)
    }
}

/// Why a line was rejected. The `Display` text is what ends up in
/// [`ParseFailure::error_detail`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FieldError {
    #[error("malformed line: expected 4 fields, found {0}")]
    FieldCount(usize),
    #[error("invalid date_time '{0}': expected YYYY-MM-DD HH:MM:SS")]
    InvalidTimestamp(String),
    #[error("invalid service_name '{0}': expected Service followed by one uppercase letter")]
    InvalidService(String),
    #[error("invalid log_level '{0}': expected one of DEBUG, INFO, WARN, ERROR")]
    InvalidLevel(String),
    #[error("invalid message: must not be empty")]
    EmptyMessage,
}

/// The line source could not produce its lines. Fatal to a pipeline run.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("log file not found: {0}")]
    NotFound(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_round_trips_through_str() {
        for level in LogLevel::ALL {
            assert_eq!(level.as_str().parse::<LogLevel>().unwrap(), level);
        }
    }

    #[test]
    fn test_level_rejects_long_spellings() {
        assert_eq!(
            "WARNING".parse::<LogLevel>(),
            Err(FieldError::InvalidLevel("WARNING".to_string()))
        );
        assert!("CRITICAL".parse::<LogLevel>().is_err());
        assert!("info".parse::<LogLevel>().is_err());
    }

    #[test]
    fn test_record_serializes_with_wire_names() {
        let record = LogRecord::new(
            "2024-01-01 10:00:00".to_string(),
            "ServiceA".to_string(),
            LogLevel::Info,
            "started".to_string(),
        );
        let value = serde_json::to_value(&record).unwrap();

        assert_eq!(value["date_time"], "2024-01-01 10:00:00");
        assert_eq!(value["service_name"], "ServiceA");
        assert_eq!(value["log_level"], "INFO");
        assert_eq!(value["message"], "started");
        assert_eq!(value.as_object().unwrap().len(), 4);
    }

    #[test]
    fn test_outcome_untagged_json() {
        let failure: ParseOutcome = ParseFailure::new("garbage", FieldError::FieldCount(1)).into();
        let json = serde_json::to_string(&failure).unwrap();
        assert!(json.contains("\"raw_line\":\"garbage\""));

        let back: ParseOutcome = serde_json::from_str(&json).unwrap();
        assert_eq!(back, failure);
    }

    #[test]
    fn test_record_deserialize_applies_field_checks() {
        let valid = r#"{"date_time":"2024-01-01 10:00:00","service_name":"ServiceA","log_level":"INFO","message":"started"}"#;
        let record: LogRecord = serde_json::from_str(valid).unwrap();
        assert_eq!(record.service_name(), "ServiceA");
        assert_eq!(record.log_level(), LogLevel::Info);

        let bad_time = r#"{"date_time":"yesterday","service_name":"ServiceA","log_level":"INFO","message":"x"}"#;
        let err = serde_json::from_str::<LogRecord>(bad_time).unwrap_err();
        assert!(err.to_string().contains("date_time"));

        let bad_service = r#"{"date_time":"2024-01-01 10:00:00","service_name":"svc","log_level":"INFO","message":"x"}"#;
        assert!(serde_json::from_str::<LogRecord>(bad_service).is_err());

        let bad_level = r#"{"date_time":"2024-01-01 10:00:00","service_name":"ServiceA","log_level":"WARNING","message":"x"}"#;
        assert!(serde_json::from_str::<LogRecord>(bad_level).is_err());

        let empty_message = r#"{"date_time":"2024-01-01 10:00:00","service_name":"ServiceA","log_level":"INFO","message":""}"#;
        assert!(serde_json::from_str::<LogRecord>(empty_message).is_err());
    }

    #[test]
    fn test_invalid_record_does_not_deserialize_as_outcome() {
        let json = r#"{"date_time":"bad","service_name":"ServiceA","log_level":"INFO","message":"x"}"#;
        assert!(serde_json::from_str::<ParseOutcome>(json).is_err());
    }
}
