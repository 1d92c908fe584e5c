use chrono::{DateTime, Utc};
use log_parser::{AnalysisStats, ParseOutcome};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Written next to the exported artifacts of one run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisManifest {
    pub analysis_id: String,
    pub source: String,
    pub created_at: DateTime<Utc>,
    pub line_count: usize,
    pub successful_entries: usize,
    pub failed_entries: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAnalysisResponse {
    pub analysis_id: String,
    pub stats: AnalysisStats,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutcomeKind {
    #[default]
    All,
    Successful,
    Failed,
}

impl OutcomeKind {
    pub fn matches(&self, outcome: &ParseOutcome) -> bool {
        match self {
            OutcomeKind::All => true,
            OutcomeKind::Successful => outcome.is_record(),
            OutcomeKind::Failed => !outcome.is_record(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct OutcomesQuery {
    #[serde(default)]
    pub kind: OutcomeKind,
}

/// One exported "sheet" of an analysis
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Table {
    Successful,
    Failed,
    Services,
    LogLevels,
    ErrorMessages,
}

impl Table {
    pub const ALL: [Table; 5] = [
        Table::Successful,
        Table::Failed,
        Table::Services,
        Table::LogLevels,
        Table::ErrorMessages,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Table::Successful => "successful",
            Table::Failed => "failed",
            Table::Services => "services",
            Table::LogLevels => "log_levels",
            Table::ErrorMessages => "error_messages",
        }
    }

    pub fn file_name(&self) -> String {
        format!("{}.arrow", self.name())
    }
}

impl FromStr for Table {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.strip_suffix(".arrow").unwrap_or(s);
        Table::ALL
            .into_iter()
            .find(|t| t.name() == name)
            .ok_or_else(|| format!("unknown table: {}", s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use log_parser::{DashedLineParser, Parser};

    #[test]
    fn test_table_names() {
        assert_eq!("log_levels".parse::<Table>(), Ok(Table::LogLevels));
        assert_eq!("error_messages.arrow".parse::<Table>(), Ok(Table::ErrorMessages));
        assert!("sheet1".parse::<Table>().is_err());
        assert_eq!(Table::Failed.file_name(), "failed.arrow");
    }

    #[test]
    fn test_outcome_kind_filter() {
        let ok = DashedLineParser.parse("2024-01-01 10:00:00 - ServiceA - INFO - up");
        let bad = DashedLineParser.parse("nope");

        assert!(OutcomeKind::All.matches(&ok) && OutcomeKind::All.matches(&bad));
        assert!(OutcomeKind::Successful.matches(&ok) && !OutcomeKind::Successful.matches(&bad));
        assert!(OutcomeKind::Failed.matches(&bad) && !OutcomeKind::Failed.matches(&ok));
    }

    #[test]
    fn test_outcome_kind_defaults_to_all() {
        let query: OutcomesQuery = serde_json::from_str("{}").unwrap();
        assert_eq!(query.kind, OutcomeKind::All);
    }
}
