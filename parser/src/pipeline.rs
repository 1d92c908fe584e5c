use crate::dispatcher::{DispatchConfig, Dispatcher};
use crate::line_source::{read_lines, read_log_file};
use crate::{base_parser::Parser, Aggregator, AnalysisStats, DashedLineParser, ParseOutcome, SourceError};
use std::io::BufRead;
use std::path::Path;
use tracing::{info, warn};

/// Result of one pipeline run: the outcomes as the dispatcher returned them
/// and the aggregator that classified them. Read-only from here on.
#[derive(Debug, Clone)]
pub struct Analysis {
    outcomes: Vec<ParseOutcome>,
    aggregator: Aggregator,
}

impl Analysis {
    pub fn outcomes(&self) -> &[ParseOutcome] {
        &self.outcomes
    }

    pub fn aggregator(&self) -> &Aggregator {
        &self.aggregator
    }

    pub fn stats(&self) -> AnalysisStats {
        self.aggregator.snapshot()
    }

    pub fn all_successful(&self) -> bool {
        self.aggregator.failed_entries().is_empty()
    }
}

/// Dispatch `lines` with `parser` and classify every outcome on the calling
/// thread. A fresh aggregator is built for every call.
pub fn analyze_with<P: Parser>(parser: P, lines: Vec<String>, config: &DispatchConfig) -> Analysis {
    let line_count = lines.len();
    let outcomes = Dispatcher::new(parser, config.clone()).dispatch(lines);

    let mut aggregator = Aggregator::new();
    for outcome in &outcomes {
        aggregator.classify(outcome.clone());
    }

    let failed = aggregator.failed_entries().len();
    if failed > 0 {
        warn!(
            "Not all log lines were processed successfully: {} of {} failed",
            failed, line_count
        );
    } else {
        info!("All {} log lines were processed successfully", line_count);
    }

    Analysis { outcomes, aggregator }
}

pub fn analyze_lines(lines: Vec<String>, config: &DispatchConfig) -> Analysis {
    analyze_with(DashedLineParser, lines, config)
}

pub fn analyze_reader<R: BufRead>(reader: R, config: &DispatchConfig) -> Result<Analysis, SourceError> {
    let lines = read_lines(reader)?;
    Ok(analyze_lines(lines, config))
}

pub fn analyze_file(path: impl AsRef<Path>, config: &DispatchConfig) -> Result<Analysis, SourceError> {
    let lines = read_log_file(path)?;
    Ok(analyze_lines(lines, config))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LogLevel;
    use std::io::Cursor;

    #[test]
    fn test_two_valid_one_malformed() {
        let lines = vec![
            "2024-01-01 10:00:00 - ServiceA - INFO - started".to_string(),
            "this line is broken".to_string(),
            "2024-01-01 10:00:05 - ServiceB - ERROR - disk full".to_string(),
        ];
        let analysis = analyze_lines(lines, &DispatchConfig::with_workers(2));
        let stats = analysis.stats();

        assert_eq!(analysis.outcomes().len(), 3);
        assert_eq!(stats.successful_entries, 2);
        assert_eq!(stats.failed_entries, 1);
        assert!(!analysis.all_successful());
        assert!(analysis.outcomes()[1].as_failure().is_some());
    }

    #[test]
    fn test_reader_counts_every_line() {
        let data = "2024-01-01 10:00:00 - ServiceA - ERROR - disk full\n\
                    \n\
                    2024-01-01 10:00:01 - ServiceA - ERROR - disk full\n\
                    2024-01-01 10:00:02 - ServiceC - DEBUG - cache warm\n";
        let analysis = analyze_reader(Cursor::new(data), &DispatchConfig::default()).unwrap();
        let stats = analysis.stats();

        assert_eq!(stats.total(), 4);
        assert_eq!(stats.failed_entries, 1);
        assert_eq!(stats.error_messages.get("disk full"), Some(2));
        assert_eq!(analysis.aggregator().entries_for_level(LogLevel::Debug).count(), 1);
    }

    #[test]
    fn test_runs_do_not_share_state() {
        let line = "2024-01-01 10:00:00 - ServiceA - INFO - started".to_string();
        let first = analyze_lines(vec![line.clone()], &DispatchConfig::default());
        let second = analyze_lines(vec![line], &DispatchConfig::default());

        assert_eq!(first.stats().successful_entries, 1);
        assert_eq!(second.stats().successful_entries, 1);
    }

    #[test]
    fn test_missing_file_fails_before_parsing() {
        let result = analyze_file("/no/such/dir/app.log", &DispatchConfig::default());
        assert!(matches!(result, Err(SourceError::NotFound(_))));
    }
}
