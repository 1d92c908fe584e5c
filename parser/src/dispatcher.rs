use crate::{base_parser::Parser, DashedLineParser, ParseFailure, ParseOutcome};
use crossbeam_channel::{bounded, unbounded};
use std::panic::{self, AssertUnwindSafe};
use std::thread;
use tracing::{debug, error, trace};

/// Parsing a line is cheap string work, more threads than this only add
/// channel overhead.
pub const MAX_DEFAULT_WORKERS: usize = 4;

/// Jobs queued per worker before the feeder blocks.
const QUEUE_DEPTH_PER_WORKER: usize = 64;

/// Configuration for the parallel dispatcher
#[derive(Debug, Clone)]
pub struct DispatchConfig {
    pub num_workers: usize,
    pub preserve_order: bool,
    pub queue_capacity: usize,
}

impl DispatchConfig {
    pub fn with_workers(num_workers: usize) -> Self {
        let num_workers = num_workers.max(1);
        Self {
            num_workers,
            queue_capacity: num_workers * QUEUE_DEPTH_PER_WORKER,
            ..Self::default()
        }
    }
}

impl Default for DispatchConfig {
    fn default() -> Self {
        let num_workers = default_workers();
        Self {
            num_workers,
            preserve_order: true,
            queue_capacity: num_workers * QUEUE_DEPTH_PER_WORKER,
        }
    }
}

/// Available hardware parallelism, capped at [`MAX_DEFAULT_WORKERS`].
pub fn default_workers() -> usize {
    thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
        .min(MAX_DEFAULT_WORKERS)
}

/// Fans lines out to a fixed pool of worker threads and collects one
/// outcome per line.
pub struct Dispatcher<P: Parser> {
    parser: P,
    config: DispatchConfig,
}

impl Dispatcher<DashedLineParser> {
    pub fn dashed(config: DispatchConfig) -> Self {
        Self::new(DashedLineParser, config)
    }
}

impl<P: Parser> Dispatcher<P> {
    pub fn new(parser: P, config: DispatchConfig) -> Self {
        Self { parser, config }
    }

    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    /// Parse every line and block until all of them are done.
    ///
    /// Returns exactly `lines.len()` outcomes. With `preserve_order` the
    /// outcomes line up with the input, otherwise they come back in
    /// completion order.
    pub fn dispatch(&self, lines: Vec<String>) -> Vec<ParseOutcome> {
        let total = lines.len();
        if total == 0 {
            return Vec::new();
        }

        let workers = self.config.num_workers.clamp(1, total);
        debug!(
            "Dispatching {} lines to {} '{}' workers (preserve_order={})",
            total,
            workers,
            self.parser.name(),
            self.config.preserve_order
        );

        let (job_tx, job_rx) = bounded::<(usize, String)>(self.config.queue_capacity.max(1));
        let (result_tx, result_rx) = unbounded::<(usize, ParseOutcome)>();
        let parser = &self.parser;

        let mut results: Vec<(usize, ParseOutcome)> = thread::scope(|scope| {
            for worker_id in 0..workers {
                let job_rx = job_rx.clone();
                let result_tx = result_tx.clone();

                scope.spawn(move || {
                    let mut parsed = 0usize;
                    for (idx, line) in job_rx.iter() {
                        let outcome = parse_isolated(parser, &line);
                        parsed += 1;
                        if result_tx.send((idx, outcome)).is_err() {
                            break;
                        }
                    }
                    trace!("Worker {} parsed {} lines", worker_id, parsed);
                });
            }

            // Workers hold the only remaining handles
            drop(job_rx);
            drop(result_tx);

            for job in lines.into_iter().enumerate() {
                if job_tx.send(job).is_err() {
                    break;
                }
            }
            drop(job_tx);

            result_rx.iter().collect()
        });

        if self.config.preserve_order {
            results.sort_unstable_by_key(|(idx, _)| *idx);
        }

        debug_assert_eq!(results.len(), total);
        results.into_iter().map(|(_, outcome)| outcome).collect()
    }
}

/// A parser that panics on one line turns that line into a failure instead
/// of taking the worker down.
fn parse_isolated<P: Parser>(parser: &P, line: &str) -> ParseOutcome {
    match panic::catch_unwind(AssertUnwindSafe(|| parser.parse(line))) {
        Ok(outcome) => outcome,
        Err(_) => {
            error!("Parser '{}' panicked on line: {}", parser.name(), line);
            ParseOutcome::Failure(ParseFailure::new(line, "parser panicked"))
        }
    }
}

/// Dispatch with the default line parser.
pub fn dispatch(lines: Vec<String>, config: &DispatchConfig) -> Vec<ParseOutcome> {
    Dispatcher::dashed(config.clone()).dispatch(lines)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_lines(n: usize) -> Vec<String> {
        (0..n)
            .map(|i| {
                if i % 3 == 0 {
                    format!("bad line {}", i)
                } else {
                    format!("2024-01-01 10:00:{:02} - ServiceB - INFO - line {}", i % 60, i)
                }
            })
            .collect()
    }

    #[test]
    fn test_empty_input() {
        assert!(dispatch(Vec::new(), &DispatchConfig::default()).is_empty());
    }

    #[test]
    fn test_one_outcome_per_line_in_input_order() {
        let lines = sample_lines(500);
        let outcomes = dispatch(lines.clone(), &DispatchConfig::with_workers(4));

        assert_eq!(outcomes.len(), lines.len());
        for (i, outcome) in outcomes.iter().enumerate() {
            match outcome {
                ParseOutcome::Failure(f) => assert_eq!(f.raw_line, lines[i]),
                ParseOutcome::Record(r) => assert_eq!(r.message(), format!("line {}", i)),
            }
        }
    }

    #[test]
    fn test_matches_sequential_parse() {
        let lines = sample_lines(64);
        let sequential: Vec<ParseOutcome> = lines.iter().map(|l| DashedLineParser.parse(l)).collect();
        let parallel = dispatch(lines, &DispatchConfig::with_workers(3));
        assert_eq!(parallel, sequential);
    }

    #[test]
    fn test_unordered_keeps_the_same_set() {
        let lines = sample_lines(200);
        let config = DispatchConfig {
            preserve_order: false,
            ..DispatchConfig::with_workers(4)
        };
        let outcomes = dispatch(lines.clone(), &config);

        assert_eq!(outcomes.len(), 200);
        let failures = outcomes.iter().filter(|o| !o.is_record()).count();
        assert_eq!(failures, lines.iter().filter(|l| l.starts_with("bad")).count());
    }

    #[test]
    fn test_zero_workers_is_clamped() {
        let config = DispatchConfig {
            num_workers: 0,
            preserve_order: true,
            queue_capacity: 0,
        };
        assert_eq!(dispatch(sample_lines(10), &config).len(), 10);
    }

    struct PanickyParser;

    impl Parser for PanickyParser {
        fn name(&self) -> &'static str {
            "panicky"
        }

        fn parse(&self, line: &str) -> ParseOutcome {
            if line == "boom" {
                panic!("boom");
            }
            DashedLineParser.parse(line)
        }
    }

    #[test]
    fn test_panicking_line_is_isolated() {
        let lines = vec![
            "2024-01-01 10:00:00 - ServiceA - INFO - one".to_string(),
            "boom".to_string(),
            "2024-01-01 10:00:01 - ServiceA - INFO - two".to_string(),
        ];
        let outcomes = Dispatcher::new(PanickyParser, DispatchConfig::with_workers(2)).dispatch(lines);

        assert_eq!(outcomes.len(), 3);
        assert!(outcomes[0].is_record());
        assert_eq!(outcomes[1].as_failure().unwrap().error_detail, "parser panicked");
        assert!(outcomes[2].is_record());
    }

    #[test]
    fn test_default_workers_is_small() {
        let config = DispatchConfig::default();
        assert!(config.num_workers >= 1);
        assert!(config.num_workers <= MAX_DEFAULT_WORKERS);
    }
}
