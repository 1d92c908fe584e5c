// Parser crate for dashed service logs
// Line source -> parallel dispatcher -> line parser -> aggregator

pub mod types;
pub mod base_parser;
pub mod dashed_parser;

pub mod line_source;
pub mod dispatcher;
pub mod aggregation;
pub mod pipeline;

// Re-export main types
pub use types::*;
pub use base_parser::Parser;
pub use dashed_parser::DashedLineParser;
pub use dispatcher::{dispatch, DispatchConfig, Dispatcher};
pub use aggregation::{Aggregator, AnalysisStats, CountTable, MessageCount};
pub use pipeline::{analyze_file, analyze_lines, analyze_reader, analyze_with, Analysis};
