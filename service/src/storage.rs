use crate::arrow_io::{counts_batch, failures_batch, records_batch, write_arrow_table};
use crate::models::{AnalysisManifest, Table};
use log_parser::{Analysis, AnalysisStats, ParseOutcome};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use uuid::Uuid;

pub const OUTCOMES_FILE: &str = "analyzer_output.json";
pub const STATS_FILE: &str = "log_analysis.json";
pub const MANIFEST_FILE: &str = "manifest.json";
pub const OUTCOMES_MSGPACK_FILE: &str = "outcomes.mp";
const TABLES_DIR: &str = "tables";

/// Writing or reading exported artifacts failed
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("MessagePack encode error: {0}")]
    MsgPackEncode(#[from] rmp_serde::encode::Error),
    #[error("MessagePack decode error: {0}")]
    MsgPackDecode(#[from] rmp_serde::decode::Error),
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),
    #[error("analysis not found: {0}")]
    NotFound(String),
}

/// One directory per analysis run under `base_path`
pub struct AnalysisStorage {
    base_path: PathBuf,
}

impl AnalysisStorage {
    pub fn new(base_path: impl AsRef<Path>) -> std::io::Result<Self> {
        let base_path = base_path.as_ref().to_path_buf();
        fs::create_dir_all(&base_path)?;
        Ok(Self { base_path })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    pub fn create_analysis(&self) -> std::io::Result<String> {
        let analysis_id = Uuid::new_v4().to_string();
        let analysis_path = self.base_path.join(&analysis_id);

        fs::create_dir_all(analysis_path.join(TABLES_DIR))?;

        Ok(analysis_id)
    }

    /// Directory of an existing analysis. Ids that are not UUIDs are
    /// rejected so they can never escape `base_path`.
    pub fn analysis_path(&self, analysis_id: &str) -> Result<PathBuf, ExportError> {
        if Uuid::parse_str(analysis_id).is_err() {
            return Err(ExportError::NotFound(analysis_id.to_string()));
        }
        let path = self.base_path.join(analysis_id);
        if !path.is_dir() {
            return Err(ExportError::NotFound(analysis_id.to_string()));
        }
        Ok(path)
    }

    pub fn delete_analysis(&self, analysis_id: &str) -> Result<(), ExportError> {
        let path = self.analysis_path(analysis_id)?;
        fs::remove_dir_all(path)?;
        Ok(())
    }

    pub fn write_json<T: Serialize + ?Sized>(
        &self,
        analysis_id: &str,
        file_name: &str,
        value: &T,
    ) -> Result<(), ExportError> {
        let path = self.analysis_path(analysis_id)?.join(file_name);
        let json = serde_json::to_string_pretty(value)?;
        fs::write(&path, json)?;
        debug!("Wrote {}", path.display());
        Ok(())
    }

    pub fn read_json<T: DeserializeOwned>(&self, analysis_id: &str, file_name: &str) -> Result<T, ExportError> {
        let path = self.analysis_path(analysis_id)?.join(file_name);
        let json = read_existing(&path, analysis_id)?;
        Ok(serde_json::from_slice(&json)?)
    }

    pub fn read_stats(&self, analysis_id: &str) -> Result<AnalysisStats, ExportError> {
        self.read_json(analysis_id, STATS_FILE)
    }

    pub fn read_manifest(&self, analysis_id: &str) -> Result<AnalysisManifest, ExportError> {
        self.read_json(analysis_id, MANIFEST_FILE)
    }

    pub fn write_outcomes(&self, analysis_id: &str, outcomes: &[ParseOutcome]) -> Result<(), ExportError> {
        let path = self.analysis_path(analysis_id)?.join(OUTCOMES_MSGPACK_FILE);
        let msgpack = rmp_serde::to_vec_named(&outcomes)?;
        fs::write(path, msgpack)?;
        Ok(())
    }

    pub fn read_outcomes(&self, analysis_id: &str) -> Result<Vec<ParseOutcome>, ExportError> {
        let path = self.analysis_path(analysis_id)?.join(OUTCOMES_MSGPACK_FILE);
        let msgpack = read_existing(&path, analysis_id)?;
        Ok(rmp_serde::from_slice(&msgpack)?)
    }

    pub fn table_path(&self, analysis_id: &str, table: Table) -> Result<PathBuf, ExportError> {
        Ok(self
            .analysis_path(analysis_id)?
            .join(TABLES_DIR)
            .join(table.file_name()))
    }

    /// Raw Arrow IPC stream bytes of one table
    pub fn read_table(&self, analysis_id: &str, table: Table) -> Result<Vec<u8>, ExportError> {
        let path = self.table_path(analysis_id, table)?;
        read_existing(&path, analysis_id)
    }

    fn write_tables(&self, analysis_id: &str, analysis: &Analysis) -> Result<(), ExportError> {
        let aggregator = analysis.aggregator();
        let stats = analysis.stats();

        for table in Table::ALL {
            let batch = match table {
                Table::Successful => records_batch(aggregator.successful_entries())?,
                Table::Failed => failures_batch(aggregator.failed_entries())?,
                Table::Services => counts_batch("service_name", &stats.service_entries)?,
                Table::LogLevels => counts_batch("log_level", &stats.log_level_entries)?,
                Table::ErrorMessages => counts_batch("message", &stats.error_messages)?,
            };
            write_arrow_table(&batch, &self.table_path(analysis_id, table)?)?;
        }
        Ok(())
    }
}

fn read_existing(path: &Path, analysis_id: &str) -> Result<Vec<u8>, ExportError> {
    fs::read(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => ExportError::NotFound(analysis_id.to_string()),
        _ => ExportError::Io(e),
    })
}

/// Create a new analysis directory and write every artifact of `analysis`
/// into it. Any failure is returned, nothing is skipped.
pub fn export_analysis(
    storage: &AnalysisStorage,
    source: &str,
    analysis: &Analysis,
) -> Result<AnalysisManifest, ExportError> {
    let analysis_id = storage.create_analysis()?;
    info!("Exporting analysis {} for source '{}'", analysis_id, source);

    let stats = analysis.stats();

    storage.write_json(&analysis_id, OUTCOMES_FILE, analysis.outcomes())?;
    storage.write_json(&analysis_id, STATS_FILE, &stats)?;
    storage.write_outcomes(&analysis_id, analysis.outcomes())?;
    storage.write_tables(&analysis_id, analysis)?;

    let manifest = AnalysisManifest {
        analysis_id: analysis_id.clone(),
        source: source.to_string(),
        created_at: chrono::Utc::now(),
        line_count: analysis.outcomes().len(),
        successful_entries: stats.successful_entries,
        failed_entries: stats.failed_entries,
    };
    storage.write_json(&analysis_id, MANIFEST_FILE, &manifest)?;

    info!(
        "Exported analysis {}: {} successful, {} failed",
        analysis_id, stats.successful_entries, stats.failed_entries
    );
    Ok(manifest)
}
