use crate::config::ServiceConfig;
use crate::error::ServiceError;
use crate::models::AnalysisManifest;
use crate::storage::{export_analysis, AnalysisStorage, ExportError};
use log_parser::{analyze_file, AnalysisStats};
use std::path::Path;
use tracing::info;

/// One-shot run: read `file`, analyze it, export under `config.data_dir`.
pub fn run(config: &ServiceConfig, file: &Path) -> Result<(AnalysisManifest, AnalysisStats), ServiceError> {
    config.validate().map_err(ServiceError::Config)?;

    let analysis = analyze_file(file, &config.dispatch_config())?;
    let storage = AnalysisStorage::new(&config.data_dir).map_err(ExportError::Io)?;
    let manifest = export_analysis(&storage, &file.display().to_string(), &analysis)?;

    info!(
        "Analysis {} written to {}",
        manifest.analysis_id,
        storage.base_path().join(&manifest.analysis_id).display()
    );
    Ok((manifest, analysis.stats()))
}
