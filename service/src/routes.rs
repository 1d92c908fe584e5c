use axum::{
    Router,
    routing::{get, post},
    response::{IntoResponse, Response},
    http::{StatusCode, header},
    extract::{Path, Query, State, Multipart},
    Json,
};
use crate::error::ServiceError;
use crate::models::{AnalysisManifest, CreateAnalysisResponse, OutcomesQuery, Table};
use crate::storage::{AnalysisStorage, ExportError, export_analysis};
use log_parser::{AnalysisStats, DispatchConfig, ParseOutcome, analyze_lines, line_source::read_lines};
use std::io::Cursor;
use std::sync::Arc;
use tracing::{info, debug, error, instrument};

#[derive(Clone)]
pub struct AppState {
    pub storage: Arc<AnalysisStorage>,
    pub dispatch: DispatchConfig,
}

pub fn create_routes(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/analyses", post(create_analysis))
        .route("/analyses/:id/stats", get(get_stats))
        .route("/analyses/:id/outcomes", get(get_outcomes))
        .route("/analyses/:id/tables/:table", get(get_table))
        .route("/analyses/:id", get(get_manifest).delete(delete_analysis))
        .with_state(state)
}

fn export_error_status(e: ExportError) -> (StatusCode, String) {
    match e {
        ExportError::NotFound(id) => (StatusCode::NOT_FOUND, format!("Analysis not found: {}", id)),
        other => {
            error!("Storage error: {}", other);
            (StatusCode::INTERNAL_SERVER_ERROR, format!("Storage error: {}", other))
        }
    }
}

async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

#[instrument(skip(state, multipart))]
async fn create_analysis(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<CreateAnalysisResponse>, (StatusCode, String)> {
    info!("Received log upload request");

    let mut file_data: Option<Vec<u8>> = None;
    let mut filename = String::new();

    while let Some(field) = multipart.next_field().await
        .map_err(|e| {
            error!("Multipart error: {}", e);
            (StatusCode::BAD_REQUEST, format!("Multipart error: {}", e))
        })?
    {
        if field.name() == Some("file") {
            filename = field.file_name().unwrap_or("upload.log").to_string();
            info!("Receiving file: {}", filename);

            let data = field.bytes().await
                .map_err(|e| {
                    error!("Failed to read file data: {}", e);
                    (StatusCode::BAD_REQUEST, format!("Failed to read file: {}", e))
                })?;
            info!("File data received: {} bytes", data.len());
            file_data = Some(data.to_vec());
        }
    }

    // An empty file is a valid upload with zero lines
    let Some(file_data) = file_data else {
        error!("No file field in request");
        return Err((StatusCode::BAD_REQUEST, "No file provided".to_string()));
    };

    // Reading, parsing and file export all block
    let storage = state.storage.clone();
    let dispatch = state.dispatch.clone();
    let source = filename.clone();
    let (manifest, stats) = tokio::task::spawn_blocking(move || {
        let lines = read_lines(Cursor::new(file_data))?;
        debug!("Running pipeline on {} lines", lines.len());
        let analysis = analyze_lines(lines, &dispatch);
        let manifest = export_analysis(&storage, &source, &analysis)?;
        Ok::<_, ServiceError>((manifest, analysis.stats()))
    })
    .await
    .map_err(|e| {
        error!("Analysis task failed: {}", e);
        (StatusCode::INTERNAL_SERVER_ERROR, format!("Analysis task failed: {}", e))
    })?
    .map_err(|e| match e {
        ServiceError::Source(e) => {
            error!("Unreadable upload '{}': {}", filename, e);
            (StatusCode::BAD_REQUEST, format!("Unreadable log file: {}", e))
        }
        ServiceError::Export(e) => export_error_status(e),
        other => (StatusCode::INTERNAL_SERVER_ERROR, other.to_string()),
    })?;

    info!("Stored analysis {} for '{}'", manifest.analysis_id, filename);
    Ok(Json(CreateAnalysisResponse {
        analysis_id: manifest.analysis_id,
        stats,
    }))
}

async fn get_manifest(
    State(state): State<AppState>,
    Path(analysis_id): Path<String>,
) -> Result<Json<AnalysisManifest>, (StatusCode, String)> {
    let manifest = state.storage.read_manifest(&analysis_id)
        .map_err(export_error_status)?;

    Ok(Json(manifest))
}

async fn get_stats(
    State(state): State<AppState>,
    Path(analysis_id): Path<String>,
) -> Result<Json<AnalysisStats>, (StatusCode, String)> {
    let stats = state.storage.read_stats(&analysis_id)
        .map_err(export_error_status)?;

    Ok(Json(stats))
}

#[instrument(skip(state))]
async fn get_outcomes(
    State(state): State<AppState>,
    Path(analysis_id): Path<String>,
    Query(query): Query<OutcomesQuery>,
) -> Result<Json<Vec<ParseOutcome>>, (StatusCode, String)> {
    let outcomes = state.storage.read_outcomes(&analysis_id)
        .map_err(export_error_status)?;

    let filtered: Vec<ParseOutcome> = outcomes.into_iter()
        .filter(|o| query.kind.matches(o))
        .collect();
    debug!("Returning {} outcomes ({:?})", filtered.len(), query.kind);

    Ok(Json(filtered))
}

async fn get_table(
    State(state): State<AppState>,
    Path((analysis_id, table)): Path<(String, String)>,
) -> Result<Response, (StatusCode, String)> {
    let table: Table = table.parse()
        .map_err(|e: String| (StatusCode::NOT_FOUND, e))?;

    let buffer = state.storage.read_table(&analysis_id, table)
        .map_err(export_error_status)?;

    Ok((
        [(header::CONTENT_TYPE, "application/vnd.apache.arrow.stream")],
        buffer,
    ).into_response())
}

async fn delete_analysis(
    State(state): State<AppState>,
    Path(analysis_id): Path<String>,
) -> Result<StatusCode, (StatusCode, String)> {
    state.storage.delete_analysis(&analysis_id)
        .map_err(export_error_status)?;

    Ok(StatusCode::NO_CONTENT)
}
