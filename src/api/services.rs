use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::{
    Json,
    extract::{Path as UrlPath, Request, State},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use tower::ServiceExt;
use tower_http::services::ServeFile;
use tracing::{info, warn};

use super::{
    events::ServerEvent,
    models::{
        CodecOption, ConfigResponse, DeleteFileResponse, DownloadDirRequest, DownloadDirResponse,
        DownloadSubmission, FileEntry, FilesResponse, HealthResponse, InfoRequest, InfoResponse,
        JobAcceptedResponse, PluginsResponse, ValidateDirRequest, ValidateDirResponse,
    },
    state::AppState,
    utils::read_json,
    validation::{self, RequestValidationError},
};
use crate::api::error::ApiError;
use crate::config::Preferences;
use crate::download::{AudioCodec, DownloadError, ProgressSink, Quality, Stage, VideoCodec};
use crate::extractor::FetchOptions;
use crate::humanize::ByteSize;
use crate::jobs::{DEFAULT_HANDLER, JobSpec, new_job_id};

/// Starts a download job (POST /api/download)
///
/// Options the request leaves open come from the handler's own defaults,
/// then from the preferences file. Handler and processor
/// names are checked before the job is spawned, so an unknown name is a
/// 400 and no job starts. Progress and the final outcome are published on
/// the event bus, never in this response.
pub async fn submit_download(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: axum::body::Body,
) -> Result<impl IntoResponse, ApiError> {
    let submission: DownloadSubmission =
        read_json(&headers, body, state.max_payload_bytes()).await?;
    let url = validation::validate_url(&submission.url)
        .map_err(rejected)?
        .to_string();

    let prefs = load_preferences(&state).await?;
    let spec = JobSpec::new(url.clone(), submission.options())
        .with_fallback(prefs.fallback_options())
        .with_handler(submission.handler.as_deref().unwrap_or(DEFAULT_HANDLER))
        .with_processors(submission.processors.clone());
    state.runner.check(&spec)?;

    let job_id = new_job_id();
    info!(job_id = %job_id, url = %url, handler = %spec.handler, "Download accepted");

    let runner = state.runner.clone();
    let events = state.events.clone();
    let spawned_id = job_id.clone();
    tokio::spawn(async move {
        let sink: Arc<dyn ProgressSink> = Arc::new(events.clone());
        let outcome = match runner.run(&spawned_id, &spec, sink).await {
            Ok(result) => ServerEvent::from_result(&spawned_id, &result),
            Err(e) => ServerEvent::failure(&spawned_id, e.to_string()),
        };
        events.publish(outcome);
    });

    let response = JobAcceptedResponse {
        job_id,
        status: "started".to_string(),
        url,
    };
    Ok((StatusCode::ACCEPTED, Json(response)))
}

/// Metadata lookup without downloading (POST /api/info)
pub async fn media_info(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: axum::body::Body,
) -> Result<Json<InfoResponse>, ApiError> {
    let request: InfoRequest = read_json(&headers, body, state.max_payload_bytes()).await?;
    let url = validation::validate_url(&request.url).map_err(rejected)?;

    let info = state
        .extractor
        .fetch_metadata(url, &FetchOptions::default())
        .await
        .map_err(|e| {
            warn!(url, error = %e, "Metadata lookup failed");
            ApiError::Extraction(DownloadError::extraction(Stage::Metadata, &e.to_string()).to_string())
        })?;

    Ok(Json(InfoResponse::from_info(url, &info)))
}

pub async fn list_plugins(State(state): State<AppState>) -> Json<PluginsResponse> {
    Json(PluginsResponse {
        plugins: state.registry.list(),
    })
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        jobs: state.metrics.snapshot(),
    })
}

pub async fn get_config(State(state): State<AppState>) -> Result<Json<ConfigResponse>, ApiError> {
    let prefs = load_preferences(&state).await?;

    Ok(Json(ConfigResponse {
        version: env!("CARGO_PKG_VERSION"),
        download_dir: prefs.download_dir,
        default_quality: prefs.default_quality,
        default_video_codec: prefs.default_video_codec,
        default_audio_codec: prefs.default_audio_codec,
        qualities: Quality::ALL.iter().map(|q| q.as_str()).collect(),
        video_codecs: VideoCodec::ALL
            .iter()
            .map(|c| CodecOption {
                name: c.as_str(),
                description: c.description(),
            })
            .collect(),
        audio_codecs: AudioCodec::ALL
            .iter()
            .map(|c| CodecOption {
                name: c.as_str(),
                description: c.description(),
            })
            .collect(),
    }))
}

/// Changes and persists the download directory (POST /api/config/download-dir)
pub async fn update_download_dir(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: axum::body::Body,
) -> Result<Json<DownloadDirResponse>, ApiError> {
    let request: DownloadDirRequest = read_json(&headers, body, state.max_payload_bytes()).await?;
    let dir = validation::prepare_directory(&request.download_dir).map_err(rejected)?.to_path_buf();

    let store = state.preferences.clone();
    let prefs = tokio::task::spawn_blocking(move || store.set_download_dir(dir))
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    info!(download_dir = %prefs.download_dir.display(), "Download directory updated");

    Ok(Json(DownloadDirResponse {
        status: "success",
        download_dir: prefs.download_dir,
        message: "Download directory updated successfully",
    }))
}

/// Dry-run check of a candidate download directory (POST /api/config/validate-dir)
pub async fn validate_dir(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: axum::body::Body,
) -> Result<Response, ApiError> {
    let request: ValidateDirRequest = read_json(&headers, body, state.max_payload_bytes()).await?;

    Ok(match validation::inspect_directory(&request.path) {
        Ok(verdict) => Json(verdict).into_response(),
        Err(e) => (
            StatusCode::BAD_REQUEST,
            Json(ValidateDirResponse::invalid(e.to_string())),
        )
            .into_response(),
    })
}

/// Files in the download directory, newest first (GET /api/files)
pub async fn list_files(State(state): State<AppState>) -> Result<Json<FilesResponse>, ApiError> {
    let dir = load_preferences(&state).await?.download_dir;
    let files = scan_directory(&dir)
        .await
        .map_err(|e| ApiError::Internal(format!("cannot list {}: {e}", dir.display())))?;
    Ok(Json(FilesResponse { files }))
}

pub async fn get_file(
    State(state): State<AppState>,
    UrlPath(name): UrlPath<String>,
    request: Request,
) -> Result<Response, ApiError> {
    let path = existing_file(&state, &name).await?;

    let mut response = match ServeFile::new(&path).oneshot(request).await {
        Ok(response) => response.into_response(),
        Err(never) => match never {},
    };

    let disposition = format!("attachment; filename=\"{}\"", name.replace('"', "'"));
    if let Ok(value) = HeaderValue::from_str(&disposition) {
        response.headers_mut().insert(header::CONTENT_DISPOSITION, value);
    }
    Ok(response)
}

pub async fn delete_file(
    State(state): State<AppState>,
    UrlPath(name): UrlPath<String>,
) -> Result<Json<DeleteFileResponse>, ApiError> {
    let path = existing_file(&state, &name).await?;

    tokio::fs::remove_file(&path)
        .await
        .map_err(|e| ApiError::Internal(format!("cannot delete {name}: {e}")))?;
    info!(file = %path.display(), "File deleted");

    Ok(Json(DeleteFileResponse {
        status: "success",
        message: format!("Deleted {name}"),
        filename: name,
    }))
}

/// Reads the preferences file on the blocking pool
async fn load_preferences(state: &AppState) -> Result<Preferences, ApiError> {
    let store = state.preferences.clone();
    tokio::task::spawn_blocking(move || store.load())
        .await
        .map_err(|e| ApiError::Internal(format!("preferences load aborted: {e}")))
}

async fn existing_file(state: &AppState, name: &str) -> Result<PathBuf, ApiError> {
    let name = validation::validate_file_name(name).map_err(rejected)?;
    let path = load_preferences(state).await?.download_dir.join(name);

    match tokio::fs::metadata(&path).await {
        Ok(meta) if meta.is_file() => Ok(path),
        _ => Err(ApiError::NotFound(format!("file {name}"))),
    }
}

async fn scan_directory(dir: &Path) -> std::io::Result<Vec<FileEntry>> {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e),
    };

    let mut files = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.starts_with('.') {
            continue;
        }
        let meta = entry.metadata().await?;
        if !meta.is_file() {
            continue;
        }

        let modified = meta
            .modified()
            .map(|time| chrono::DateTime::<chrono::Utc>::from(time).timestamp())
            .unwrap_or_default();
        files.push(FileEntry {
            name,
            size: meta.len(),
            size_human: ByteSize(meta.len()).to_human_readable(),
            modified,
        });
    }

    files.sort_by(|a, b| b.modified.cmp(&a.modified).then_with(|| a.name.cmp(&b.name)));
    Ok(files)
}

fn rejected(err: RequestValidationError) -> ApiError {
    ApiError::InvalidPayload(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn scan_skips_hidden_and_directories() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("clip.mp4"), vec![0u8; 2048]).unwrap();
        std::fs::write(tmp.path().join(".hidden"), "x").unwrap();
        std::fs::create_dir(tmp.path().join("nested")).unwrap();

        let files = scan_directory(tmp.path()).await.unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].name, "clip.mp4");
        assert_eq!(files[0].size, 2048);
        assert_eq!(files[0].size_human, "2.0 KB");
    }

    #[tokio::test]
    async fn scan_of_missing_directory_is_empty() {
        let tmp = TempDir::new().unwrap();
        let files = scan_directory(&tmp.path().join("absent")).await.unwrap();
        assert!(files.is_empty());
    }
}
