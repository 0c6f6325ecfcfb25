//! Download orchestration
//!
//! One run walks `initializing -> fetching-metadata -> naming -> downloading
//! -> verifying -> completed | failed`. Every failure is terminal and is
//! returned as a sanitized [`DownloadResult`]; nothing is retried here.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::error::{DownloadError, Stage};
use super::naming::build_filename;
use super::progress::{Phase, ProgressAggregator, ProgressEvent, ProgressSink};
use super::request::{DownloadRequest, DownloadResult};
use crate::extractor::{Extractor, FetchOptions, MediaInfo, NativeProgress};
use crate::humanize::ByteSize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum JobState {
    Initializing,
    FetchingMetadata,
    Naming,
    Downloading,
    Verifying,
    Completed,
    Failed,
}

/// Artifact produced by a successful run
#[derive(Debug, Clone, PartialEq)]
pub struct Downloaded {
    pub path: PathBuf,
    pub size: ByteSize,
    pub title: Option<String>,
}

#[derive(Clone)]
pub struct Orchestrator {
    extractor: Arc<dyn Extractor>,
}

impl Orchestrator {
    pub fn new(extractor: Arc<dyn Extractor>) -> Self {
        Self { extractor }
    }

    /// Runs one job to completion, reporting progress to `sink`.
    pub async fn run(
        &self,
        job_id: &str,
        request: &DownloadRequest,
        sink: &dyn ProgressSink,
    ) -> DownloadResult {
        info!(job_id, url = %request.url, "Download started");

        match self.execute(job_id, request, sink).await {
            Ok(downloaded) => {
                transition(job_id, JobState::Completed);
                let size = downloaded.size.to_human_readable();
                sink.emit(ProgressEvent::new(
                    job_id,
                    Phase::Completed,
                    100.0,
                    format!("Download complete: {size}"),
                ));
                info!(job_id, path = %downloaded.path.display(), %size, "Download finished");
                DownloadResult::success(&request.url, downloaded.path, size, downloaded.title)
            }
            Err(err) => {
                transition(job_id, JobState::Failed);
                sink.emit(ProgressEvent::new(job_id, Phase::Error, 0.0, err.to_string()));
                warn!(job_id, kind = %err.kind(), error = %err, "Download failed");
                DownloadResult::failure(&request.url, &err)
            }
        }
    }

    async fn execute(
        &self,
        job_id: &str,
        request: &DownloadRequest,
        sink: &dyn ProgressSink,
    ) -> Result<Downloaded, DownloadError> {
        transition(job_id, JobState::Initializing);
        sink.emit(ProgressEvent::new(
            job_id,
            Phase::Initializing,
            0.0,
            "Fetching video information...",
        ));

        tokio::fs::create_dir_all(&request.output_dir)
            .await
            .map_err(|source| DownloadError::Storage {
                path: request.output_dir.clone(),
                source,
            })?;

        transition(job_id, JobState::FetchingMetadata);
        let base_options = FetchOptions {
            verbose: request.verbose,
            ..FetchOptions::default()
        };
        let info = self
            .extractor
            .fetch_metadata(&request.url, &base_options)
            .await
            .map_err(|e| {
                debug!(job_id, error = %e, "Metadata fetch failed");
                DownloadError::extraction(Stage::Metadata, &e.to_string())
            })?;

        transition(job_id, JobState::Naming);
        let base = build_filename(&info, request.preference.quality, &request.url);
        let expected = request
            .output_dir
            .join(format!("{base}.{}", request.preference.output_extension()));
        debug!(job_id, %base, "Output name resolved");

        transition(job_id, JobState::Downloading);
        sink.emit(ProgressEvent::new(
            job_id,
            Phase::Downloading,
            0.0,
            "Starting download...",
        ));

        let options = transfer_options(request, &base);
        let mut aggregator = ProgressAggregator::new(job_id, sink);
        self.extractor
            .fetch_media(&request.url, &options, &mut |native: NativeProgress| {
                aggregator.handle(native)
            })
            .await
            .map_err(|e| {
                debug!(job_id, error = %e, "Transfer failed");
                DownloadError::extraction(Stage::Transfer, &e.to_string())
            })?;

        transition(job_id, JobState::Verifying);
        let path = locate_artifact(&expected, &request.output_dir, &base).await?;
        let size = tokio::fs::metadata(&path)
            .await
            .map(|m| ByteSize(m.len()))
            .unwrap_or_default();

        Ok(Downloaded {
            path: absolute(path),
            size,
            title: title_of(&info),
        })
    }
}

fn transition(job_id: &str, state: JobState) {
    debug!(job_id, state = ?state, "Job state");
}

fn transfer_options(request: &DownloadRequest, base: &str) -> FetchOptions {
    let pref = &request.preference;
    FetchOptions {
        format: Some(pref.selector()),
        output_template: Some(request.output_dir.join(format!("{base}.%(ext)s"))),
        merge_output_format: (!pref.audio_only).then(|| "mp4".to_string()),
        extract_audio: pref.audio_only.then(|| pref.audio_codec.to_string()),
        verbose: request.verbose,
    }
}

/// Confirms the expected file exists, else adopts the first file in `dir`
/// sharing the base name.
async fn locate_artifact(expected: &Path, dir: &Path, base: &str) -> Result<PathBuf, DownloadError> {
    if tokio::fs::try_exists(expected).await.unwrap_or(false) {
        return Ok(expected.to_path_buf());
    }

    let prefix = format!("{base}.");
    let mut candidates = Vec::new();
    if let Ok(mut entries) = tokio::fs::read_dir(dir).await {
        while let Ok(Some(entry)) = entries.next_entry().await {
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.starts_with(&prefix) && !name.ends_with(".part") && !name.ends_with(".ytdl") {
                candidates.push(entry.path());
            }
        }
    }
    candidates.sort();

    match candidates.into_iter().next() {
        Some(found) => {
            debug!(expected = %expected.display(), found = %found.display(), "Adopted artifact by base name");
            Ok(found)
        }
        None => Err(DownloadError::ArtifactMissing {
            expected: expected.to_path_buf(),
        }),
    }
}

fn absolute(path: PathBuf) -> PathBuf {
    std::path::absolute(&path).unwrap_or(path)
}

fn title_of(info: &MediaInfo) -> Option<String> {
    info.title.clone().filter(|t| !t.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::download::error::ErrorKind;
    use crate::download::format::{AudioCodec, FormatPreference};
    use crate::download::request::DownloadStatus;
    use crate::extractor::{Artifact, ScriptedExtractor};
    use std::sync::Mutex;
    use tempfile::TempDir;

    fn info() -> MediaInfo {
        MediaInfo {
            id: Some("abc123".to_string()),
            title: Some("Test Clip".to_string()),
            upload_date: Some("20240101".to_string()),
            height: Some(720),
            vcodec: Some("avc1".to_string()),
            acodec: Some("mp4a".to_string()),
            extractor_key: Some("Example".to_string()),
            ..MediaInfo::default()
        }
    }

    fn phases(events: &Mutex<Vec<ProgressEvent>>) -> Vec<Phase> {
        events.lock().unwrap().iter().map(|e| e.phase).collect()
    }

    async fn run(extractor: ScriptedExtractor, request: &DownloadRequest) -> (DownloadResult, Vec<ProgressEvent>) {
        let events = Mutex::new(Vec::new());
        let sink = |event: ProgressEvent| events.lock().unwrap().push(event);
        let orchestrator = Orchestrator::new(Arc::new(extractor));
        let result = orchestrator.run("job-1", request, &sink).await;
        let events = events.into_inner().unwrap();
        (result, events)
    }

    #[tokio::test]
    async fn successful_run_reports_file() {
        let dir = TempDir::new().unwrap();
        let request = DownloadRequest::new("https://example.com/v", dir.path());
        let extractor = ScriptedExtractor::new(info())
            .with_events(vec![NativeProgress::finished("x.mp4")])
            .with_artifact_bytes(2048);

        let (result, events) = run(extractor, &request).await;

        assert_eq!(result.status, DownloadStatus::Success);
        let file = result.filename.unwrap();
        assert_eq!(
            file.file_name().unwrap().to_str().unwrap(),
            "20240101_Test_Clip_720p_avc1_mp4a__example_abc123.mp4"
        );
        assert!(file.is_absolute());
        assert_eq!(result.filesize.as_deref(), Some("2.0 KB"));
        assert_eq!(result.title.as_deref(), Some("Test Clip"));

        let phases: Vec<Phase> = events.iter().map(|e| e.phase).collect();
        assert_eq!(
            phases,
            vec![Phase::Initializing, Phase::Downloading, Phase::Processing, Phase::Completed]
        );
        assert_eq!(events.last().unwrap().message, "Download complete: 2.0 KB");
    }

    #[tokio::test]
    async fn metadata_failure_is_sanitized() {
        let dir = TempDir::new().unwrap();
        let request = DownloadRequest::new("https://example.com/v", dir.path());
        let extractor = ScriptedExtractor::new(info())
            .failing_metadata("ERROR: [x] abc: Private video. cookies=/home/me/c.txt");

        let (result, events) = run(extractor, &request).await;

        assert_eq!(result.status, DownloadStatus::Error);
        assert_eq!(result.error.as_deref(), Some("Video is private"));
        assert_eq!(result.error_kind, Some(ErrorKind::Private));
        let last = events.last().unwrap();
        assert_eq!((last.phase, last.percent), (Phase::Error, 0.0));
        assert_eq!(last.message, "Video is private");
    }

    #[tokio::test]
    async fn transfer_failure_uses_transfer_wording() {
        let dir = TempDir::new().unwrap();
        let request = DownloadRequest::new("https://example.com/v", dir.path());
        let extractor = ScriptedExtractor::new(info()).failing_transfer("connection reset");

        let (result, _) = run(extractor, &request).await;
        assert_eq!(result.error.as_deref(), Some("Failed to download video"));
        assert_eq!(result.error_kind, Some(ErrorKind::Generic));
    }

    #[tokio::test]
    async fn adopts_artifact_with_other_extension() {
        let dir = TempDir::new().unwrap();
        let request = DownloadRequest::new("https://example.com/v", dir.path());
        let extractor =
            ScriptedExtractor::new(info()).with_artifact(Artifact::WithExtension("mkv".into()));

        let (result, _) = run(extractor, &request).await;
        assert!(result.is_success());
        assert_eq!(result.filename.unwrap().extension().unwrap(), "mkv");
    }

    #[tokio::test]
    async fn missing_artifact_fails() {
        let dir = TempDir::new().unwrap();
        let request = DownloadRequest::new("https://example.com/v", dir.path());
        let extractor = ScriptedExtractor::new(info()).with_artifact(Artifact::Missing);

        let (result, _) = run(extractor, &request).await;
        assert_eq!(result.error_kind, Some(ErrorKind::ArtifactMissing));
    }

    #[tokio::test]
    async fn unwritable_directory_is_storage_error() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, b"x").unwrap();
        let request = DownloadRequest::new("https://example.com/v", blocker.join("sub"));

        let events = Mutex::new(Vec::new());
        let sink = |event: ProgressEvent| events.lock().unwrap().push(event);
        let result = Orchestrator::new(Arc::new(ScriptedExtractor::new(info())))
            .run("job-2", &request, &sink)
            .await;

        assert_eq!(result.error.as_deref(), Some("Cannot prepare download directory"));
        assert_eq!(result.error_kind, Some(ErrorKind::Storage));
        assert_eq!(phases(&events), vec![Phase::Initializing, Phase::Error]);
    }

    #[tokio::test]
    async fn audio_only_transfer_options() {
        let dir = TempDir::new().unwrap();
        let mut request = DownloadRequest::new("https://example.com/v", dir.path());
        request.preference = FormatPreference {
            audio_only: true,
            audio_codec: AudioCodec::Mp3,
            ..FormatPreference::default()
        };

        let extractor = Arc::new(ScriptedExtractor::new(info()));
        let result = Orchestrator::new(extractor.clone())
            .run("job-3", &request, &crate::download::NullSink)
            .await;
        assert!(result.is_success());
        assert_eq!(result.filename.unwrap().extension().unwrap(), "mp3");

        let (_, options) = extractor.media_requests().remove(0);
        assert_eq!(options.extract_audio.as_deref(), Some("mp3"));
        assert_eq!(options.merge_output_format, None);
        assert_eq!(
            options.format.as_deref(),
            Some("bestaudio[acodec=mp3]/bestaudio/best")
        );
    }
}
