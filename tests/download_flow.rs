use serde_json::json;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

use wizwam::download::{
    DownloadRequest, DownloadStatus, ErrorKind, Orchestrator, Phase, ProgressEvent,
};
use wizwam::extractor::{Artifact, MediaInfo, NativeProgress, ScriptedExtractor};
use wizwam::handlers::{
    ExecutionContext, Handler, HandlerError, HandlerRegistry, Processor, RegistryError,
};

fn media_info() -> MediaInfo {
    MediaInfo {
        id: Some("abc123".to_string()),
        title: Some("Flow Test".to_string()),
        upload_date: Some("20240301".to_string()),
        height: Some(1080),
        vcodec: Some("avc1.640028".to_string()),
        acodec: Some("mp4a.40.2".to_string()),
        extractor_key: Some("Youtube".to_string()),
        ..MediaInfo::default()
    }
}

fn recorder() -> (Arc<Mutex<Vec<ProgressEvent>>>, impl Fn(ProgressEvent) + Send + Sync) {
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink_events = events.clone();
    (events, move |event: ProgressEvent| {
        sink_events.lock().unwrap().push(event)
    })
}

#[tokio::test]
async fn two_streams_report_the_slower_one() {
    let dir = TempDir::new().unwrap();
    let extractor = ScriptedExtractor::new(media_info()).with_events(vec![
        NativeProgress::downloading("Flow.f137.mp4", 40.0, 100.0),
        NativeProgress::downloading("Flow.f140.m4a", 70.0, 100.0),
        NativeProgress::downloading("Flow.f137.mp4", 90.0, 100.0),
        NativeProgress::downloading("Flow.f140.m4a", 100.0, 100.0),
        NativeProgress::downloading("Flow.f137.mp4", 100.0, 100.0),
        NativeProgress::finished("Flow.f137.mp4"),
    ]);
    let orchestrator = Orchestrator::new(Arc::new(extractor));
    let (events, sink) = recorder();

    let request = DownloadRequest::new("https://www.youtube.com/watch?v=abc123", dir.path());
    let result = orchestrator.run("job-1", &request, &sink).await;

    assert_eq!(result.status, DownloadStatus::Success);
    assert_eq!(result.title.as_deref(), Some("Flow Test"));
    let path = result.filename.unwrap();
    assert!(path.is_absolute());
    assert!(path.is_file());

    let events = events.lock().unwrap();
    let downloading: Vec<f64> = events
        .iter()
        .filter(|e| e.phase == Phase::Downloading)
        .map(|e| e.percent)
        .collect();
    // Starting 0, video alone 40, both streams 40, audio behind 70, then
    // video behind 90 until both are done
    assert_eq!(downloading, vec![0.0, 40.0, 40.0, 70.0, 90.0, 100.0]);

    let phases: Vec<Phase> = events.iter().map(|e| e.phase).collect();
    assert_eq!(
        phases[phases.len() - 3..],
        [Phase::Downloading, Phase::Processing, Phase::Completed]
    );
    let merging = &events[events.len() - 2];
    assert_eq!(merging.percent, 100.0);
    assert_eq!(merging.message, "Merging video and audio...");

    let first = events.first().unwrap();
    assert_eq!(first.phase, Phase::Initializing);
    assert_eq!(first.message, "Fetching video information...");

    let last = events.last().unwrap();
    assert_eq!(last.phase, Phase::Completed);
    assert_eq!(last.percent, 100.0);
    assert_eq!(last.message, "Download complete: 1.0 KB");
    assert!(events.iter().all(|e| e.job_id == "job-1"));
}

#[tokio::test]
async fn private_video_is_sanitized() {
    let dir = TempDir::new().unwrap();
    let raw = "ERROR: [youtube] abc123: Private video. Sign in if you've been granted access";
    let orchestrator = Orchestrator::new(Arc::new(
        ScriptedExtractor::new(media_info()).failing_metadata(raw),
    ));
    let (events, sink) = recorder();

    let request = DownloadRequest::new("https://www.youtube.com/watch?v=abc123", dir.path());
    let result = orchestrator.run("job-2", &request, &sink).await;

    assert_eq!(result.status, DownloadStatus::Error);
    assert_eq!(result.error.as_deref(), Some("Video is private"));
    assert_eq!(result.error_kind, Some(ErrorKind::Private));

    let events = events.lock().unwrap();
    let last = events.last().unwrap();
    assert_eq!(last.phase, Phase::Error);
    assert_eq!(last.message, "Video is private");
    assert!(events.iter().all(|e| !e.message.contains("Sign in")));
}

#[tokio::test]
async fn missing_artifact_fails_the_job() {
    let dir = TempDir::new().unwrap();
    let orchestrator = Orchestrator::new(Arc::new(
        ScriptedExtractor::new(media_info()).with_artifact(Artifact::Missing),
    ));
    let (_, sink) = recorder();

    let request = DownloadRequest::new("https://example.com/v", dir.path());
    let result = orchestrator.run("job-3", &request, &sink).await;

    assert_eq!(result.error.as_deref(), Some("Downloaded file not found"));
    assert_eq!(result.error_kind, Some(ErrorKind::ArtifactMissing));
}

#[test]
fn discovery_registers_valid_and_skips_malformed() {
    let plugins = TempDir::new().unwrap();
    std::fs::write(
        plugins.path().join("shout.toml"),
        "handler = \"title-capitalizer\"\nname = \"shout\"\n",
    )
    .unwrap();
    std::fs::write(
        plugins.path().join("archive.toml"),
        "handler = \"yt-dlp\"\nname = \"archive\"\n\n[options]\nquality = \"1080p\"\naudio_only = false\n",
    )
    .unwrap();
    std::fs::write(plugins.path().join("broken.toml"), "handler = [not toml").unwrap();
    std::fs::write(plugins.path().join("unknown.toml"), "handler = \"teleporter\"\n").unwrap();
    std::fs::write(plugins.path().join("_disabled.toml"), "handler = \"title-capitalizer\"\nname = \"off\"\n").unwrap();
    std::fs::write(plugins.path().join("notes.txt"), "not a manifest").unwrap();

    let mut registry = HandlerRegistry::with_defaults(Arc::new(ScriptedExtractor::new(media_info())));
    let report = registry.discover(plugins.path());

    assert_eq!(report.registered, vec!["archive".to_string(), "shout".to_string()]);
    assert_eq!(report.skipped.len(), 2);
    assert!(registry.contains("shout"));
    assert!(registry.contains("archive"));
    assert!(!registry.contains("off"));
    assert_eq!(registry.len(), 4);
}

#[test]
fn discovery_of_missing_directory_is_empty() {
    let tmp = TempDir::new().unwrap();
    let mut registry = HandlerRegistry::with_defaults(Arc::new(ScriptedExtractor::new(media_info())));
    let report = registry.discover(&tmp.path().join("nope"));
    assert!(report.registered.is_empty());
    assert!(report.skipped.is_empty());
    assert_eq!(registry.len(), 2);
}

#[tokio::test]
async fn invoking_unknown_name_is_not_found() {
    let registry = HandlerRegistry::with_defaults(Arc::new(ScriptedExtractor::new(media_info())));
    let ctx = ExecutionContext::new("job").with_value("url", "https://example.com/v");

    let err = registry.invoke("ghost", &ctx).await.unwrap_err();
    assert!(matches!(err, RegistryError::NotFound(name) if name == "ghost"));
}

struct Suffix {
    suffix: &'static str,
}

#[async_trait::async_trait]
impl Processor for Suffix {
    async fn process(
        &self,
        mut data: serde_json::Value,
        _ctx: &ExecutionContext,
    ) -> Result<serde_json::Value, HandlerError> {
        data["tag"] = json!(self.suffix);
        Ok(data)
    }
}

impl Handler for Suffix {
    fn name(&self) -> &str {
        "tagger"
    }

    fn as_processor(&self) -> Option<&dyn Processor> {
        Some(self)
    }
}

#[tokio::test]
async fn last_registration_wins() {
    let mut registry = HandlerRegistry::with_defaults(Arc::new(ScriptedExtractor::new(media_info())));
    registry.register(Arc::new(Suffix { suffix: "first" })).unwrap();
    registry.register(Arc::new(Suffix { suffix: "second" })).unwrap();

    let ctx = ExecutionContext::new("job").with_value("data", json!({"title": "x"}));
    let value = registry.invoke("tagger", &ctx).await.unwrap();
    assert_eq!(value["tag"], "second");
    assert_eq!(registry.len(), 3);
}
