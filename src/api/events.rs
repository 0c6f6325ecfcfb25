//! Push channel from running jobs to connected browsers
//!
//! Every job publishes into one broadcast channel; each `GET /api/events`
//! subscriber gets its own receiver and sees events from all jobs. A slow
//! subscriber that falls behind loses the oldest events instead of blocking
//! the jobs.

use std::convert::Infallible;
use std::path::Path;

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures_util::stream::{self, Stream};
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::warn;

use super::state::AppState;
use crate::download::{DownloadResult, ProgressEvent, ProgressSink};

const CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SuccessEvent {
    pub job_id: String,
    pub filename: String,
    pub filepath: String,
    pub filesize: String,
    pub title: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailureEvent {
    pub job_id: String,
    pub error: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ServerEvent {
    Progress(ProgressEvent),
    Success(SuccessEvent),
    Error(FailureEvent),
}

impl ServerEvent {
    /// Terminal event for a finished job
    pub fn from_result(job_id: &str, result: &DownloadResult) -> Self {
        match (&result.filename, result.is_success()) {
            (Some(path), true) => ServerEvent::Success(SuccessEvent {
                job_id: job_id.to_string(),
                filename: display_name(path),
                filepath: path.display().to_string(),
                filesize: result.filesize.clone().unwrap_or_default(),
                title: result.title.clone(),
            }),
            _ => ServerEvent::failure(
                job_id,
                result.error.as_deref().unwrap_or("Download failed"),
            ),
        }
    }

    pub fn failure(job_id: &str, error: impl Into<String>) -> Self {
        ServerEvent::Error(FailureEvent {
            job_id: job_id.to_string(),
            error: error.into(),
        })
    }

    pub fn name(&self) -> &'static str {
        match self {
            ServerEvent::Progress(_) => "progress",
            ServerEvent::Success(_) => "success",
            ServerEvent::Error(_) => "error",
        }
    }

    pub fn job_id(&self) -> &str {
        match self {
            ServerEvent::Progress(event) => &event.job_id,
            ServerEvent::Success(event) => &event.job_id,
            ServerEvent::Error(event) => &event.job_id,
        }
    }

    pub fn payload(&self) -> serde_json::Value {
        let encoded = match self {
            ServerEvent::Progress(event) => serde_json::to_value(event),
            ServerEvent::Success(event) => serde_json::to_value(event),
            ServerEvent::Error(event) => serde_json::to_value(event),
        };
        encoded.unwrap_or(serde_json::Value::Null)
    }

    fn to_sse(&self) -> Event {
        Event::default()
            .event(self.name())
            .data(self.payload().to_string())
    }
}

#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<ServerEvent>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { sender }
    }

    /// Events published with nobody listening are dropped.
    pub fn publish(&self, event: ServerEvent) {
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ServerEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl ProgressSink for EventBus {
    fn emit(&self, event: ProgressEvent) {
        self.publish(ServerEvent::Progress(event));
    }
}

/// Stream of every job event as it happens (GET /api/events)
pub async fn stream_events(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    Sse::new(subscription(state.events.subscribe())).keep_alive(KeepAlive::default())
}

fn subscription(
    receiver: broadcast::Receiver<ServerEvent>,
) -> impl Stream<Item = Result<Event, Infallible>> {
    stream::unfold(receiver, |mut receiver| async move {
        loop {
            match receiver.recv().await {
                Ok(event) => return Some((Ok(event.to_sse()), receiver)),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Event subscriber lagging, events dropped");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    })
}

/// Basename of a downloaded file, as shown to users
pub fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::download::{DownloadError, Phase, Stage};
    use futures_util::StreamExt;
    use std::path::PathBuf;

    #[tokio::test]
    async fn progress_reaches_subscribers() {
        let bus = EventBus::new();
        let mut receiver = bus.subscribe();

        bus.emit(ProgressEvent::new("job-1", Phase::Downloading, 40.0, "Speed: 1MiB/s, ETA: 00:10"));

        let event = receiver.recv().await.unwrap();
        assert_eq!(event.name(), "progress");
        assert_eq!(event.job_id(), "job-1");
        assert_eq!(event.payload()["percent"], 40.0);
        assert_eq!(event.payload()["phase"], "downloading");
    }

    #[test]
    fn publish_without_subscribers_is_dropped() {
        let bus = EventBus::new();
        bus.publish(ServerEvent::failure("job", "nobody listens"));
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn terminal_events_follow_the_result() {
        let ok = DownloadResult::success(
            "https://example.com/v",
            PathBuf::from("/tmp/dl/clip.mp4"),
            "2.0 KB".to_string(),
            Some("Clip".to_string()),
        );
        let event = ServerEvent::from_result("job", &ok);
        assert_eq!(event.name(), "success");
        let payload = event.payload();
        assert_eq!(payload["filename"], "clip.mp4");
        assert_eq!(payload["filepath"], "/tmp/dl/clip.mp4");
        assert_eq!(payload["filesize"], "2.0 KB");

        let failed = DownloadResult::failure(
            "https://example.com/v",
            &DownloadError::extraction(Stage::Metadata, "ERROR: Private video"),
        );
        let event = ServerEvent::from_result("job", &failed);
        assert_eq!(event.name(), "error");
        assert_eq!(event.payload()["error"], "Video is private");
    }

    #[tokio::test]
    async fn subscription_ends_when_bus_is_dropped() {
        let bus = EventBus::new();
        let receiver = bus.subscribe();
        bus.publish(ServerEvent::failure("job", "boom"));
        drop(bus);

        let events: Vec<_> = subscription(receiver).collect().await;
        assert_eq!(events.len(), 1);
    }

    #[test]
    fn display_name_is_basename() {
        assert_eq!(display_name(Path::new("/a/b/c.mp4")), "c.mp4");
        assert_eq!(display_name(Path::new("/")), "");
    }
}
