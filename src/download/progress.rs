//! Progress aggregation
//!
//! Video and audio are usually fetched as separate streams, each reporting
//! its own percentage. The aggregator folds them into one job-level figure:
//! the minimum across every stream seen so far, since the job is only as far
//! along as its slowest stream.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::sync::LazyLock;

use crate::extractor::{NativeProgress, NativeStatus};

static ANSI_ESCAPES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\x1b\[[0-9;]*m").expect("valid regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Initializing,
    Downloading,
    Processing,
    Completed,
    Error,
}

impl Phase {
    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Initializing => "initializing",
            Phase::Downloading => "downloading",
            Phase::Processing => "processing",
            Phase::Completed => "completed",
            Phase::Error => "error",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Normalized progress notification for one job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub job_id: String,
    pub phase: Phase,
    pub percent: f64,
    pub message: String,
}

impl ProgressEvent {
    pub fn new(job_id: &str, phase: Phase, percent: f64, message: impl Into<String>) -> Self {
        Self {
            job_id: job_id.to_string(),
            phase,
            percent,
            message: message.into(),
        }
    }
}

/// Receives normalized progress events.
///
/// Implemented for plain closures, so `&|event| println!("{event:?}")` works
/// anywhere a sink is expected.
pub trait ProgressSink: Send + Sync {
    fn emit(&self, event: ProgressEvent);
}

impl<F> ProgressSink for F
where
    F: Fn(ProgressEvent) + Send + Sync,
{
    fn emit(&self, event: ProgressEvent) {
        self(event)
    }
}

/// Sink that drops every event
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl ProgressSink for NullSink {
    fn emit(&self, _event: ProgressEvent) {}
}

/// Job-scoped accumulator turning native extractor events into
/// [`ProgressEvent`]s.
pub struct ProgressAggregator<'a> {
    job_id: String,
    sink: &'a dyn ProgressSink,
    streams: BTreeMap<String, f64>,
}

impl<'a> ProgressAggregator<'a> {
    pub fn new(job_id: &str, sink: &'a dyn ProgressSink) -> Self {
        Self {
            job_id: job_id.to_string(),
            sink,
            streams: BTreeMap::new(),
        }
    }

    /// Minimum recorded percent across tracked streams, 0 before any event.
    pub fn overall(&self) -> f64 {
        self.streams
            .values()
            .copied()
            .reduce(f64::min)
            .unwrap_or(0.0)
    }

    /// Folds one extractor event into the job's progress.
    ///
    /// `finished` is reported per stream, so a sequential video-then-audio
    /// transfer shows `processing 100` after the first stream and then drops
    /// back to the minimum while the second one is still downloading.
    pub fn handle(&mut self, native: NativeProgress) {
        match native.status {
            NativeStatus::Downloading => {
                let percent = resolve_percent(&native);
                self.record(stream_label(&native), percent);

                let message = format!(
                    "Speed: {}, ETA: {}",
                    display_or_unknown(native.speed_str.as_deref()),
                    display_or_unknown(native.eta_str.as_deref()),
                );
                self.emit(Phase::Downloading, self.overall(), message);
            }
            NativeStatus::Finished => {
                self.record(stream_label(&native), 100.0);
                self.emit(Phase::Processing, 100.0, "Merging video and audio...");
            }
            NativeStatus::Error => {
                let message = native
                    .error
                    .unwrap_or_else(|| "Download failed".to_string());
                self.emit(Phase::Error, 0.0, message);
            }
        }
    }

    fn record(&mut self, stream: String, percent: f64) {
        let entry = self.streams.entry(stream).or_insert(0.0);
        *entry = entry.max(percent);
    }

    fn emit(&self, phase: Phase, percent: f64, message: impl Into<String>) {
        self.sink
            .emit(ProgressEvent::new(&self.job_id, phase, percent, message));
    }
}

/// Resolves a 0-100 percentage from a native event: byte ratio, then the
/// percent string, then fragment ratio, else 0.
pub fn resolve_percent(native: &NativeProgress) -> f64 {
    let total = native
        .total_bytes
        .filter(|total| *total > 0.0)
        .or(native.total_bytes_estimate.filter(|total| *total > 0.0));

    if let (Some(downloaded), Some(total)) = (native.downloaded_bytes, total) {
        return clamp(downloaded / total * 100.0);
    }

    if let Some(percent) = native.percent_str.as_deref().and_then(parse_percent_str) {
        return clamp(percent);
    }

    if let (Some(index), Some(count)) = (native.fragment_index, native.fragment_count) {
        if count > 0.0 {
            return clamp(index / count * 100.0);
        }
    }

    0.0
}

fn parse_percent_str(raw: &str) -> Option<f64> {
    let cleaned = ANSI_ESCAPES.replace_all(raw, "");
    cleaned
        .trim()
        .trim_end_matches('%')
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|p| p.is_finite())
}

fn clamp(percent: f64) -> f64 {
    if percent.is_nan() {
        0.0
    } else {
        percent.clamp(0.0, 100.0)
    }
}

fn stream_label(native: &NativeProgress) -> String {
    native
        .filename
        .as_deref()
        .and_then(|name| Path::new(name).file_name())
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "unknown".to_string())
}

fn display_or_unknown(value: Option<&str>) -> &str {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => v,
        _ => "Unknown",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder(Mutex<Vec<ProgressEvent>>);

    impl ProgressSink for Recorder {
        fn emit(&self, event: ProgressEvent) {
            self.0.lock().unwrap().push(event);
        }
    }

    impl Recorder {
        fn percents(&self) -> Vec<(Phase, f64)> {
            self.0
                .lock()
                .unwrap()
                .iter()
                .map(|e| (e.phase, e.percent))
                .collect()
        }
    }

    #[test]
    fn overall_is_minimum_of_streams() {
        let sink = Recorder::default();
        let mut agg = ProgressAggregator::new("job", &sink);

        agg.handle(NativeProgress::downloading("v.f137.mp4", 70.0, 100.0));
        agg.handle(NativeProgress::downloading("a.f140.m4a", 40.0, 100.0));
        assert_eq!(agg.overall(), 40.0);

        agg.handle(NativeProgress::downloading("v.f137.mp4", 100.0, 100.0));
        assert_eq!(agg.overall(), 40.0);

        agg.handle(NativeProgress::downloading("a.f140.m4a", 100.0, 100.0));
        assert_eq!(agg.overall(), 100.0);

        assert_eq!(
            sink.percents(),
            vec![
                (Phase::Downloading, 70.0),
                (Phase::Downloading, 40.0),
                (Phase::Downloading, 40.0),
                (Phase::Downloading, 100.0),
            ]
        );
    }

    #[test]
    fn overall_never_decreases_within_a_stream_sequence() {
        let sink = Recorder::default();
        let mut agg = ProgressAggregator::new("job", &sink);

        let script = [
            ("v", 10.0),
            ("a", 20.0),
            ("v", 35.0),
            ("v", 30.0),
            ("a", 50.0),
            ("v", 60.0),
            ("a", 45.0),
            ("a", 90.0),
            ("v", 100.0),
        ];
        let mut previous = 0.0;
        for (stream, done) in script {
            agg.handle(NativeProgress::downloading(stream, done, 100.0));
            assert!(agg.overall() >= previous, "{stream} {done}");
            previous = agg.overall();
        }
        assert_eq!(agg.overall(), 90.0);
    }

    #[test]
    fn finished_and_error_events() {
        let sink = Recorder::default();
        let mut agg = ProgressAggregator::new("job", &sink);

        agg.handle(NativeProgress::downloading("v.mp4", 5.0, 10.0));
        agg.handle(NativeProgress::finished("v.mp4"));
        agg.handle(NativeProgress::error("HTTP Error 403"));

        let events = sink.0.lock().unwrap().clone();
        assert_eq!(events[1].phase, Phase::Processing);
        assert_eq!(events[1].percent, 100.0);
        assert_eq!(events[1].message, "Merging video and audio...");
        assert_eq!(events[2].phase, Phase::Error);
        assert_eq!(events[2].percent, 0.0);
        assert_eq!(events[2].message, "HTTP Error 403");
        assert!(events.iter().all(|e| e.job_id == "job"));
    }

    #[test]
    fn sequential_streams_drop_back_after_processing() {
        let sink = Recorder::default();
        let mut agg = ProgressAggregator::new("job", &sink);

        agg.handle(NativeProgress::downloading("v.f137.mp4", 50.0, 100.0));
        agg.handle(NativeProgress::finished("v.f137.mp4"));
        agg.handle(NativeProgress::downloading("a.f140.m4a", 30.0, 100.0));

        assert_eq!(
            sink.percents(),
            vec![
                (Phase::Downloading, 50.0),
                (Phase::Processing, 100.0),
                (Phase::Downloading, 30.0),
            ]
        );
    }

    #[test]
    fn percent_fallbacks() {
        let bytes = NativeProgress {
            downloaded_bytes: Some(25.0),
            total_bytes: None,
            total_bytes_estimate: Some(50.0),
            percent_str: Some("10%".to_string()),
            ..NativeProgress::default()
        };
        assert_eq!(resolve_percent(&bytes), 50.0);

        let zero_total = NativeProgress {
            downloaded_bytes: Some(25.0),
            total_bytes: Some(0.0),
            percent_str: Some("\u{1b}[0;94m 42.5%\u{1b}[0m".to_string()),
            ..NativeProgress::default()
        };
        assert_eq!(resolve_percent(&zero_total), 42.5);

        let fragments = NativeProgress {
            percent_str: Some("N/A".to_string()),
            fragment_index: Some(3.0),
            fragment_count: Some(12.0),
            ..NativeProgress::default()
        };
        assert_eq!(resolve_percent(&fragments), 25.0);

        assert_eq!(resolve_percent(&NativeProgress::default()), 0.0);
    }

    #[test]
    fn downloading_message_and_labels() {
        let sink = Recorder::default();
        let mut agg = ProgressAggregator::new("job", &sink);

        agg.handle(NativeProgress {
            speed_str: Some("1.2MiB/s".to_string()),
            ..NativeProgress::downloading("/tmp/dl/video.f137.mp4", 1.0, 4.0)
        });
        agg.handle(NativeProgress {
            filename: None,
            ..NativeProgress::downloading("", 3.0, 4.0)
        });

        let events = sink.0.lock().unwrap().clone();
        assert_eq!(events[0].message, "Speed: 1.2MiB/s, ETA: Unknown");
        assert!(agg.streams.contains_key("video.f137.mp4"));
        assert!(agg.streams.contains_key("unknown"));
    }

    #[test]
    fn closures_are_sinks() {
        let seen = Mutex::new(0);
        let sink = |_event: ProgressEvent| *seen.lock().unwrap() += 1;
        let mut agg = ProgressAggregator::new("job", &sink);
        agg.handle(NativeProgress::finished("x"));
        assert_eq!(*seen.lock().unwrap(), 1);
    }
}
