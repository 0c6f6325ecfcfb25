//! Running one download job through the registry
//!
//! A job is a downloader handler invocation, optionally followed by a chain
//! of processor handlers applied to the successful result. Jobs are not
//! queued: each caller runs its job directly, and the web front end spawns
//! one task per request.

use serde_json::Value;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::download::{DownloadOptions, DownloadResult, ProgressSink};
use crate::handlers::{ExecutionContext, HandlerError, HandlerRegistry, RegistryError};
use crate::observability::Metrics;

pub const DEFAULT_HANDLER: &str = "yt-dlp";

/// What to run
///
/// `options` are what the caller asked for; `fallback` fills whatever the
/// request and the handler's own defaults leave open.
#[derive(Debug, Clone, PartialEq)]
pub struct JobSpec {
    pub url: String,
    pub options: DownloadOptions,
    pub fallback: DownloadOptions,
    pub handler: String,
    pub processors: Vec<String>,
}

impl JobSpec {
    pub fn new(url: impl Into<String>, options: DownloadOptions) -> Self {
        Self {
            url: url.into(),
            options,
            fallback: DownloadOptions::default(),
            handler: DEFAULT_HANDLER.to_string(),
            processors: Vec::new(),
        }
    }

    pub fn with_handler(mut self, handler: impl Into<String>) -> Self {
        self.handler = handler.into();
        self
    }

    pub fn with_fallback(mut self, fallback: DownloadOptions) -> Self {
        self.fallback = fallback;
        self
    }

    pub fn with_processors(mut self, processors: Vec<String>) -> Self {
        self.processors = processors;
        self
    }
}

pub fn new_job_id() -> String {
    Uuid::new_v4().to_string()
}

#[derive(Clone)]
pub struct JobRunner {
    registry: Arc<HandlerRegistry>,
    metrics: Arc<Metrics>,
}

impl JobRunner {
    pub fn new(registry: Arc<HandlerRegistry>, metrics: Arc<Metrics>) -> Self {
        Self { registry, metrics }
    }

    pub fn registry(&self) -> &HandlerRegistry {
        &self.registry
    }

    /// Verifies every handler a job names exists and has the capability it
    /// is used for, so a bad request can be refused before it starts.
    pub fn check(&self, spec: &JobSpec) -> Result<(), RegistryError> {
        let downloader = self
            .registry
            .lookup(&spec.handler)
            .ok_or_else(|| RegistryError::NotFound(spec.handler.clone()))?;
        if downloader.as_downloader().is_none() {
            return Err(HandlerError::InvalidHandler(format!(
                "'{}' cannot download",
                spec.handler
            ))
            .into());
        }

        for name in &spec.processors {
            let processor = self
                .registry
                .lookup(name)
                .ok_or_else(|| RegistryError::NotFound(name.clone()))?;
            if processor.as_processor().is_none() {
                return Err(HandlerError::InvalidHandler(format!("'{name}' cannot process")).into());
            }
        }

        Ok(())
    }

    /// Runs the job to completion. A failed download is an `Ok` result with
    /// error status; `Err` means the registry could not run the job at all.
    pub async fn run(
        &self,
        job_id: &str,
        spec: &JobSpec,
        sink: Arc<dyn ProgressSink>,
    ) -> Result<DownloadResult, RegistryError> {
        self.metrics.job_started();
        info!(job_id, handler = %spec.handler, url = %spec.url, "Job started");

        let outcome = self.execute(job_id, spec, sink).await;

        match &outcome {
            Ok(result) if result.is_success() => self.metrics.job_succeeded(),
            Ok(_) => self.metrics.job_failed(),
            Err(e) => {
                warn!(job_id, error = %e, "Job could not run");
                self.metrics.job_failed();
            }
        }

        outcome
    }

    async fn execute(
        &self,
        job_id: &str,
        spec: &JobSpec,
        sink: Arc<dyn ProgressSink>,
    ) -> Result<DownloadResult, RegistryError> {
        let encode = |options: &DownloadOptions| {
            serde_json::to_value(options).map_err(|e| HandlerError::Execution(e.to_string()))
        };
        let ctx = ExecutionContext::new(job_id)
            .with_value("url", spec.url.as_str())
            .with_value("options", encode(&spec.options)?)
            .with_value("fallback", encode(&spec.fallback)?)
            .with_progress(sink);

        let mut value = self.registry.invoke(&spec.handler, &ctx).await?;

        if is_success(&value) {
            for name in &spec.processors {
                let ctx = ExecutionContext::new(job_id).with_value("data", value.clone());
                match self.registry.invoke(name, &ctx).await {
                    Ok(processed) => value = processed,
                    // The file is already on disk; keep the unprocessed record
                    Err(e) => warn!(job_id, processor = %name, error = %e, "Processor failed"),
                }
            }
        }

        serde_json::from_value(value).map_err(|e| {
            HandlerError::Execution(format!("malformed download result: {e}")).into()
        })
    }
}

fn is_success(value: &Value) -> bool {
    value.get("status").and_then(Value::as_str) == Some("success")
}
