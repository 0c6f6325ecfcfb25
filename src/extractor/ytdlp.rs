use async_trait::async_trait;
use std::process::{ExitStatus, Stdio};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::{debug, info};

use super::types::{FetchOptions, MediaInfo, NativeProgress};
use super::{Extractor, ExtractorError};
use crate::config::ExtractorConfig;

/// Marker put in front of each progress line so it can be told apart from
/// the rest of yt-dlp's stdout chatter.
const PROGRESS_MARKER: &str = "@@wizwam-progress ";

/// Extractor backed by the `yt-dlp` command-line program
#[derive(Debug, Clone)]
pub struct YtDlpCli {
    config: ExtractorConfig,
}

impl YtDlpCli {
    pub fn new(config: ExtractorConfig) -> Self {
        Self { config }
    }

    fn binary(&self) -> String {
        self.config.binary.display().to_string()
    }

    fn common_args(&self, options: &FetchOptions) -> Vec<String> {
        let mut args = vec!["--no-playlist".to_string(), "--no-colors".to_string()];

        if !options.verbose {
            args.push("--no-warnings".to_string());
        }
        if let Some(user_agent) = &self.config.user_agent {
            args.push("--user-agent".to_string());
            args.push(user_agent.clone());
        }
        if self.config.socket_timeout_secs > 0 {
            args.push("--socket-timeout".to_string());
            args.push(self.config.socket_timeout_secs.to_string());
        }
        if !self.config.check_certificate {
            args.push("--no-check-certificate".to_string());
        }

        args
    }

    fn metadata_args(&self, url: &str, options: &FetchOptions) -> Vec<String> {
        let mut args = self.common_args(options);
        args.push("--dump-single-json".to_string());
        args.push("--skip-download".to_string());
        args.push(url.to_string());
        args
    }

    fn media_args(&self, url: &str, options: &FetchOptions) -> Vec<String> {
        let mut args = self.common_args(options);
        args.extend([
            "--newline".to_string(),
            "--progress-template".to_string(),
            format!("download:{PROGRESS_MARKER}%(progress)j"),
        ]);

        if let Some(format) = &options.format {
            args.push("--format".to_string());
            args.push(format.clone());
        }
        if let Some(template) = &options.output_template {
            args.push("--output".to_string());
            args.push(template.display().to_string());
        }
        if let Some(container) = &options.merge_output_format {
            args.push("--merge-output-format".to_string());
            args.push(container.clone());
        }
        if let Some(codec) = &options.extract_audio {
            args.push("--extract-audio".to_string());
            args.push("--audio-format".to_string());
            args.push(codec.clone());
        }

        args.push(url.to_string());
        args
    }

    fn command(&self, args: &[String]) -> Command {
        let mut command = Command::new(&self.config.binary);
        command
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        command
    }

    fn launch_error(&self, source: std::io::Error) -> ExtractorError {
        ExtractorError::Launch {
            binary: self.binary(),
            source,
        }
    }
}

#[async_trait]
impl Extractor for YtDlpCli {
    async fn fetch_metadata(
        &self,
        url: &str,
        options: &FetchOptions,
    ) -> Result<MediaInfo, ExtractorError> {
        let args = self.metadata_args(url, options);
        debug!(binary = %self.binary(), ?args, "Fetching metadata");

        let output = self
            .command(&args)
            .output()
            .await
            .map_err(|e| self.launch_error(e))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let lines: Vec<String> = stderr.lines().map(str::to_owned).collect();
            return Err(ExtractorError::Failed(error_summary(&lines, output.status)));
        }

        serde_json::from_slice(&output.stdout)
            .map_err(|e| ExtractorError::InvalidOutput(e.to_string()))
    }

    async fn fetch_media(
        &self,
        url: &str,
        options: &FetchOptions,
        on_progress: &mut (dyn FnMut(NativeProgress) + Send),
    ) -> Result<(), ExtractorError> {
        let args = self.media_args(url, options);
        info!(binary = %self.binary(), url, "Starting transfer");
        debug!(?args, "yt-dlp arguments");

        let mut child = self.command(&args).spawn().map_err(|e| self.launch_error(e))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| ExtractorError::InvalidOutput("stdout not captured".into()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| ExtractorError::InvalidOutput("stderr not captured".into()))?;

        // Drain stderr concurrently so a chatty extractor can't block on a full pipe
        let stderr_task = tokio::spawn(async move {
            let mut collected = Vec::new();
            let mut lines = BufReader::new(stderr).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                debug!(target: "wizwam::extractor::stderr", "{line}");
                collected.push(line);
            }
            collected
        });

        let mut lines = BufReader::new(stdout).lines();
        while let Some(line) = lines.next_line().await? {
            match parse_progress_line(&line) {
                Some(progress) => on_progress(progress),
                None => debug!(target: "wizwam::extractor::stdout", "{line}"),
            }
        }

        let status = child.wait().await?;
        let stderr_lines = stderr_task.await.unwrap_or_default();

        if status.success() {
            Ok(())
        } else {
            Err(ExtractorError::Failed(error_summary(&stderr_lines, status)))
        }
    }
}

fn parse_progress_line(line: &str) -> Option<NativeProgress> {
    let payload = line.trim_start().strip_prefix(PROGRESS_MARKER)?;
    match serde_json::from_str(payload) {
        Ok(progress) => Some(progress),
        Err(e) => {
            debug!(error = %e, "Unparseable progress line");
            None
        }
    }
}

/// Picks the most useful line out of the extractor's stderr.
fn error_summary(stderr: &[String], status: ExitStatus) -> String {
    let reported = stderr
        .iter()
        .rev()
        .find_map(|line| line.trim().strip_prefix("ERROR:"))
        .map(|message| message.trim().to_string())
        .or_else(|| {
            stderr
                .iter()
                .rev()
                .map(|line| line.trim())
                .find(|line| !line.is_empty())
                .map(str::to_owned)
        });

    reported.unwrap_or_else(|| format!("yt-dlp exited with {status}"))
}
