use std::sync::Arc;

use tracing::{info, warn};

use crate::cli::{DownloadArgs, InfoArgs, WebArgs};
use wizwam::api::{self, AppState, WebOptions, models::InfoResponse};
use wizwam::config::Config;
use wizwam::download::{DownloadError, ProgressEvent, Stage};
use wizwam::extractor::{Extractor, FetchOptions, YtDlpCli};
use wizwam::handlers::HandlerRegistry;
use wizwam::jobs::{JobRunner, JobSpec, new_job_id};
use wizwam::observability::Metrics;

type AnyError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Extractor and startup registry shared by every command
fn build_registry(config: &Config) -> Result<(Arc<dyn Extractor>, HandlerRegistry), AnyError> {
    let extractor: Arc<dyn Extractor> = Arc::new(YtDlpCli::new(config.extractor.clone()));
    let registry = HandlerRegistry::from_config(config, extractor.clone())
        .map_err(|e| format!("Failed to register handlers: {e}"))?;
    info!(handlers = registry.len(), "Handler registry ready");
    Ok((extractor, registry))
}

pub async fn download(config: Config, args: DownloadArgs) -> Result<(), AnyError> {
    let (_, registry) = build_registry(&config)?;
    let prefs = config.preferences().load();
    let spec = JobSpec::new(args.url.trim(), args.options())
        .with_fallback(prefs.fallback_options())
        .with_handler(args.handler.as_str())
        .with_processors(args.processors.clone());

    let runner = JobRunner::new(Arc::new(registry), Arc::new(Metrics::new()));
    runner.check(&spec)?;

    let sink = |event: ProgressEvent| {
        println!("[{:<12}] {:>5.1}% {}", event.phase, event.percent, event.message);
    };
    let result = runner.run(&new_job_id(), &spec, Arc::new(sink)).await?;

    match (result.is_success(), &result.filename) {
        (true, Some(path)) => {
            if let Some(title) = &result.title {
                println!("Title: {title}");
            }
            println!("File:  {}", path.display());
            println!("Size:  {}", result.filesize.as_deref().unwrap_or("Unknown"));
            Ok(())
        }
        _ => Err(format!(
            "Download failed: {}",
            result.error.as_deref().unwrap_or("unknown error")
        )
        .into()),
    }
}

pub async fn info(config: Config, args: InfoArgs) -> Result<(), AnyError> {
    let extractor = YtDlpCli::new(config.extractor.clone());
    let url = args.url.trim();

    let media = extractor
        .fetch_metadata(url, &FetchOptions::default())
        .await
        .map_err(|e| {
            warn!(url, error = %e, "Metadata lookup failed");
            DownloadError::extraction(Stage::Metadata, &e.to_string())
        })?;

    println!(
        "{}",
        serde_json::to_string_pretty(&InfoResponse::from_info(url, &media))?
    );
    Ok(())
}

pub async fn web(config: Config, args: WebArgs) -> Result<(), AnyError> {
    let (extractor, registry) = build_registry(&config)?;
    let preferences = config.preferences();
    let state = AppState::new(config, registry, extractor, preferences);

    let options = WebOptions {
        host: args.host,
        port: args.port,
        open_browser: args.open_browser,
    };
    api::run(state, options).await
}

pub fn plugins(config: Config) -> Result<(), AnyError> {
    let (_, registry) = build_registry(&config)?;

    for handler in registry.list() {
        println!(
            "{:<24} {:<22} {:<8} {}",
            handler.name, handler.kind, handler.version, handler.description
        );
    }
    Ok(())
}
