//! Handler system: the execution registry
//!
//! Handlers are named units of work with one or both capabilities:
//! downloading a URL or processing a data payload. The registry is built
//! once at startup and then shared read-only by the CLI and the web app.
//!
//! ## Key Components
//!
//! - [`Handler`] - Identity plus capability accessors and `execute`
//! - [`Downloader`] / [`Processor`] - The two capability traits
//! - [`HandlerCatalog`] - Handler kinds known at build time, by factory
//! - [`HandlerRegistry`] - Name-keyed registry with discovery and invocation
//! - [`ExecutionContext`] - Job id, arguments and progress sink for one call
//!
//! ## Example
//!
//! ```rust,ignore
//! use wizwam::handlers::{ExecutionContext, HandlerRegistry};
//!
//! let registry = HandlerRegistry::with_defaults(extractor);
//! let ctx = ExecutionContext::new(job_id)
//!     .with_value("url", "https://example.com/watch?v=abc")
//!     .with_value("options", serde_json::json!({"quality": "1080p"}));
//! let result = registry.invoke("yt-dlp", &ctx).await?;
//! ```

mod capitalizer;
mod catalog;
mod registry;
mod traits;
mod types;
mod ytdlp;

pub use capitalizer::TitleCapitalizer;
pub use catalog::{HandlerCatalog, HandlerFactory};
pub use registry::{DiscoveryReport, HandlerRegistry, RegistryError, SkippedManifest};
pub use traits::{Downloader, Handler, HandlerError, Processor, capability_label};
pub use types::{ExecutionContext, HandlerConfig, HandlerInfo};
pub use ytdlp::YtDlpHandler;
