//! HTTP facade for the web interface
//!
//! JSON endpoints under `/api`, plus a server-sent event stream carrying job
//! progress and outcomes. Downloads run on their own tokio task; the submit
//! endpoint only acknowledges them.

mod error;
pub mod events;
pub mod models;
mod server;
pub mod services;
pub mod state;
pub(crate) mod utils;
mod validation;

pub use error::ApiError;
pub use events::{EventBus, ServerEvent};
pub use server::{WebOptions, find_available_port, router, run};
pub use state::AppState;
