pub mod api;
pub mod config;
pub mod download;
pub mod extractor;
pub mod handlers;
pub mod humanize;
pub mod jobs;
pub mod observability;
