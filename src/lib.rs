pub mod auth;
pub mod config;
pub mod error;
pub mod gallery;
pub mod media;
pub mod metadata;
pub mod sizing;
pub mod store;

pub use config::GalleryConfig;
pub use error::GalleryError;
pub use gallery::engine::GalleryEngine;

/// Install the global tracing subscriber. The embedding host calls this
/// once at startup; log verbosity follows `RUST_LOG`.
pub fn init_logging() {
    tracing_subscriber::fmt::init();
}
