/// Failure taxonomy shared by the gateways and the gallery engine.
///
/// Gateways map transport-level failures into these variants and propagate
/// them unmodified; the engine decides per operation which are fatal.
/// `Clone` so the engine can keep the most recent failure in its state.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GalleryError {
    /// A required configuration value (store id, media cloud, preset) is unset.
    #[error("configuration missing: {0}")]
    ConfigurationMissing(String),

    /// A photo, album, or chunk referenced by id does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The document store or media service is unreachable or returned a
    /// non-success response without a structured reason.
    #[error("remote service unavailable: {0}")]
    RemoteUnavailable(String),

    /// The media service explicitly refused the asset.
    #[error("upload rejected: {0}")]
    UploadRejected(String),

    /// A caller-side precondition failed before any remote call was made.
    #[error("validation failed: {0}")]
    ValidationFailed(String),
}

impl GalleryError {
    pub fn not_found(what: impl std::fmt::Display) -> Self {
        GalleryError::NotFound(what.to_string())
    }

    pub fn remote(err: impl std::fmt::Display) -> Self {
        GalleryError::RemoteUnavailable(err.to_string())
    }
}
