use crate::error::GalleryError;
use serde::{Deserialize, Serialize};

/// Identifiers for the media CDN's unsigned upload endpoint.
///
/// Both fields must be present before an upload can be attempted; the media
/// client reports `ConfigurationMissing` otherwise so a misconfigured
/// deployment fails with a labeled error instead of a generic network one.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MediaConfig {
    pub cloud_name: Option<String>,
    pub upload_preset: Option<String>,
}

impl MediaConfig {
    /// Validate that both upload identifiers are set.
    /// Returns (cloud_name, upload_preset) on success.
    pub fn require(&self) -> Result<(&str, &str), GalleryError> {
        let cloud = self
            .cloud_name
            .as_deref()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| GalleryError::ConfigurationMissing("media cloud name".into()))?;
        let preset = self
            .upload_preset
            .as_deref()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| GalleryError::ConfigurationMissing("media upload preset".into()))?;
        Ok((cloud, preset))
    }
}

/// Environment-supplied configuration for the whole crate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GalleryConfig {
    /// Key of the gallery's metadata document in the remote store.
    pub gallery_id: String,
    pub media: MediaConfig,
}

impl Default for GalleryConfig {
    fn default() -> Self {
        GalleryConfig {
            gallery_id: "default".to_string(),
            media: MediaConfig::default(),
        }
    }
}

impl GalleryConfig {
    /// Assemble configuration from the environment.
    ///
    /// Unset variables leave their defaults in place; validation happens at
    /// the point of use (see [`MediaConfig::require`]), not here.
    pub fn from_env() -> Self {
        let mut config = GalleryConfig::default();
        if let Ok(id) = std::env::var("PHOTOWALL_GALLERY_ID") {
            if !id.is_empty() {
                config.gallery_id = id;
            }
        }
        config.media.cloud_name = env_opt("PHOTOWALL_MEDIA_CLOUD_NAME");
        config.media.upload_preset = env_opt("PHOTOWALL_MEDIA_UPLOAD_PRESET");
        config
    }
}

fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}
