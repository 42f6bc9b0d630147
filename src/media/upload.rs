use crate::config::MediaConfig;
use crate::error::GalleryError;
use async_trait::async_trait;
use std::time::Duration;

/// Uploads a raw image file to the CDN and returns its canonical delivery
/// URL. A seam so engine tests can substitute a stub for the network client.
#[async_trait]
pub trait MediaUploader: Send + Sync {
    async fn upload(&self, file_name: &str, bytes: Vec<u8>) -> Result<String, GalleryError>;
}

/// Unsigned-upload client for the media CDN.
///
/// The preset referenced by `upload_preset` owns resize ceilings and format
/// conversion on the CDN side; this client only ships bytes and reads back
/// the canonical URL.
#[derive(Debug)]
pub struct MediaClient {
    http: reqwest::Client,
    cloud_name: String,
    upload_preset: String,
}

impl MediaClient {
    /// Fails with `ConfigurationMissing` when the upload target identifiers
    /// are unset, so misconfiguration surfaces before any network call.
    pub fn new(config: &MediaConfig) -> Result<Self, GalleryError> {
        let (cloud_name, upload_preset) = config.require()?;
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .user_agent("Photowall/0.1")
            .build()
            .map_err(GalleryError::remote)?;
        Ok(MediaClient {
            http,
            cloud_name: cloud_name.to_string(),
            upload_preset: upload_preset.to_string(),
        })
    }

    fn upload_url(&self) -> String {
        format!(
            "https://api.cloudinary.com/v1_1/{}/image/upload",
            self.cloud_name
        )
    }
}

#[async_trait]
impl MediaUploader for MediaClient {
    async fn upload(&self, file_name: &str, bytes: Vec<u8>) -> Result<String, GalleryError> {
        let part = reqwest::multipart::Part::bytes(bytes).file_name(file_name.to_string());
        let form = reqwest::multipart::Form::new()
            .part("file", part)
            .text("upload_preset", self.upload_preset.clone());

        let response = self
            .http
            .post(self.upload_url())
            .multipart(form)
            .send()
            .await
            .map_err(GalleryError::remote)?;

        let status = response.status();
        let body: serde_json::Value = response
            .json()
            .await
            .unwrap_or(serde_json::Value::Null);

        if !status.is_success() {
            return Err(GalleryError::UploadRejected(rejection_reason(
                status.as_u16(),
                &body,
            )));
        }

        canonical_url_from_response(&body).ok_or_else(|| {
            GalleryError::RemoteUnavailable("upload response carried no delivery URL".into())
        })
    }
}

/// Prefer the remote-reported reason; fall back to the bare status code.
fn rejection_reason(status: u16, body: &serde_json::Value) -> String {
    body.get("error")
        .and_then(|e| e.get("message"))
        .and_then(|m| m.as_str())
        .map(|m| m.to_string())
        .unwrap_or_else(|| format!("media service returned status {}", status))
}

fn canonical_url_from_response(body: &serde_json::Value) -> Option<String> {
    ["secure_url", "url"]
        .iter()
        .find_map(|key| body.get(*key).and_then(|v| v.as_str()))
        .map(|s| s.to_string())
}
