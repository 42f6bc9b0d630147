use crate::error::GalleryError;
use crate::gallery::model::GpsCoordinate;
use async_trait::async_trait;
use governor::{Quota, RateLimiter};
use std::time::Duration;

type DefaultDirectRateLimiter = RateLimiter<
    governor::state::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
    governor::middleware::NoOpMiddleware,
>;

/// Maps a coordinate to a best-effort human-readable place name.
/// Callers treat failures as non-fatal: the place name simply stays absent.
#[async_trait]
pub trait ReverseGeocoder: Send + Sync {
    async fn place_name(&self, coord: &GpsCoordinate) -> Result<Option<String>, GalleryError>;
}

/// Nominatim-backed reverse geocoder.
///
/// The provider expects at most one request per second; the limiter is
/// awaited before every call, so batch contexts queue up instead of
/// hammering the endpoint.
pub struct NominatimGeocoder {
    http: reqwest::Client,
    base_url: String,
    limiter: DefaultDirectRateLimiter,
}

impl NominatimGeocoder {
    pub fn new() -> Result<Self, GalleryError> {
        Self::with_base_url("https://nominatim.openstreetmap.org")
    }

    pub fn with_base_url(base_url: &str) -> Result<Self, GalleryError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .user_agent("Photowall/0.1")
            .build()
            .map_err(GalleryError::remote)?;
        let quota = Quota::with_period(Duration::from_secs(1))
            .expect("1s period is a valid quota");
        Ok(NominatimGeocoder {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            limiter: RateLimiter::direct(quota),
        })
    }
}

impl std::fmt::Debug for NominatimGeocoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NominatimGeocoder")
            .field("base_url", &self.base_url)
            .finish()
    }
}

#[async_trait]
impl ReverseGeocoder for NominatimGeocoder {
    async fn place_name(&self, coord: &GpsCoordinate) -> Result<Option<String>, GalleryError> {
        self.limiter.until_ready().await;

        let url = format!(
            "{}/reverse?format=jsonv2&lat={}&lon={}",
            self.base_url, coord.latitude, coord.longitude
        );
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(GalleryError::remote)?;
        if !response.status().is_success() {
            return Err(GalleryError::RemoteUnavailable(format!(
                "reverse geocoding returned {}",
                response.status()
            )));
        }
        let body: serde_json::Value = response.json().await.map_err(GalleryError::remote)?;
        Ok(place_from_response(&body))
    }
}

/// Assemble "<locality>, <country>" from a reverse-geocoding response.
/// Locality preference: city, town, village, municipality, county.
pub fn place_from_response(body: &serde_json::Value) -> Option<String> {
    let address = body.get("address")?;
    let locality = ["city", "town", "village", "municipality", "county"]
        .iter()
        .find_map(|key| address.get(*key).and_then(|v| v.as_str()));
    let country = address.get("country").and_then(|v| v.as_str());

    match (locality, country) {
        (Some(l), Some(c)) => Some(format!("{}, {}", l, c)),
        (Some(l), None) => Some(l.to_string()),
        (None, Some(c)) => Some(c.to_string()),
        (None, None) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_place_from_city_and_country() {
        let body = json!({
            "address": { "city": "Lisbon", "country": "Portugal" }
        });
        assert_eq!(
            place_from_response(&body),
            Some("Lisbon, Portugal".to_string())
        );
    }

    #[test]
    fn test_place_prefers_city_over_county() {
        let body = json!({
            "address": { "county": "Greater Lisbon", "city": "Lisbon", "country": "Portugal" }
        });
        assert_eq!(
            place_from_response(&body),
            Some("Lisbon, Portugal".to_string())
        );
    }

    #[test]
    fn test_place_town_fallback() {
        let body = json!({
            "address": { "town": "Sintra", "country": "Portugal" }
        });
        assert_eq!(
            place_from_response(&body),
            Some("Sintra, Portugal".to_string())
        );
    }

    #[test]
    fn test_place_country_only() {
        let body = json!({ "address": { "country": "Iceland" } });
        assert_eq!(place_from_response(&body), Some("Iceland".to_string()));
    }

    #[test]
    fn test_place_absent() {
        assert_eq!(place_from_response(&json!({})), None);
        assert_eq!(place_from_response(&json!({ "address": {} })), None);
    }
}
