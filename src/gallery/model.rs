use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Coarse aspect bucket derived once from pixel dimensions.
/// Drives layout span (landscape photos take two grid columns) and the
/// request-size ceilings in the sizing policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AspectClass {
    Landscape,
    Portrait,
    Square,
}

impl AspectClass {
    /// Tie-break rule: equal dimensions are square; unknown dimensions fall
    /// back to landscape (the widest span is the safe masonry choice).
    pub fn from_dimensions(width: Option<u32>, height: Option<u32>) -> Self {
        match (width, height) {
            (Some(w), Some(h)) if w > h => AspectClass::Landscape,
            (Some(w), Some(h)) if w < h => AspectClass::Portrait,
            (Some(_), Some(_)) => AspectClass::Square,
            _ => AspectClass::Landscape,
        }
    }

    /// Column span in the fixed-column masonry grid.
    pub fn grid_span(&self) -> usize {
        match self {
            AspectClass::Landscape => 2,
            AspectClass::Portrait | AspectClass::Square => 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GpsCoordinate {
    pub latitude: f64,
    pub longitude: f64,
}

/// One uploaded image. Persisted inside a chunk document in the remote
/// store; which chunk holds it is a storage artifact tracked separately,
/// never part of the record itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Photo {
    pub id: String,
    pub url: String,
    pub upload_date: DateTime<Utc>,
    pub title: String,
    /// Empty string means uncategorized.
    #[serde(default)]
    pub album_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub captured_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub camera_make: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub camera_model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub f_number: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exposure_time_seconds: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iso: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gps_coordinate: Option<GpsCoordinate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    pub aspect_ratio_class: AspectClass,
}

impl Photo {
    /// Best-known date: true capture timestamp when EXIF had one, upload
    /// date otherwise. All chronological derivations key on this.
    pub fn best_date(&self) -> DateTime<Utc> {
        self.captured_at.unwrap_or(self.upload_date)
    }
}

/// A named collection of photos sharing a theme.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Album {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Free-text grouping label; empty means unthemed.
    #[serde(default)]
    pub theme: String,
    pub created_at: DateTime<Utc>,
    /// Explicit override of the photo representing the album visually.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_photo_id: Option<String>,
}

/// The aggregate fetched on load and kept in memory.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GallerySnapshot {
    pub photos: Vec<Photo>,
    pub albums: Vec<Album>,
}

/// Append-only record written when a photo is deleted, so an out-of-band
/// job can clean up the orphaned media asset. Write-only, best-effort.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletionLogEntry {
    pub photo_id: String,
    pub url: String,
    pub album_id: String,
    pub deleted_at: DateTime<Utc>,
}

/// Generate a record id: unix millis plus a short random suffix.
/// Assigned client-side at creation, immutable afterwards.
pub fn generate_id() -> String {
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!("{}-{}", Utc::now().timestamp_millis(), &suffix[..8])
}

/// Coerce photos referencing a missing album back to uncategorized.
/// Returns the number of repaired references.
pub fn repair_dangling_album_refs(photos: &mut [Photo], albums: &[Album]) -> usize {
    let mut repaired = 0;
    for photo in photos.iter_mut() {
        if !photo.album_id.is_empty() && !albums.iter().any(|a| a.id == photo.album_id) {
            tracing::warn!(
                "photo {} referenced missing album {}; moved to uncategorized",
                photo.id,
                photo.album_id
            );
            photo.album_id = String::new();
            repaired += 1;
        }
    }
    repaired
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn photo(id: &str, album_id: &str) -> Photo {
        Photo {
            id: id.to_string(),
            url: format!("https://res.cloudinary.com/demo/image/upload/{}.jpg", id),
            upload_date: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            title: id.to_string(),
            album_id: album_id.to_string(),
            captured_at: None,
            camera_make: None,
            camera_model: None,
            f_number: None,
            exposure_time_seconds: None,
            iso: None,
            gps_coordinate: None,
            location_name: None,
            width: None,
            height: None,
            aspect_ratio_class: AspectClass::Landscape,
        }
    }

    fn album(id: &str) -> Album {
        Album {
            id: id.to_string(),
            name: id.to_string(),
            description: String::new(),
            theme: String::new(),
            created_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            cover_photo_id: None,
        }
    }

    #[test]
    fn test_aspect_class_from_dimensions() {
        assert_eq!(
            AspectClass::from_dimensions(Some(800), Some(600)),
            AspectClass::Landscape
        );
        assert_eq!(
            AspectClass::from_dimensions(Some(600), Some(800)),
            AspectClass::Portrait
        );
        assert_eq!(
            AspectClass::from_dimensions(Some(500), Some(500)),
            AspectClass::Square
        );
        // Unknown dimensions default to landscape
        assert_eq!(
            AspectClass::from_dimensions(None, None),
            AspectClass::Landscape
        );
        assert_eq!(
            AspectClass::from_dimensions(Some(800), None),
            AspectClass::Landscape
        );
    }

    #[test]
    fn test_best_date_prefers_capture_time() {
        let mut p = photo("p1", "");
        assert_eq!(p.best_date(), p.upload_date);
        let captured = Utc.with_ymd_and_hms(2021, 6, 15, 12, 0, 0).unwrap();
        p.captured_at = Some(captured);
        assert_eq!(p.best_date(), captured);
    }

    #[test]
    fn test_generate_id_shape_and_uniqueness() {
        let a = generate_id();
        let b = generate_id();
        assert_ne!(a, b);
        let (millis, suffix) = a.split_once('-').expect("id must contain a hyphen");
        assert!(millis.parse::<i64>().is_ok(), "prefix must be a timestamp");
        assert_eq!(suffix.len(), 8);
    }

    #[test]
    fn test_serialized_photo_has_no_nulls() {
        let p = photo("p1", "");
        let json = serde_json::to_value(&p).unwrap();
        let obj = json.as_object().unwrap();
        assert!(
            obj.values().all(|v| !v.is_null()),
            "absent optional fields must be stripped, not serialized as null"
        );
        assert!(obj.contains_key("uploadDate"), "wire names are camelCase");
        assert!(!obj.contains_key("capturedAt"));
    }

    #[test]
    fn test_repair_dangling_album_refs() {
        let albums = vec![album("a1")];
        let mut photos = vec![photo("p1", "a1"), photo("p2", "ghost"), photo("p3", "")];
        let repaired = repair_dangling_album_refs(&mut photos, &albums);
        assert_eq!(repaired, 1);
        assert_eq!(photos[0].album_id, "a1");
        assert_eq!(photos[1].album_id, "");
        assert_eq!(photos[2].album_id, "");
    }
}
