use crate::gallery::model::GpsCoordinate;

/// Structured record produced by metadata extraction. Extraction is a
/// non-essential step of the upload pipeline: every field is optional and
/// extraction itself never fails.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PhotoMetadata {
    pub captured_at: Option<chrono::DateTime<chrono::Utc>>,
    pub camera_make: Option<String>,
    pub camera_model: Option<String>,
    pub f_number: Option<f64>,
    pub exposure_time_seconds: Option<f64>,
    pub iso: Option<u32>,
    pub gps_coordinate: Option<GpsCoordinate>,
    /// Resolved by reverse geocoding, never by EXIF itself.
    pub location_name: Option<String>,
}

impl PhotoMetadata {
    pub fn empty() -> Self {
        PhotoMetadata::default()
    }
}

/// Extract EXIF metadata from an in-memory image file.
/// Never panics; returns an empty record on any error.
pub fn extract_metadata(bytes: &[u8]) -> PhotoMetadata {
    match std::panic::catch_unwind(|| extract_metadata_inner(bytes)) {
        Ok(data) => data,
        Err(_) => {
            tracing::warn!("panic in extract_metadata ({} bytes)", bytes.len());
            PhotoMetadata::empty()
        }
    }
}

fn extract_metadata_inner(bytes: &[u8]) -> PhotoMetadata {
    let mut cursor = std::io::Cursor::new(bytes);
    let exif_reader = exif::Reader::new();
    let exif = match exif_reader.read_from_container(&mut cursor) {
        Ok(e) => e,
        Err(e) => {
            tracing::debug!("no EXIF in upload: {}", e);
            return PhotoMetadata::empty();
        }
    };

    PhotoMetadata {
        captured_at: read_datetime_original(&exif),
        camera_make: read_ascii_tag(&exif, exif::Tag::Make),
        camera_model: read_ascii_tag(&exif, exif::Tag::Model),
        f_number: read_rational_tag(&exif, exif::Tag::FNumber),
        exposure_time_seconds: read_rational_tag(&exif, exif::Tag::ExposureTime),
        iso: read_iso(&exif),
        gps_coordinate: read_gps(&exif),
        location_name: None,
    }
}

fn read_datetime_original(exif: &exif::Exif) -> Option<chrono::DateTime<chrono::Utc>> {
    let field = exif.get_field(exif::Tag::DateTimeOriginal, exif::In::PRIMARY)?;
    let s = match &field.value {
        exif::Value::Ascii(vecs) => vecs
            .first()
            .and_then(|v| std::str::from_utf8(v).ok())?
            .to_string(),
        _ => return None,
    };
    // EXIF datetime format: "YYYY:MM:DD HH:MM:SS"
    parse_exif_datetime(&s)
}

pub fn parse_exif_datetime(s: &str) -> Option<chrono::DateTime<chrono::Utc>> {
    use chrono::{NaiveDateTime, TimeZone};
    if s.len() < 19 {
        return None;
    }
    // Replace colons in date portion for parsing: "2024:03:15 12:30:45" → "2024-03-15 12:30:45"
    let date = s[..10].replace(':', "-");
    let normalized = format!("{} {}", date, &s[11..19]);
    let ndt = NaiveDateTime::parse_from_str(&normalized, "%Y-%m-%d %H:%M:%S").ok()?;
    Some(chrono::Utc.from_utc_datetime(&ndt))
}

fn read_ascii_tag(exif: &exif::Exif, tag: exif::Tag) -> Option<String> {
    let field = exif.get_field(tag, exif::In::PRIMARY)?;
    match &field.value {
        exif::Value::Ascii(vecs) => {
            let s = vecs
                .first()
                .and_then(|v| std::str::from_utf8(v).ok())?
                .trim()
                .to_string();
            if s.is_empty() {
                None
            } else {
                Some(s)
            }
        }
        _ => None,
    }
}

fn read_rational_tag(exif: &exif::Exif, tag: exif::Tag) -> Option<f64> {
    let field = exif.get_field(tag, exif::In::PRIMARY)?;
    match &field.value {
        exif::Value::Rational(v) => {
            let r = v.first()?;
            if r.denom == 0 {
                return None;
            }
            Some(r.to_f64())
        }
        _ => None,
    }
}

fn read_iso(exif: &exif::Exif) -> Option<u32> {
    let field = exif.get_field(exif::Tag::PhotographicSensitivity, exif::In::PRIMARY)?;
    match &field.value {
        exif::Value::Short(v) => v.first().map(|&n| n as u32),
        exif::Value::Long(v) => v.first().copied(),
        _ => None,
    }
}

fn read_gps(exif: &exif::Exif) -> Option<GpsCoordinate> {
    let latitude = read_gps_axis(
        exif,
        exif::Tag::GPSLatitude,
        exif::Tag::GPSLatitudeRef,
        'S',
    )?;
    let longitude = read_gps_axis(
        exif,
        exif::Tag::GPSLongitude,
        exif::Tag::GPSLongitudeRef,
        'W',
    )?;
    Some(GpsCoordinate {
        latitude,
        longitude,
    })
}

/// Read one GPS axis: degrees/minutes/seconds rationals plus a hemisphere
/// reference letter. `negative_ref` is the hemisphere that flips the sign.
fn read_gps_axis(
    exif: &exif::Exif,
    value_tag: exif::Tag,
    ref_tag: exif::Tag,
    negative_ref: char,
) -> Option<f64> {
    let field = exif.get_field(value_tag, exif::In::PRIMARY)?;
    let dms = match &field.value {
        exif::Value::Rational(v) if v.len() >= 3 => [v[0], v[1], v[2]],
        _ => return None,
    };
    if dms.iter().any(|r| r.denom == 0) {
        return None;
    }
    let decimal = dms_to_decimal(dms[0].to_f64(), dms[1].to_f64(), dms[2].to_f64());

    let hemisphere = read_ascii_tag(exif, ref_tag)?;
    if hemisphere
        .chars()
        .next()
        .map(|c| c.eq_ignore_ascii_case(&negative_ref))
        .unwrap_or(false)
    {
        Some(-decimal)
    } else {
        Some(decimal)
    }
}

pub fn dms_to_decimal(degrees: f64, minutes: f64, seconds: f64) -> f64 {
    degrees + minutes / 60.0 + seconds / 3600.0
}
