pub mod exif;
pub mod geocode;

pub use exif::{extract_metadata, PhotoMetadata};
pub use geocode::{NominatimGeocoder, ReverseGeocoder};
