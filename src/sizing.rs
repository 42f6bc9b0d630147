//! Responsive image-request sizing policy.
//!
//! Pure functions mapping viewport geometry to a target transformation
//! width, snapped to a fixed breakpoint ladder so the CDN cache stays warm
//! across devices with near-identical screens.

use crate::gallery::model::AspectClass;

/// Ascending candidate widths a request is snapped onto.
pub const BREAKPOINT_LADDER: &[u32] = &[320, 480, 640, 768, 1024, 1280, 1600, 1920, 2400];

/// Never request below this width, whatever the viewport.
const MIN_REQUEST_WIDTH: u32 = 320;

/// Density beyond 2x buys no visible quality at gallery sizes.
const MAX_DEVICE_PIXEL_RATIO: f64 = 2.0;

/// Mobile breakpoint for the thumbnail two-tier table.
const MOBILE_VIEWPORT_WIDTH: u32 = 768;

const THUMBNAIL_WIDTH_LARGE: u32 = 400;
const THUMBNAIL_WIDTH_SMALL: u32 = 200;

/// Per-aspect request ceiling. Portrait images render narrower than the
/// viewport, so their ceiling sits lowest.
fn aspect_ceiling(aspect: AspectClass) -> u32 {
    match aspect {
        AspectClass::Landscape => 1920,
        AspectClass::Square => 1600,
        AspectClass::Portrait => 1200,
    }
}

/// Select the optimal transformation width for one image in one viewport.
///
/// Steps: clamp the density ratio, scale the viewport, snap up onto the
/// breakpoint ladder (largest rung when the target exceeds it), clamp to the
/// aspect ceiling, clamp to the floor.
pub fn optimal_width(viewport_width: u32, device_pixel_ratio: f64, aspect: AspectClass) -> u32 {
    let ratio = device_pixel_ratio.clamp(1.0, MAX_DEVICE_PIXEL_RATIO);
    let target = (viewport_width as f64 * ratio).ceil() as u32;

    let snapped = BREAKPOINT_LADDER
        .iter()
        .copied()
        .find(|&rung| rung >= target)
        .unwrap_or_else(|| *BREAKPOINT_LADDER.last().expect("ladder is non-empty"));

    snapped.min(aspect_ceiling(aspect)).max(MIN_REQUEST_WIDTH)
}

/// Thumbnail width: a two-tier table, not interpolated.
pub fn thumbnail_width(viewport_width: u32) -> u32 {
    if viewport_width < MOBILE_VIEWPORT_WIDTH {
        THUMBNAIL_WIDTH_SMALL
    } else {
        THUMBNAIL_WIDTH_LARGE
    }
}
