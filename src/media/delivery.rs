//! Delivery-URL rewriting: pure string transforms, no I/O.
//!
//! The CDN accepts width/format instructions as a path segment inserted
//! after its fixed upload-path marker. Everything else about the URL is
//! left alone, and URLs that do not belong to the media host pass through
//! unchanged.

/// Host whose URLs carry rewritable transformation segments.
const MEDIA_HOST: &str = "res.cloudinary.com";

/// Fixed upload-path marker after which a transformation segment may appear.
const UPLOAD_MARKER: &str = "/upload/";

/// Rewrite a canonical delivery URL to request a width-constrained,
/// format-negotiated variant.
///
/// Idempotent: applying the same width twice yields the same URL. A foreign
/// host, an unparseable URL, or a URL without the upload marker is returned
/// unchanged.
pub fn build_delivery_url(canonical_url: &str, target_width: u32) -> String {
    match url::Url::parse(canonical_url) {
        Ok(parsed) if parsed.host_str() == Some(MEDIA_HOST) => {}
        _ => return canonical_url.to_string(),
    }

    let Some(marker_start) = canonical_url.find(UPLOAD_MARKER) else {
        return canonical_url.to_string();
    };
    let rest_start = marker_start + UPLOAD_MARKER.len();
    let (head, rest) = canonical_url.split_at(rest_start);

    let first_segment = rest.split('/').next().unwrap_or("");
    if is_transformation_segment(first_segment) {
        let replaced = replace_width_token(first_segment, target_width);
        format!("{}{}{}", head, replaced, &rest[first_segment.len()..])
    } else {
        format!(
            "{}w_{},c_limit,q_auto,f_auto/{}",
            head, target_width, rest
        )
    }
}

/// A path segment counts as a transformation segment when one of its
/// comma-separated tokens is a width token (`w_` followed by digits).
fn is_transformation_segment(segment: &str) -> bool {
    segment.split(',').any(is_width_token)
}

fn is_width_token(token: &str) -> bool {
    token
        .strip_prefix("w_")
        .map(|n| !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit()))
        .unwrap_or(false)
}

/// Replace only the numeric width in the segment's width token; all other
/// tokens are preserved as-is.
fn replace_width_token(segment: &str, target_width: u32) -> String {
    segment
        .split(',')
        .map(|token| {
            if is_width_token(token) {
                format!("w_{}", target_width)
            } else {
                token.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join(",")
}
