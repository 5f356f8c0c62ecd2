use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use trimline_core::{Segment, SegmentId};

pub const THUMB_WIDTH: u32 = 160;
pub const THUMB_HEIGHT: u32 = 90;

const PALETTE: [&str; 8] = [
    "#4f46e5", "#0891b2", "#059669", "#ca8a04", "#dc2626", "#db2777", "#7c3aed", "#475569",
];

/// A flat-colour SVG placeholder as a `data:` URI.
pub fn solid_color_thumbnail(color: &str, width: u32, height: u32) -> String {
    let svg = format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{width}" height="{height}"><rect width="100%" height="100%" fill="{color}"/></svg>"#
    );
    format!("data:image/svg+xml;base64,{}", STANDARD.encode(svg))
}

/// Stable palette colour for a segment id.
pub fn segment_color(id: SegmentId) -> &'static str {
    PALETTE[id.rem_euclid(PALETTE.len() as i64) as usize]
}

/// Copy of `segments` where every empty thumbnail gets a placeholder.
pub fn with_placeholders(segments: &[Segment]) -> Vec<Segment> {
    segments
        .iter()
        .map(|s| {
            let mut s = s.clone();
            if s.thumbnail.is_empty() {
                s.thumbnail = solid_color_thumbnail(segment_color(s.id), THUMB_WIDTH, THUMB_HEIGHT);
            }
            s
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_uri_decodes_to_svg() {
        let uri = solid_color_thumbnail("#ff0000", 16, 9);
        let payload = uri.strip_prefix("data:image/svg+xml;base64,").unwrap();
        let svg = String::from_utf8(STANDARD.decode(payload).unwrap()).unwrap();
        assert!(svg.contains(r##"fill="#ff0000""##));
        assert!(svg.contains(r#"width="16""#));
    }

    #[test]
    fn colours_are_stable_for_negative_ids() {
        assert_eq!(segment_color(3), segment_color(3 + PALETTE.len() as i64));
        assert!(PALETTE.contains(&segment_color(-999)));
    }

    #[test]
    fn existing_thumbnails_are_kept() {
        let mut kept = Segment::new(1, "a", 0.0, 1.0);
        kept.thumbnail = "data:image/jpeg;base64,AAAA".into();
        let blank = Segment::new(2, "b", 1.0, 2.0);

        let out = with_placeholders(&[kept.clone(), blank]);
        assert_eq!(out[0].thumbnail, kept.thumbnail);
        assert!(out[1].thumbnail.starts_with("data:image/svg+xml;base64,"));
    }
}
