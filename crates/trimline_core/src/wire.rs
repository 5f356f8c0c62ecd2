//! JSON shapes exchanged with the media API.
//!
//! Times travel as `HH:MM:SS.mmm` strings. Loading is lenient: numbers are
//! accepted as seconds, anything unparseable becomes `0`, and the result is
//! clipped into a non-overlapping list before it reaches the store.

use crate::editing;
use crate::error::Result;
use crate::timefmt::{format_detailed_time, parse_time_or_zero};
use crate::types::*;
use serde::{Deserialize, Serialize};
use tracing::warn;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WireSegment {
    pub start_time: String,
    pub end_time: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Body of `POST /api/v1/media/{id}/trim_video`.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TrimVideoRequest {
    pub segments: Vec<WireSegment>,
    pub save_as_copy: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub save_individual_segments: Option<bool>,
}

/// Body of `POST /api/v1/media/{id}/save_trim`.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SaveTrimRequest {
    pub segments: Vec<WireSegment>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct SaveTrimResponse {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct TrimVideoResponse {
    #[serde(default)]
    pub url_redirect: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

/// A time as found in loaded data.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum WireTime {
    Seconds(f64),
    Text(String),
    #[default]
    Missing,
}

impl WireTime {
    pub fn seconds(&self) -> f64 {
        match self {
            WireTime::Seconds(v) if v.is_finite() && *v >= 0.0 => *v,
            WireTime::Seconds(_) | WireTime::Missing => 0.0,
            WireTime::Text(text) => parse_time_or_zero(text),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LoadedSegment {
    #[serde(default)]
    pub start_time: WireTime,
    #[serde(default)]
    pub end_time: WireTime,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct LoadedSegments {
    #[serde(default)]
    pub segments: Vec<LoadedSegment>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

impl LoadedSegments {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Store list to wire list, in timeline order. Cutaways never leave the core.
pub fn to_wire(segments: &[Segment]) -> Vec<WireSegment> {
    sorted_refs(segments)
        .into_iter()
        .filter(|s| !s.is_virtual())
        .map(|s| WireSegment {
            start_time: format_detailed_time(s.start_time),
            end_time: format_detailed_time(s.end_time),
            name: (!s.name.is_empty()).then(|| s.name.clone()),
        })
        .collect()
}

/// Loaded data to store records with fresh ids, clipped into `[0, duration]`
/// without overlaps. An unknown duration leaves the upper end unclipped.
pub fn from_wire(loaded: &LoadedSegments, duration: f64) -> Vec<Segment> {
    let mut segments: Vec<Segment> = Vec::with_capacity(loaded.segments.len());
    for (i, raw) in loaded.segments.iter().enumerate() {
        let id = editing::next_segment_id(&segments);
        let name = raw
            .name
            .clone()
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| format!("Segment {}", i + 1));
        segments.push(Segment::new(
            id,
            name,
            raw.start_time.seconds(),
            raw.end_time.seconds(),
        ));
    }

    let limit = if duration.is_finite() && duration > 0.0 {
        duration
    } else {
        f64::INFINITY
    };
    let (clipped, adjusted) = editing::clip_to_timeline(&segments, limit);
    if adjusted > 0 {
        warn!(
            loaded = segments.len(),
            kept = clipped.len(),
            adjusted,
            "loaded segments overlapped or fell outside the media, clipped"
        );
    }
    clipped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn to_wire_formats_times_in_order() {
        let segments = vec![
            Segment::new(2, "late", 3661.234, 3700.0),
            Segment::new(1, "", 61.5, 70.0),
            Segment::virtual_cutaway(70.0, 3661.234),
        ];
        let wire = to_wire(&segments);
        assert_eq!(wire.len(), 2);
        assert_eq!(wire[0].start_time, "00:01:01.500");
        assert_eq!(wire[0].name, None);
        assert_eq!(wire[1].start_time, "01:01:01.234");
        assert_eq!(wire[1].name.as_deref(), Some("late"));
    }

    #[test]
    fn trim_request_shape() {
        let request = TrimVideoRequest {
            segments: to_wire(&[Segment::new(1, "a", 0.0, 2.0)]),
            save_as_copy: true,
            save_individual_segments: None,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["saveAsCopy"], true);
        assert!(json.get("saveIndividualSegments").is_none());
        assert_eq!(json["segments"][0]["startTime"], "00:00:00.000");
        assert_eq!(json["segments"][0]["endTime"], "00:00:02.000");
    }

    #[test]
    fn load_parses_strings_numbers_and_garbage() {
        let loaded = LoadedSegments::from_json(
            r#"{
                "segments": [
                    {"startTime": "00:00:01.500", "endTime": "00:00:04.000", "name": "intro"},
                    {"startTime": 10, "endTime": "12.25"},
                    {"startTime": "soon", "endTime": "00:00:00.800"}
                ],
                "updated_at": "2024-05-01T10:00:00Z"
            }"#,
        )
        .unwrap();
        assert_eq!(loaded.updated_at.as_deref(), Some("2024-05-01T10:00:00Z"));

        let segments = from_wire(&loaded, 60.0);
        let bounds: Vec<(f64, f64)> = segments.iter().map(|s| (s.start_time, s.end_time)).collect();
        assert_eq!(bounds, vec![(0.0, 0.8), (1.5, 4.0), (10.0, 12.25)]);
        assert_eq!(segments[1].name, "intro");
        assert_eq!(segments[2].name, "Segment 2");
    }

    #[test]
    fn load_assigns_fresh_unique_ids() {
        let loaded = LoadedSegments {
            segments: vec![
                LoadedSegment {
                    start_time: WireTime::Seconds(0.0),
                    end_time: WireTime::Seconds(1.0),
                    name: None,
                },
                LoadedSegment {
                    start_time: WireTime::Seconds(2.0),
                    end_time: WireTime::Seconds(3.0),
                    name: None,
                },
            ],
            updated_at: None,
        };
        let segments = from_wire(&loaded, 10.0);
        assert_ne!(segments[0].id, segments[1].id);
        assert!(segments.iter().all(|s| s.id > 0));
    }

    #[test]
    fn overlapping_load_is_clipped() {
        let loaded = LoadedSegments::from_json(
            r#"{"segments": [
                {"startTime": "00:00:00.000", "endTime": "00:00:10.000"},
                {"startTime": "00:00:05.000", "endTime": "00:00:15.000"},
                {"startTime": "00:00:50.000", "endTime": "00:01:30.000"}
            ]}"#,
        )
        .unwrap();
        let segments = from_wire(&loaded, 60.0);
        let bounds: Vec<(f64, f64)> = segments.iter().map(|s| (s.start_time, s.end_time)).collect();
        assert_eq!(bounds, vec![(0.0, 10.0), (10.0, 15.0), (50.0, 60.0)]);
        assert!(editing::overlapping_pairs(&segments).is_empty());
    }

    #[test]
    fn unknown_duration_keeps_upper_bounds() {
        let loaded = LoadedSegments::from_json(
            r#"{"segments": [{"startTime": "00:00:05.000", "endTime": "00:02:00.000"}]}"#,
        )
        .unwrap();
        let segments = from_wire(&loaded, f64::NAN);
        assert_eq!(segments[0].end_time, 120.0);
    }

    #[test]
    fn response_shapes() {
        let saved: SaveTrimResponse =
            serde_json::from_str(r#"{"status":"success","updated_at":"2024-05-01T10:00:00Z"}"#).unwrap();
        assert_eq!(saved.status, "success");

        let trimmed: TrimVideoResponse = serde_json::from_str(r#"{"error":"bad range"}"#).unwrap();
        assert_eq!(trimmed.error.as_deref(), Some("bad range"));
        assert_eq!(trimmed.url_redirect, None);
    }
}
