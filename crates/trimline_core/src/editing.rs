//! Whole-list segment edits. Every function returns a fresh list and leaves
//! its input untouched, so results can go straight into `replace_all`.

use crate::error::{CoreError, Result};
use crate::types::*;

/// Next id: the creation timestamp in milliseconds, bumped past any existing id.
pub fn next_segment_id(segments: &[Segment]) -> SegmentId {
    let now = chrono::Utc::now().timestamp_millis();
    let max_existing = segments.iter().map(|s| s.id).max().unwrap_or(-1);
    now.max(max_existing + 1)
}

/// Insert `segment` keeping timeline order. Rejects overlaps and inverted ranges.
pub fn insert_segment(segments: &[Segment], segment: Segment) -> Result<Vec<Segment>> {
    if segment.start_time >= segment.end_time {
        return Err(CoreError::InvalidOperation(
            "start must be before end".into(),
        ));
    }
    if segments.iter().any(|s| s.overlaps(&segment)) {
        return Err(CoreError::OverlapDetected);
    }

    let mut out = segments.to_vec();
    out.push(segment);
    out.sort_by(timeline_order);
    Ok(out)
}

/// Remove a segment by id. Returns the new list and the removed record.
pub fn remove_segment(segments: &[Segment], id: SegmentId) -> Result<(Vec<Segment>, Segment)> {
    let pos = segments
        .iter()
        .position(|s| s.id == id)
        .ok_or(CoreError::SegmentNotFound(id))?;
    let mut out = segments.to_vec();
    let removed = out.remove(pos);
    Ok((out, removed))
}

/// Split a segment at `time` into two adjacent segments.
///
/// Both halves must be at least `min_duration` long. The left half keeps the
/// original id. Returns the new list and the (left, right) ids.
pub fn split_at(
    segments: &[Segment],
    id: SegmentId,
    time: f64,
    min_duration: f64,
) -> Result<(Vec<Segment>, SegmentId, SegmentId)> {
    let pos = segments
        .iter()
        .position(|s| s.id == id)
        .ok_or(CoreError::SegmentNotFound(id))?;
    let original = &segments[pos];

    if time - original.start_time < min_duration || original.end_time - time < min_duration {
        return Err(CoreError::InvalidOperation(format!(
            "split at {time:.3} leaves a piece shorter than {min_duration}s"
        )));
    }

    let right_id = next_segment_id(segments);
    let mut left = original.clone();
    left.end_time = time;
    let mut right = original.clone();
    right.id = right_id;
    right.name = format!("{} (2)", original.name);
    right.start_time = time;

    let mut out = segments.to_vec();
    out[pos] = left;
    out.insert(pos + 1, right);
    Ok((out, id, right_id))
}

/// Pairs of ids whose ranges overlap.
pub fn overlapping_pairs(segments: &[Segment]) -> Vec<(SegmentId, SegmentId)> {
    let sorted = sorted_refs(segments);
    let mut pairs = Vec::new();
    for (i, a) in sorted.iter().enumerate() {
        for b in &sorted[i + 1..] {
            if b.start_time >= a.end_time {
                break;
            }
            if a.overlaps(b) {
                pairs.push((a.id, b.id));
            }
        }
    }
    pairs
}

/// Normalize externally supplied segments: clamp to `[0, duration]`, sort,
/// trim each start to the previous end, drop what collapses to nothing.
/// Returns the clean list and how many records had to be changed or dropped.
pub fn clip_to_timeline(segments: &[Segment], duration: f64) -> (Vec<Segment>, usize) {
    let mut sorted: Vec<Segment> = segments.to_vec();
    sorted.sort_by(timeline_order);

    let mut out: Vec<Segment> = Vec::with_capacity(sorted.len());
    let mut adjusted = 0;
    let mut previous_end = 0.0_f64;

    for mut seg in sorted {
        let start = seg.start_time.max(0.0).max(previous_end);
        let end = seg.end_time.min(duration);
        if start != seg.start_time || end != seg.end_time {
            adjusted += 1;
        }
        if end <= start {
            continue;
        }
        seg.start_time = start;
        seg.end_time = end;
        previous_end = end;
        out.push(seg);
    }

    (out, adjusted)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Vec<Segment> {
        vec![
            Segment::new(0, "a", 0.0, 10.0),
            Segment::new(1, "b", 20.0, 30.0),
        ]
    }

    #[test]
    fn next_id_is_unique_and_monotonic() {
        let mut segments = base();
        let a = next_segment_id(&segments);
        segments.push(Segment::new(a, "x", 40.0, 41.0));
        let b = next_segment_id(&segments);
        assert!(b > a);
    }

    #[test]
    fn next_id_passes_far_future_ids() {
        let segments = vec![Segment::new(i64::MAX - 10, "x", 0.0, 1.0)];
        assert_eq!(next_segment_id(&segments), i64::MAX - 9);
    }

    #[test]
    fn insert_keeps_order() {
        let out = insert_segment(&base(), Segment::new(7, "mid", 15.0, 20.0)).unwrap();
        let ids: Vec<_> = out.iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![0, 7, 1]);
        assert!(overlapping_pairs(&out).is_empty());
    }

    #[test]
    fn insert_rejects_overlap() {
        let result = insert_segment(&base(), Segment::new(7, "bad", 5.0, 12.0));
        assert!(matches!(result.unwrap_err(), CoreError::OverlapDetected));
    }

    #[test]
    fn insert_rejects_inverted_range() {
        let result = insert_segment(&base(), Segment::new(7, "bad", 14.0, 12.0));
        assert!(matches!(result.unwrap_err(), CoreError::InvalidOperation(_)));
    }

    #[test]
    fn remove_returns_record() {
        let (out, removed) = remove_segment(&base(), 1).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(removed.id, 1);
        assert!(matches!(
            remove_segment(&base(), 42).unwrap_err(),
            CoreError::SegmentNotFound(42)
        ));
    }

    #[test]
    fn split_produces_adjacent_halves() {
        let (out, left, right) = split_at(&base(), 0, 4.0, 0.5).unwrap();
        assert_eq!(out.len(), 3);
        assert_eq!(left, 0);
        let l = out.iter().find(|s| s.id == left).unwrap();
        let r = out.iter().find(|s| s.id == right).unwrap();
        assert_eq!((l.start_time, l.end_time), (0.0, 4.0));
        assert_eq!((r.start_time, r.end_time), (4.0, 10.0));
        assert!(overlapping_pairs(&out).is_empty());
    }

    #[test]
    fn split_too_close_to_edge_fails() {
        assert!(split_at(&base(), 0, 0.2, 0.5).is_err());
        assert!(split_at(&base(), 0, 9.8, 0.5).is_err());
        assert!(split_at(&base(), 9, 5.0, 0.5).is_err());
    }

    #[test]
    fn overlapping_pairs_finds_conflicts() {
        let segments = vec![
            Segment::new(0, "a", 0.0, 10.0),
            Segment::new(1, "b", 5.0, 12.0),
            Segment::new(2, "c", 12.0, 14.0),
        ];
        assert_eq!(overlapping_pairs(&segments), vec![(0, 1)]);
    }

    #[test]
    fn clip_resolves_overlaps_and_range() {
        let segments = vec![
            Segment::new(0, "a", -1.0, 10.0),
            Segment::new(1, "b", 5.0, 12.0),
            Segment::new(2, "c", 6.0, 9.0),
            Segment::new(3, "d", 25.0, 40.0),
        ];
        let (out, adjusted) = clip_to_timeline(&segments, 30.0);
        let bounds: Vec<_> = out.iter().map(|s| (s.id, s.start_time, s.end_time)).collect();
        assert_eq!(
            bounds,
            vec![(0, 0.0, 10.0), (1, 10.0, 12.0), (3, 25.0, 30.0)]
        );
        assert_eq!(adjusted, 4);
        assert!(overlapping_pairs(&out).is_empty());
    }
}
