use crate::config::EditorConfig;
use crate::types::*;

/// Classifies timeline positions as "inside segment X" or "inside a gap".
///
/// Pure: the same segments and position always give the same answer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundaryResolver {
    pub edge_tolerance: f64,
    pub min_gap_space: f64,
    pub min_gap_for_new_segment: f64,
}

impl BoundaryResolver {
    pub fn from_config(config: &EditorConfig) -> Self {
        Self {
            edge_tolerance: config.edge_tolerance,
            min_gap_space: config.min_gap_space,
            min_gap_for_new_segment: config.min_gap_for_new_segment,
        }
    }

    /// Exact boundaries resolve to the segment. Among several matches the
    /// earliest in timeline order wins.
    pub fn classify(&self, position: f64, segments: &[Segment], duration: f64) -> Classification {
        if let Some(segment) = self.segment_at(position, segments) {
            return Classification::Segment(segment.clone());
        }

        let space = match self.next_segment_after(position, segments) {
            Some(next) => next.start_time - position,
            None => duration - position,
        };
        Classification::Gap {
            available_space: space.max(self.min_gap_space),
        }
    }

    pub fn segment_at<'a>(&self, position: f64, segments: &'a [Segment]) -> Option<&'a Segment> {
        sorted_refs(segments)
            .into_iter()
            .find(|s| s.contains(position, self.edge_tolerance))
    }

    /// First segment starting strictly after `position`.
    pub fn next_segment_after<'a>(&self, position: f64, segments: &'a [Segment]) -> Option<&'a Segment> {
        sorted_refs(segments)
            .into_iter()
            .find(|s| s.start_time > position)
    }

    /// Last segment ending at or before `position`.
    pub fn previous_segment_before<'a>(
        &self,
        position: f64,
        segments: &'a [Segment],
    ) -> Option<&'a Segment> {
        segments
            .iter()
            .filter(|s| s.end_time <= position)
            .max_by(|a, b| a.end_time.total_cmp(&b.end_time).then_with(|| a.id.cmp(&b.id)))
    }

    /// Extent of the gap around `position`: previous segment end (or 0) to
    /// next segment start (or `duration`).
    pub fn gap_bounds(&self, position: f64, segments: &[Segment], duration: f64) -> (f64, f64) {
        let start = self
            .previous_segment_before(position, segments)
            .map(|s| s.end_time)
            .unwrap_or(0.0);
        let end = self
            .next_segment_after(position, segments)
            .map(|s| s.start_time)
            .unwrap_or(duration);
        (start, end)
    }

    /// Whether a gap of this size may host a new segment.
    pub fn is_useful_gap(&self, available_space: f64) -> bool {
        available_space >= self.min_gap_for_new_segment
    }
}

impl Default for BoundaryResolver {
    fn default() -> Self {
        Self::from_config(&EditorConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scenario() -> Vec<Segment> {
        vec![
            Segment::new(0, "first", 0.0, 10.0),
            Segment::new(1, "second", 20.0, 30.0),
        ]
    }

    #[test]
    fn gap_reports_space_to_next_segment() {
        let resolver = BoundaryResolver::default();
        let class = resolver.classify(15.0, &scenario(), 30.0);
        assert_eq!(class, Classification::Gap { available_space: 5.0 });
    }

    #[test]
    fn gap_after_last_segment_uses_duration() {
        let resolver = BoundaryResolver::default();
        let segments = vec![Segment::new(0, "a", 0.0, 10.0)];
        let class = resolver.classify(12.0, &segments, 30.0);
        assert_eq!(class, Classification::Gap { available_space: 18.0 });
    }

    #[test]
    fn gap_space_is_floored() {
        let resolver = BoundaryResolver::default();
        let class = resolver.classify(19.95, &scenario(), 30.0);
        match class {
            Classification::Gap { available_space } => {
                assert!((available_space - 0.1).abs() < 1e-9);
                assert!(!resolver.is_useful_gap(available_space));
            }
            other => panic!("expected gap, got {other:?}"),
        }
    }

    #[test]
    fn exact_and_drifted_boundaries_resolve_to_segment() {
        let resolver = BoundaryResolver::default();
        let segments = scenario();
        assert_eq!(resolver.classify(10.0, &segments, 30.0).segment_id(), Some(0));
        assert_eq!(resolver.classify(10.0009, &segments, 30.0).segment_id(), Some(0));
        assert_eq!(resolver.classify(19.9995, &segments, 30.0).segment_id(), Some(1));
        assert!(resolver.classify(10.01, &segments, 30.0).is_gap());
    }

    #[test]
    fn shared_boundary_resolves_to_earlier_segment() {
        let resolver = BoundaryResolver::default();
        let segments = vec![
            Segment::new(5, "b", 10.0, 20.0),
            Segment::new(4, "a", 0.0, 10.0),
        ];
        assert_eq!(resolver.classify(10.0, &segments, 20.0).segment_id(), Some(4));
    }

    #[test]
    fn classification_is_total_exclusive_and_idempotent() {
        let resolver = BoundaryResolver::default();
        let segments = vec![
            Segment::new(0, "a", 1.0, 4.5),
            Segment::new(1, "b", 4.5, 7.25),
            Segment::new(2, "c", 11.0, 12.0),
            Segment::new(3, "d", 18.3, 20.0),
        ];
        let duration = 20.0;
        let mut t = 0.0;
        while t <= duration {
            let first = resolver.classify(t, &segments, duration);
            let second = resolver.classify(t, &segments, duration);
            assert_eq!(first, second);
            match &first {
                Classification::Segment(s) => assert!(s.contains(t, resolver.edge_tolerance)),
                Classification::Gap { available_space } => {
                    assert!(*available_space >= resolver.min_gap_space);
                    assert!(segments.iter().all(|s| !s.contains(t, resolver.edge_tolerance)));
                }
            }
            t += 0.05;
        }
    }

    #[test]
    fn gap_bounds_and_neighbours() {
        let resolver = BoundaryResolver::default();
        let segments = scenario();
        assert_eq!(resolver.gap_bounds(15.0, &segments, 30.0), (10.0, 20.0));
        assert_eq!(resolver.next_segment_after(15.0, &segments).unwrap().id, 1);
        assert_eq!(resolver.previous_segment_before(15.0, &segments).unwrap().id, 0);
        assert!(resolver.next_segment_after(25.0, &segments).is_none());
    }
}
