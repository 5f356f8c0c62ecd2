/// Find the nearest snap point within the threshold.
/// Returns the snapped position if within threshold, otherwise the original position.
pub fn find_snap_point(position: f64, snap_points: &[f64], threshold: f64) -> f64 {
    let mut best = position;
    let mut best_dist = f64::INFINITY;

    for &point in snap_points {
        let dist = (position - point).abs();
        if dist < best_dist {
            best = point;
            best_dist = dist;
        }
    }

    if best_dist <= threshold {
        best
    } else {
        position
    }
}

/// Clamp without panicking when the bounds cross; `lo` wins.
pub fn clamp_between(value: f64, lo: f64, hi: f64) -> f64 {
    value.min(hi).max(lo)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snap_to_nearest_point() {
        let points = vec![0.0, 1.0, 5.0];
        assert_eq!(find_snap_point(1.1, &points, 0.2), 1.0);
    }

    #[test]
    fn no_snap_beyond_threshold() {
        let points = vec![0.0, 1.0, 5.0];
        assert_eq!(find_snap_point(3.0, &points, 0.2), 3.0);
    }

    #[test]
    fn neighbour_edge_within_threshold() {
        assert_eq!(find_snap_point(10.25, &[10.0], 0.3), 10.0);
        assert_eq!(find_snap_point(10.35, &[10.0], 0.3), 10.35);
    }

    #[test]
    fn empty_snap_points_returns_original() {
        assert_eq!(find_snap_point(2.0, &[], 0.5), 2.0);
    }

    #[test]
    fn snap_to_closest_of_two() {
        let points = vec![1.0, 2.0];
        assert_eq!(find_snap_point(1.4, &points, 0.6), 1.0);
        assert_eq!(find_snap_point(1.7, &points, 0.6), 2.0);
    }

    #[test]
    fn clamp_between_prefers_lower_bound() {
        assert_eq!(clamp_between(5.0, 0.0, 10.0), 5.0);
        assert_eq!(clamp_between(-1.0, 0.0, 10.0), 0.0);
        assert_eq!(clamp_between(12.0, 0.0, 10.0), 10.0);
        assert_eq!(clamp_between(5.0, 8.0, 6.0), 8.0);
    }
}
