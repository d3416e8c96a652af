//! Property-based tests for the sliding window using proptest.
//!
//! Covers: capacity bound, fifo eviction order, marker re-indexing,
//! marker/sample consistency, snapshot idempotence.

use gate_host::{SeriesWindow, WindowSnapshot};
use proptest::prelude::*;

fn readings() -> impl Strategy<Value = Vec<(f64, bool)>> {
    prop::collection::vec((0.0f64..5000.0, any::<bool>()), 0..400)
}

fn fill(capacity: usize, input: &[(f64, bool)]) -> SeriesWindow {
    let mut w = SeriesWindow::new(capacity).unwrap();
    for (i, &(d, m)) in input.iter().enumerate() {
        w.append(format!("t{i}"), d, m);
    }
    w
}

// ── Capacity / FIFO ──────────────────────────────────────────────────

proptest! {
    /// Length never exceeds capacity and grows as min(n, capacity).
    #[test]
    fn length_is_bounded(capacity in 1usize..64, input in readings()) {
        let mut w = SeriesWindow::new(capacity).unwrap();
        for (i, &(d, m)) in input.iter().enumerate() {
            let before = w.len();
            w.append(format!("t{i}"), d, m);
            prop_assert!(w.len() <= capacity);
            prop_assert_eq!(w.len(), (before + 1).min(capacity));
        }
    }

    /// The window always holds exactly the last `capacity` readings in order.
    #[test]
    fn window_is_tail_of_input(capacity in 1usize..64, input in readings()) {
        let w = fill(capacity, &input);
        let snap = w.snapshot();

        let start = input.len().saturating_sub(capacity);
        let expected: Vec<f64> = input[start..].iter().map(|&(d, _)| d).collect();
        let labels: Vec<String> = (start..input.len()).map(|i| format!("t{i}")).collect();
        prop_assert_eq!(snap.distances, expected);
        prop_assert_eq!(snap.labels, labels);
        prop_assert_eq!(w.evicted_count(), start as u64);
    }
}

// ── Markers ──────────────────────────────────────────────────────────

proptest! {
    /// Every surviving marker points at a sample with its own distance,
    /// and exactly the in-window motion readings have markers.
    #[test]
    fn markers_match_samples(capacity in 1usize..64, input in readings()) {
        let snap = fill(capacity, &input).snapshot();

        for m in &snap.markers {
            prop_assert!(m.index < snap.len());
            prop_assert_eq!(snap.distances[m.index], m.distance);
        }

        let start = input.len().saturating_sub(capacity);
        let expected: Vec<usize> = input[start..]
            .iter()
            .enumerate()
            .filter(|(_, r)| r.1)
            .map(|(i, _)| i)
            .collect();
        let actual: Vec<usize> = snap.markers.iter().map(|m| m.index).collect();
        prop_assert_eq!(actual, expected);
    }

    /// One eviction moves marker i to i-1 and drops the marker at 0.
    #[test]
    fn eviction_shifts_markers(capacity in 1usize..32, input in readings(), next in any::<bool>()) {
        let mut w = fill(capacity, &input);
        prop_assume!(w.len() == capacity);

        let before = w.snapshot();
        w.append("next", 1.0, next);
        let after = w.snapshot();

        let mut expected: Vec<usize> = before
            .markers
            .iter()
            .filter(|m| m.index > 0)
            .map(|m| m.index - 1)
            .collect();
        if next {
            expected.push(capacity - 1);
        }
        let actual: Vec<usize> = after.markers.iter().map(|m| m.index).collect();
        prop_assert_eq!(actual, expected);
    }

    /// snapshot() does not mutate.
    #[test]
    fn snapshot_is_idempotent(capacity in 1usize..64, input in readings()) {
        let w = fill(capacity, &input);
        let a: WindowSnapshot = w.snapshot();
        let b: WindowSnapshot = w.snapshot();
        prop_assert_eq!(a, b);
    }
}
