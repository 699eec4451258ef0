//! Global average-duration bounds.
//!
//! The duration window offered for graph filtering is seeded from the full,
//! unfiltered trace: every chain of both paths. It only needs recomputing when
//! the trace itself changes.

use super::stats::{collect_stats, CallStats};
use crate::domain::{ChainScope, Micros};
use chainscope_common::Trace;
use serde::Serialize;
use std::fmt;

/// Inclusive `[min, max]` bound on average durations, in µs
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DurationWindow {
    pub min: f64,
    pub max: f64,
}

/// Window used before any duration has been measured
pub const DEFAULT_DURATION_WINDOW: DurationWindow = DurationWindow { min: 0.0, max: 10_000.0 };

impl DurationWindow {
    /// Build a window from bounds as given; `min > max` contains nothing
    #[must_use]
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Window from optional bounds, missing ends left open
    #[must_use]
    pub fn bounded(min: Option<f64>, max: Option<f64>) -> Self {
        Self::new(min.unwrap_or(0.0), max.unwrap_or(f64::INFINITY))
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.min > self.max
    }

    #[must_use]
    pub fn contains(&self, avg_duration: f64) -> bool {
        avg_duration >= self.min && avg_duration <= self.max
    }

    /// Whether `other` lies entirely within this window
    #[must_use]
    pub fn encloses(&self, other: &DurationWindow) -> bool {
        other.min >= self.min && other.max <= self.max
    }

    #[must_use]
    pub fn is_point(&self) -> bool {
        self.min == self.max
    }
}

impl Default for DurationWindow {
    fn default() -> Self {
        DEFAULT_DURATION_WINDOW
    }
}

impl fmt::Display for DurationWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.max.is_infinite() {
            write!(f, "[{}, ∞)", Micros(self.min))
        } else {
            write!(f, "[{}, {}]", Micros(self.min), Micros(self.max))
        }
    }
}

/// Bounds of all strictly positive averages in a stats snapshot
///
/// Returns [`DEFAULT_DURATION_WINDOW`] when no function has a measured duration.
#[must_use]
pub fn duration_range(stats: &CallStats) -> DurationWindow {
    positive_bounds(stats.functions().map(|(_, s)| s.avg_duration()))
        .map_or(DEFAULT_DURATION_WINDOW, |(min, max)| DurationWindow { min, max })
}

/// Run the full pass over a trace and compute its bounds
#[must_use]
pub fn duration_range_of_trace(trace: &Trace) -> DurationWindow {
    duration_range(&collect_stats(trace, ChainScope::All))
}

/// Min and max of the strictly positive values, if any
pub(crate) fn positive_bounds(values: impl Iterator<Item = f64>) -> Option<(f64, f64)> {
    values.filter(|&v| v > 0.0).fold(None, |acc, v| match acc {
        None => Some((v, v)),
        Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chainscope_common::Event;

    #[test]
    fn test_empty_trace_uses_default() {
        assert_eq!(duration_range_of_trace(&Trace::default()), DEFAULT_DURATION_WINDOW);
        assert_eq!(DEFAULT_DURATION_WINDOW, DurationWindow::new(0.0, 10_000.0));
    }

    #[test]
    fn test_unmatched_calls_use_default() {
        let trace = Trace::new(vec![vec![Event::call(0.0, 1, 1)]], vec![vec![Event::ret(0.0, 2, 1)]]);
        assert_eq!(duration_range_of_trace(&trace), DEFAULT_DURATION_WINDOW);
    }

    #[test]
    fn test_range_spans_both_categories() {
        let trace = Trace::new(
            vec![vec![Event::call(0.0, 1, 1), Event::ret(0.002, 1, 1)]],
            vec![vec![Event::call(0.0, 1, 1), Event::ret(0.0005, 1, 1)]],
        );
        let range = duration_range_of_trace(&trace);
        assert!((range.min - 500.0).abs() < 1e-6);
        assert!((range.max - 2_000.0).abs() < 1e-6);
    }

    #[test]
    fn test_zero_durations_are_ignored() {
        let trace = Trace::new(
            vec![vec![
                Event::call(1.0, 1, 1),
                Event::ret(1.0, 1, 1),
                Event::call(1.0, 2, 1),
                Event::ret(1.25, 2, 1),
            ]],
            vec![],
        );
        let range = duration_range_of_trace(&trace);
        assert!(range.is_point());
        assert!((range.min - 250_000.0).abs() < 1e-6);
    }

    #[test]
    fn test_window_helpers() {
        let window = DurationWindow::new(1.0, 10.0);
        assert_eq!(window, DurationWindow { min: 1.0, max: 10.0 });
        assert!(window.contains(1.0));
        assert!(window.contains(10.0));
        assert!(!window.contains(10.5));
        assert!(window.encloses(&DurationWindow::new(2.0, 3.0)));
        assert!(!window.encloses(&DurationWindow::new(0.0, 3.0)));
        assert_eq!(window.to_string(), "[1.0μs, 10.0μs]");
    }

    #[test]
    fn test_reversed_bounds_are_kept() {
        let window = DurationWindow::new(100.0, 50.0);
        assert!(window.is_empty());
        assert!(!window.contains(50.0));
        assert!(!window.contains(75.0));
        assert!(!window.contains(100.0));
    }

    #[test]
    fn test_open_ended_windows() {
        let at_most = DurationWindow::bounded(None, Some(5.0));
        assert_eq!(at_most, DurationWindow::new(0.0, 5.0));
        assert!(at_most.contains(5.0));
        assert!(!at_most.contains(10.0));

        let at_least = DurationWindow::bounded(Some(1_000.0), None);
        assert!(at_least.contains(1e12));
        assert!(!at_least.contains(999.0));
        assert_eq!(at_least.to_string(), "[1.00ms, ∞)");
    }
}
