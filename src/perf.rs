//! Frame Metrics
//!
//! Rolling windows of named samples (frame time, poll latency) with mean
//! readback. Kept deliberately small; anything heavier belongs in an
//! external profiler.

use std::collections::{BTreeMap, HashMap, VecDeque};

use tracing::debug;

/// Samples retained per metric.
const MAX_SAMPLES: usize = 60;

/// Rolling per-name sample windows.
#[derive(Default)]
pub struct FrameMetrics {
    samples: HashMap<String, VecDeque<f64>>,
}

impl FrameMetrics {
    /// Create an empty collector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one sample, evicting the oldest beyond the window.
    pub fn record(&mut self, name: &str, value: f64) {
        let window = self.samples.entry(name.to_string()).or_default();
        window.push_back(value);
        while window.len() > MAX_SAMPLES {
            window.pop_front();
        }
    }

    /// Mean of the retained samples for a metric, or 0 when unseen.
    pub fn mean(&self, name: &str) -> f64 {
        match self.samples.get(name) {
            Some(window) if !window.is_empty() => {
                window.iter().sum::<f64>() / window.len() as f64
            }
            _ => 0.0,
        }
    }

    /// Means of every tracked metric, sorted by name.
    pub fn all(&self) -> BTreeMap<String, f64> {
        self.samples
            .keys()
            .map(|name| (name.clone(), self.mean(name)))
            .collect()
    }

    /// Log every metric mean at debug level.
    pub fn log(&self) {
        for (name, mean) in self.all() {
            debug!(metric = %name, mean, "frame metric");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean_over_window() {
        let mut metrics = FrameMetrics::new();
        metrics.record("frame_ms", 10.0);
        metrics.record("frame_ms", 20.0);

        assert!((metrics.mean("frame_ms") - 15.0).abs() < 1e-9);
        assert_eq!(metrics.mean("unseen"), 0.0);
    }

    #[test]
    fn test_window_is_bounded() {
        let mut metrics = FrameMetrics::new();
        for i in 0..(MAX_SAMPLES + 40) {
            metrics.record("frame_ms", i as f64);
        }

        // Only the trailing MAX_SAMPLES samples survive.
        let expected_first = 40.0;
        let expected_mean =
            (expected_first + (MAX_SAMPLES + 39) as f64) / 2.0;
        assert!((metrics.mean("frame_ms") - expected_mean).abs() < 1e-9);
    }
}
