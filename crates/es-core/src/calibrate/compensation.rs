//! Ambient temperature compensation.
//!
//! The temperature sensor sits close to a heat source (the board), so its raw
//! value reads high. A proxy temperature of that heat source is smoothed over
//! the last few samples and used to pull the raw value back towards ambient:
//!
//! ```text
//! compensated = raw - (mean(proxy window) - raw) / factor
//! ```

use std::collections::VecDeque;

use es_config::CompensationConfig;

/// Number of proxy samples in the moving average.
pub const SMOOTHING_WINDOW: usize = 5;

/// Proxy smoothing state and compensation parameters.
///
/// Owned by exactly one sampler; nothing here is shared.
#[derive(Debug, Clone)]
pub struct CompensationFilter {
    enabled: bool,
    factor: f64,
    fallback_proxy: f64,
    window: VecDeque<f64>,
}

impl CompensationFilter {
    /// An enabled filter. `factor` must be positive.
    pub fn new(factor: f64, fallback_proxy: f64) -> Self {
        Self {
            enabled: true,
            factor,
            fallback_proxy,
            window: VecDeque::with_capacity(SMOOTHING_WINDOW),
        }
    }

    /// A filter that passes raw temperatures through.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::new(2.25, 40.0)
        }
    }

    pub fn from_config(config: &CompensationConfig) -> Self {
        Self {
            enabled: config.enabled,
            ..Self::new(config.factor, config.fallback_proxy_celsius)
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Compensate one raw reading. A missing proxy uses the fallback value.
    pub fn compensate(&mut self, raw: f64, proxy: Option<f64>) -> f64 {
        if !self.enabled {
            return raw;
        }
        let proxy = proxy.unwrap_or(self.fallback_proxy);
        self.observe(proxy);
        let avg_proxy = self.smoothed_proxy().unwrap_or(proxy);
        raw - (avg_proxy - raw) / self.factor
    }

    /// Current moving average, once the window has been filled.
    pub fn smoothed_proxy(&self) -> Option<f64> {
        if self.window.is_empty() {
            return None;
        }
        Some(self.window.iter().sum::<f64>() / self.window.len() as f64)
    }

    fn observe(&mut self, proxy: f64) {
        if self.window.is_empty() {
            // First use: no cold-start bias towards an empty window.
            self.window.extend(std::iter::repeat(proxy).take(SMOOTHING_WINDOW));
            return;
        }
        self.window.pop_front();
        self.window.push_back(proxy);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn first_call_fills_window() {
        let mut f = CompensationFilter::new(2.25, 40.0);
        assert!(f.smoothed_proxy().is_none());
        let out = f.compensate(25.0, Some(43.0));
        assert_eq!(f.window.len(), SMOOTHING_WINDOW);
        assert!(close(f.smoothed_proxy().unwrap(), 43.0));
        assert!(close(out, 25.0 - (43.0 - 25.0) / 2.25));
    }

    #[test]
    fn constant_inputs_converge_immediately() {
        let mut f = CompensationFilter::new(2.25, 40.0);
        let expected = 24.0 - (36.0 - 24.0) / 2.25;
        for _ in 0..10 {
            assert!(close(f.compensate(24.0, Some(36.0)), expected));
            assert!(close(f.smoothed_proxy().unwrap(), 36.0));
        }
    }

    #[test]
    fn window_is_fifo_of_five() {
        let mut f = CompensationFilter::new(1.0, 40.0);
        f.compensate(20.0, Some(30.0));
        for p in [40.0, 50.0, 60.0, 70.0] {
            f.compensate(20.0, Some(p));
        }
        assert!(close(f.smoothed_proxy().unwrap(), 50.0));
        f.compensate(20.0, Some(80.0));
        // 30 evicted
        assert!(close(f.smoothed_proxy().unwrap(), 60.0));
        assert_eq!(f.window.len(), SMOOTHING_WINDOW);
    }

    #[test]
    fn missing_proxy_uses_fallback() {
        let mut f = CompensationFilter::new(2.25, 40.0);
        let out = f.compensate(31.0, None);
        assert!(close(out, 31.0 - (40.0 - 31.0) / 2.25));
    }

    #[test]
    fn disabled_passes_raw_and_keeps_window_empty() {
        let mut f = CompensationFilter::from_config(&CompensationConfig {
            enabled: false,
            ..CompensationConfig::default()
        });
        assert!(!f.is_enabled());
        assert_eq!(f.compensate(27.5, Some(50.0)), 27.5);
        assert!(f.smoothed_proxy().is_none());
        assert_eq!(CompensationFilter::disabled().compensate(1.0, None), 1.0);
    }
}
