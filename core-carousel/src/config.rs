//! # Carousel Configuration
//!
//! Tunables for navigation, retries and previews.
//!
//! The throttle window and the busy policy have no defaults. Hosts must
//! choose them explicitly.

use crate::ring::StreamId;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// What to do with navigation input that arrives while a transition is
/// still issuing its loads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BusyPolicy {
    /// Discard the input.
    Drop,
    /// Keep at most one pending intent; a newer one replaces it. The pending
    /// intent is applied as soon as the running transition settles.
    QueueLatest,
}

/// Input normalisation settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NavigationConfig {
    /// Minimum spacing between two accepted intents. Events inside the
    /// window collapse into the first one.
    pub throttle_window: Duration,

    pub busy_policy: BusyPolicy,

    /// A wheel gesture ends after this long without wheel events.
    ///
    /// Default: 250ms.
    #[serde(default = "default_wheel_idle_reset")]
    pub wheel_idle_reset: Duration,

    /// Vertical travel, as a fraction of the viewport height, a touch swipe
    /// needs before it counts.
    ///
    /// Default: 0.1.
    #[serde(default = "default_swipe_threshold_ratio")]
    pub swipe_threshold_ratio: f64,
}

impl NavigationConfig {
    pub fn new(throttle_window: Duration, busy_policy: BusyPolicy) -> Self {
        Self {
            throttle_window,
            busy_policy,
            wheel_idle_reset: default_wheel_idle_reset(),
            swipe_threshold_ratio: default_swipe_threshold_ratio(),
        }
    }

    pub fn with_wheel_idle_reset(mut self, reset: Duration) -> Self {
        self.wheel_idle_reset = reset;
        self
    }

    pub fn with_swipe_threshold_ratio(mut self, ratio: f64) -> Self {
        self.swipe_threshold_ratio = ratio;
        self
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if self.throttle_window > Duration::from_secs(10) {
            return Err("throttle_window must not exceed 10s".to_string());
        }

        if self.wheel_idle_reset.is_zero() {
            return Err("wheel_idle_reset must be > 0".to_string());
        }

        if !(self.swipe_threshold_ratio > 0.0 && self.swipe_threshold_ratio <= 1.0) {
            return Err("swipe_threshold_ratio must be in (0.0, 1.0]".to_string());
        }

        Ok(())
    }
}

/// Carousel-wide configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CarouselConfig {
    pub navigation: NavigationConfig,

    /// Stream to show first. Unknown ids fall back to the head of the feed.
    #[serde(default)]
    pub initial_stream: Option<StreamId>,

    /// Total load attempts per binding, including the first.
    ///
    /// Default: 2 (one automatic retry).
    #[serde(default = "default_max_load_attempts")]
    pub max_load_attempts: u8,

    /// Total attach attempts per decoder, including the first.
    ///
    /// Default: 2.
    #[serde(default = "default_max_attach_attempts")]
    pub max_attach_attempts: u8,

    /// Start with sound off, which is what browsers allow for autoplay.
    ///
    /// Default: true.
    #[serde(default = "default_start_muted")]
    pub start_muted: bool,

    /// Spacing of preview frames while the active stream loads.
    ///
    /// Default: 33ms (~30 fps).
    #[serde(default = "default_preview_frame_interval")]
    pub preview_frame_interval: Duration,
}

impl CarouselConfig {
    pub fn new(navigation: NavigationConfig) -> Self {
        Self {
            navigation,
            initial_stream: None,
            max_load_attempts: default_max_load_attempts(),
            max_attach_attempts: default_max_attach_attempts(),
            start_muted: default_start_muted(),
            preview_frame_interval: default_preview_frame_interval(),
        }
    }

    pub fn with_initial_stream(mut self, id: impl Into<StreamId>) -> Self {
        self.initial_stream = Some(id.into());
        self
    }

    pub fn with_max_load_attempts(mut self, attempts: u8) -> Self {
        self.max_load_attempts = attempts;
        self
    }

    pub fn with_start_muted(mut self, muted: bool) -> Self {
        self.start_muted = muted;
        self
    }

    pub fn with_preview_frame_interval(mut self, interval: Duration) -> Self {
        self.preview_frame_interval = interval;
        self
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), String> {
        self.navigation.validate()?;

        if self.max_load_attempts == 0 {
            return Err("max_load_attempts must be > 0".to_string());
        }

        if self.max_attach_attempts == 0 {
            return Err("max_attach_attempts must be > 0".to_string());
        }

        if self.preview_frame_interval.is_zero() {
            return Err("preview_frame_interval must be > 0".to_string());
        }

        Ok(())
    }
}

// ============================================================================
// Default Functions (for serde)
// ============================================================================

fn default_wheel_idle_reset() -> Duration {
    Duration::from_millis(250)
}

fn default_swipe_threshold_ratio() -> f64 {
    0.1
}

fn default_max_load_attempts() -> u8 {
    2
}

fn default_max_attach_attempts() -> u8 {
    2
}

fn default_start_muted() -> bool {
    true
}

fn default_preview_frame_interval() -> Duration {
    Duration::from_millis(33)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn navigation() -> NavigationConfig {
        NavigationConfig::new(Duration::from_millis(500), BusyPolicy::Drop)
    }

    #[test]
    fn test_defaults() {
        let config = CarouselConfig::new(navigation());
        assert_eq!(config.max_load_attempts, 2);
        assert!(config.start_muted);
        assert_eq!(config.navigation.wheel_idle_reset, Duration::from_millis(250));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation() {
        assert!(CarouselConfig::new(navigation())
            .with_max_load_attempts(0)
            .validate()
            .is_err());

        let bad_ratio = navigation().with_swipe_threshold_ratio(1.5);
        assert!(bad_ratio.validate().is_err());

        let too_slow = NavigationConfig::new(Duration::from_secs(30), BusyPolicy::QueueLatest);
        assert!(too_slow.validate().is_err());
    }

    #[test]
    fn test_deserialize_requires_throttle_and_policy() {
        let missing = r#"{"navigation": {"busy_policy": "drop"}}"#;
        assert!(serde_json::from_str::<CarouselConfig>(missing).is_err());

        let json = r#"{
            "navigation": {
                "throttle_window": {"secs": 0, "nanos": 800000000},
                "busy_policy": "queue_latest"
            },
            "initial_stream": "live-7"
        }"#;
        let config: CarouselConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.navigation.throttle_window, Duration::from_millis(800));
        assert_eq!(config.navigation.busy_policy, BusyPolicy::QueueLatest);
        assert_eq!(config.initial_stream, Some(StreamId::from("live-7")));
        assert_eq!(config.max_load_attempts, 2);
    }
}
