use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Tunables for the whole sync engine.
///
/// Every section falls back to its defaults, so a config file only needs the
/// keys it overrides.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    pub spy: SpyConfig,
    pub navigation: NavigationTimings,
    pub globe: GlobeConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpyConfig {
    /// `scroll_top` at or below this activates the first entry.
    pub top_threshold_px: f64,
    /// Remaining scrollable distance below this activates the last entry.
    pub bottom_threshold_px: f64,
    /// Fraction of the viewport cut from the top of the focus band.
    pub band_margin_top: f64,
    /// Fraction of the viewport cut from the bottom of the focus band.
    pub band_margin_bottom: f64,
    /// Visibility ratios are reported in steps of `1 / ratio_steps`.
    pub ratio_steps: u32,
}

impl Default for SpyConfig {
    fn default() -> Self {
        Self {
            top_threshold_px: 50.0,
            bottom_threshold_px: 5.0,
            band_margin_top: 0.2,
            band_margin_bottom: 0.2,
            ratio_steps: 10,
        }
    }
}

/// Navigation timeline delays. `settle_ms` and `lock_ms` are measured from the
/// moment the scroll is issued.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NavigationTimings {
    pub scroll_delay_ms: u64,
    pub settle_ms: u64,
    pub lock_ms: u64,
}

impl Default for NavigationTimings {
    fn default() -> Self {
        Self {
            scroll_delay_ms: 100,
            settle_ms: 1000,
            lock_ms: 2000,
        }
    }
}

impl NavigationTimings {
    pub fn scroll_delay(&self) -> Duration {
        Duration::from_millis(self.scroll_delay_ms)
    }

    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }

    /// Time between the settle step and the lock release.
    pub fn lock_after_settle(&self) -> Duration {
        Duration::from_millis(self.lock_ms.saturating_sub(self.settle_ms))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GlobeConfig {
    /// Camera altitude in globe radii when focused on an entry.
    pub focus_altitude: f64,
    pub animation_ms: u64,
}

impl Default for GlobeConfig {
    fn default() -> Self {
        Self {
            focus_altitude: 1.5,
            animation_ms: 1000,
        }
    }
}

impl GlobeConfig {
    pub fn animation(&self) -> Duration {
        Duration::from_millis(self.animation_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    Malformed(String),
    Invalid(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Malformed(msg) => write!(f, "config is malformed: {msg}"),
            ConfigError::Invalid(msg) => write!(f, "config is invalid: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {}

impl SyncConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: SyncConfig =
            serde_json::from_str(json).map_err(|e| ConfigError::Malformed(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let nav = &self.navigation;
        if nav.lock_ms < nav.settle_ms {
            return Err(ConfigError::Invalid(format!(
                "navigation.lock_ms ({}) must not be shorter than navigation.settle_ms ({})",
                nav.lock_ms, nav.settle_ms
            )));
        }
        let spy = &self.spy;
        for (name, margin) in [
            ("spy.band_margin_top", spy.band_margin_top),
            ("spy.band_margin_bottom", spy.band_margin_bottom),
        ] {
            if !(0.0..0.5).contains(&margin) {
                return Err(ConfigError::Invalid(format!(
                    "{name} must be in [0, 0.5), got {margin}"
                )));
            }
        }
        if spy.ratio_steps == 0 {
            return Err(ConfigError::Invalid("spy.ratio_steps must be positive".to_string()));
        }
        if spy.top_threshold_px < 0.0 || spy.bottom_threshold_px < 0.0 {
            return Err(ConfigError::Invalid("spy thresholds must not be negative".to_string()));
        }
        Ok(())
    }
}
