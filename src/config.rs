use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::TraceError;

/// Upper bound accepted for [`TraceConfig::equal_light`].
pub const EQUAL_LIGHT_MAX: f64 = 1.9;

/// Largest supported number of sweep candidates.
pub const MAX_CANDIDATES: u32 = 255;

/// All tracing parameters in one struct.
///
/// Built once per invocation (from defaults, a JSON preset or CLI flags)
/// and then only read. Serializable so presets can be saved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TraceConfig {
    // -- Image preparation --
    /// Trace bright lines on a dark background.
    pub invert: bool,
    /// Restrict tracing to a clip rectangle supplied alongside the image.
    pub clip: bool,
    /// Downscale images larger than this many megapixels.
    pub megapixels: f64,
    /// Despeckle median window in pixels. 0 = off, even sizes are bumped to odd.
    pub median_size: u32,
    /// ROF total-variation weight. 0 = off.
    pub denoise_weight: f64,
    /// Illumination equalization strength in `[0, EQUAL_LIGHT_MAX]`. 0 = off.
    pub equal_light: f64,

    // -- Threshold sweep --
    /// Number of thresholds to try (1-255). More is slower.
    pub candidates: u32,

    // -- External tracer --
    /// Tracer program name or path.
    pub tracer_program: String,
    /// Curve fitting error threshold passed to the tracer.
    pub error_threshold: f64,
    /// Smoothing iterations passed to the tracer.
    pub filter_iterations: u32,
    /// Per-invocation timeout in seconds. 0 = wait forever.
    pub tracer_timeout_secs: u64,

    // -- Output --
    /// Use `hairline_width` instead of the estimated stroke width.
    pub hairline: bool,
    /// Fixed stroke width in document units, used when `hairline` is set.
    pub hairline_width: f64,
    /// Ask the document layer to remove the source image after tracing.
    pub replace_original: bool,
}

impl Default for TraceConfig {
    fn default() -> Self {
        Self {
            invert: false,
            clip: false,
            megapixels: 2.0,
            median_size: 0,
            denoise_weight: 0.0,
            equal_light: 0.0,
            candidates: 15,
            tracer_program: "autotrace".to_string(),
            error_threshold: 2.0,
            filter_iterations: 4,
            tracer_timeout_secs: 60,
            hairline: false,
            hairline_width: 0.1,
            replace_original: false,
        }
    }
}

impl TraceConfig {
    /// Load a JSON preset. Missing fields take their default values.
    pub fn from_json_file(path: &Path) -> Result<Self, TraceError> {
        let text = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Check that every parameter is within its accepted range.
    pub fn validate(&self) -> Result<(), TraceError> {
        if !(1..=MAX_CANDIDATES).contains(&self.candidates) {
            return Err(invalid(format!(
                "candidates must be in 1..={}, got {}",
                MAX_CANDIDATES, self.candidates
            )));
        }
        if !(self.megapixels.is_finite() && self.megapixels > 0.0) {
            return Err(invalid(format!("megapixels must be positive, got {}", self.megapixels)));
        }
        if !(0.0..=EQUAL_LIGHT_MAX).contains(&self.equal_light) {
            return Err(invalid(format!(
                "equal_light must be in 0..={}, got {}",
                EQUAL_LIGHT_MAX, self.equal_light
            )));
        }
        if !(self.denoise_weight.is_finite() && self.denoise_weight >= 0.0) {
            return Err(invalid(format!(
                "denoise_weight must be non-negative, got {}",
                self.denoise_weight
            )));
        }
        if !(self.error_threshold.is_finite() && self.error_threshold > 0.0) {
            return Err(invalid(format!(
                "error_threshold must be positive, got {}",
                self.error_threshold
            )));
        }
        if self.hairline && !(self.hairline_width.is_finite() && self.hairline_width > 0.0) {
            return Err(invalid(format!(
                "hairline_width must be positive, got {}",
                self.hairline_width
            )));
        }
        if self.tracer_program.trim().is_empty() {
            return Err(invalid("tracer_program is empty".to_string()));
        }
        Ok(())
    }

    /// Odd median window actually applied, or `None` when despeckling is off.
    pub fn median_window(&self) -> Option<u32> {
        match self.median_size {
            0 => None,
            n if n % 2 == 0 => Some(n + 1),
            n => Some(n),
        }
    }

    pub fn tracer_timeout(&self) -> Option<Duration> {
        (self.tracer_timeout_secs > 0).then(|| Duration::from_secs(self.tracer_timeout_secs))
    }
}

fn invalid(msg: String) -> TraceError {
    TraceError::InvalidConfig(msg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        TraceConfig::default().validate().unwrap();
    }

    #[test]
    fn candidate_count_out_of_range_is_rejected() {
        for candidates in [0, 256] {
            let config = TraceConfig { candidates, ..TraceConfig::default() };
            assert!(matches!(config.validate(), Err(TraceError::InvalidConfig(_))));
        }
    }

    #[test]
    fn equal_light_above_one_is_accepted() {
        let config = TraceConfig { equal_light: 1.5, ..TraceConfig::default() };
        config.validate().unwrap();
        let config = TraceConfig { equal_light: 2.5, ..TraceConfig::default() };
        assert!(config.validate().is_err());
    }

    #[test]
    fn median_window_is_forced_odd() {
        let window = |median_size| TraceConfig { median_size, ..TraceConfig::default() }.median_window();
        assert_eq!(window(0), None);
        assert_eq!(window(3), Some(3));
        assert_eq!(window(4), Some(5));
    }

    #[test]
    fn preset_fills_missing_fields_with_defaults() {
        let config: TraceConfig = serde_json::from_str(r#"{"invert": true, "candidates": 31}"#).unwrap();
        assert!(config.invert);
        assert_eq!(config.candidates, 31);
        assert_eq!(config.megapixels, 2.0);
        assert_eq!(config.tracer_program, "autotrace");
    }

    #[test]
    fn zero_timeout_means_no_timeout() {
        let config = TraceConfig { tracer_timeout_secs: 0, ..TraceConfig::default() };
        assert_eq!(config.tracer_timeout(), None);
        assert_eq!(TraceConfig::default().tracer_timeout(), Some(Duration::from_secs(60)));
    }
}
