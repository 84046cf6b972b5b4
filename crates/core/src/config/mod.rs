use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{Result, VisualiserError};

/// Past this the outline is visually a circle and only costs vertices.
pub const MAX_POLYGON_SIDES: u32 = 256;
pub const MAX_INNER_TRIANGLES: u32 = 64;

/// Top-level configuration structure for the visualiser.
///
/// Every field has a default matching the stock look of the prism, so a
/// config file only needs to name the values it wants to change.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VisualiserConfig {
    pub timing: TimingConfig,
    pub trail: TrailConfig,
    pub prism: PrismConfig,
    pub inner: InnerPatternConfig,
    pub rotation: RotationConfig,
    pub spectrum: SpectrumConfig,
}

impl VisualiserConfig {
    /// Parses a JSON document and validates the result.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and validates a JSON configuration file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Checks that every parameter keeps the per-frame math finite.
    pub fn validate(&self) -> Result<()> {
        let fps = self.timing.target_fps;
        if !fps.is_finite() || fps <= 0.0 {
            return Err(VisualiserError::config(format!(
                "target_fps must be a positive number, got {fps}"
            )));
        }

        let alpha = self.trail.alpha;
        if !(0.0..=1.0).contains(&alpha) {
            return Err(VisualiserError::config(format!(
                "trail alpha must lie in [0, 1], got {alpha}"
            )));
        }

        if !(3..=MAX_POLYGON_SIDES).contains(&self.prism.sides) {
            return Err(VisualiserError::config(format!(
                "polygon sides must lie in 3..={MAX_POLYGON_SIDES}, got {}",
                self.prism.sides
            )));
        }

        if !(1..=MAX_INNER_TRIANGLES).contains(&self.inner.triangles) {
            return Err(VisualiserError::config(format!(
                "inner triangles must lie in 1..={MAX_INNER_TRIANGLES}, got {}",
                self.inner.triangles
            )));
        }

        let non_negative = [
            ("prism.base_size_factor", self.prism.base_size_factor),
            ("prism.radius_floor", self.prism.radius_floor),
            ("prism.bass_gain", self.prism.bass_gain),
            ("prism.stroke_width", self.prism.stroke_width),
            ("inner.size_factor", self.inner.size_factor),
            ("inner.mid_gain", self.inner.mid_gain),
            ("inner.stroke_width", self.inner.stroke_width),
            ("inner.glow_base", self.inner.glow_base),
            ("rotation.mid_gain", self.rotation.mid_gain),
        ];
        for (name, value) in non_negative {
            if !value.is_finite() || value < 0.0 {
                return Err(VisualiserError::config(format!(
                    "{name} must be finite and non-negative, got {value}"
                )));
            }
        }

        let finite = [
            ("inner.shimmer_rate", self.inner.shimmer_rate),
            ("inner.shimmer_depth", self.inner.shimmer_depth),
            ("inner.shimmer_base", self.inner.shimmer_base),
            ("inner.glow_rate", self.inner.glow_rate),
            ("inner.glow_depth", self.inner.glow_depth),
            ("rotation.initial", self.rotation.initial),
        ];
        for (name, value) in finite {
            if !value.is_finite() {
                return Err(VisualiserError::config(format!("{name} must be finite")));
            }
        }

        self.spectrum.validate()
    }
}

/// Frame pacing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    pub target_fps: f64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self { target_fps: 60.0 }
    }
}

/// Translucent black overlay painted before every frame. Lower alpha keeps
/// longer trails.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrailConfig {
    pub alpha: f64,
}

impl Default for TrailConfig {
    fn default() -> Self {
        Self { alpha: 0.1 }
    }
}

/// Outer polygon parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrismConfig {
    pub sides: u32,
    /// Fraction of the shorter surface edge used as the base size.
    pub base_size_factor: f64,
    /// Radius multiplier with no bass energy.
    pub radius_floor: f64,
    /// Radius multiplier added per unit of bass.
    pub bass_gain: f64,
    pub stroke_width: f64,
}

impl Default for PrismConfig {
    fn default() -> Self {
        Self {
            sides: 3,
            base_size_factor: 0.085,
            radius_floor: 0.00445,
            bass_gain: 0.018,
            stroke_width: 9.0,
        }
    }
}

/// Inner triangle pattern, including the clock-driven shimmer and glow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InnerPatternConfig {
    pub triangles: u32,
    /// Inner size relative to the outer base size.
    pub size_factor: f64,
    /// Scale added per unit of mid energy.
    pub mid_gain: f64,
    pub stroke_width: f64,
    /// Shimmer alpha is `sin(now * rate) * depth + base`.
    pub shimmer_rate: f64,
    pub shimmer_depth: f64,
    pub shimmer_base: f64,
    /// Glow blur is `base + sin(now * rate) * depth`.
    pub glow_base: f64,
    pub glow_depth: f64,
    pub glow_rate: f64,
}

impl Default for InnerPatternConfig {
    fn default() -> Self {
        Self {
            triangles: 1,
            size_factor: 0.999,
            mid_gain: 0.033,
            stroke_width: 2.0,
            shimmer_rate: 0.002,
            shimmer_depth: 0.2,
            shimmer_base: 0.8,
            glow_base: 15.0,
            glow_depth: 10.0,
            glow_rate: 0.003,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RotationConfig {
    /// Angle in radians before the first frame.
    pub initial: f64,
    /// Radians added per frame per unit of mid energy.
    pub mid_gain: f64,
}

impl Default for RotationConfig {
    fn default() -> Self {
        Self {
            initial: 0.04,
            mid_gain: 0.0001,
        }
    }
}

/// Configuration of the PCM to byte-spectrum analyser.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpectrumConfig {
    pub fft_size: usize,
    pub smoothing: f32,
    pub min_decibels: f32,
    pub max_decibels: f32,
}

impl Default for SpectrumConfig {
    fn default() -> Self {
        Self {
            fft_size: 2048,
            smoothing: 0.8,
            min_decibels: -100.0,
            max_decibels: -30.0,
        }
    }
}

impl SpectrumConfig {
    pub fn validate(&self) -> Result<()> {
        if self.fft_size < 32 || !self.fft_size.is_power_of_two() {
            return Err(VisualiserError::config(format!(
                "fft_size must be a power of two >= 32, got {}",
                self.fft_size
            )));
        }
        if !(0.0..=1.0).contains(&self.smoothing) {
            return Err(VisualiserError::config(format!(
                "smoothing must lie in [0, 1], got {}",
                self.smoothing
            )));
        }
        if !self.min_decibels.is_finite()
            || !self.max_decibels.is_finite()
            || self.min_decibels >= self.max_decibels
        {
            return Err(VisualiserError::config(
                "min_decibels must be finite and below max_decibels",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        VisualiserConfig::default().validate().unwrap();
    }

    #[test]
    fn partial_json_keeps_remaining_defaults() {
        let config =
            VisualiserConfig::from_json_str(r#"{ "timing": { "target_fps": 30 } }"#).unwrap();

        assert_eq!(config.timing.target_fps, 30.0);
        assert_eq!(config.prism, PrismConfig::default());
        assert_eq!(config.trail.alpha, 0.1);
    }

    #[test]
    fn rejects_zero_fps() {
        let err = VisualiserConfig::from_json_str(r#"{ "timing": { "target_fps": 0 } }"#)
            .unwrap_err();
        assert!(format!("{err}").contains("target_fps"));
    }

    #[test]
    fn rejects_degenerate_polygon() {
        let mut config = VisualiserConfig::default();
        config.prism.sides = 2;
        assert!(matches!(
            config.validate(),
            Err(VisualiserError::InvalidConfig(_))
        ));
    }

    #[test]
    fn rejects_oversized_vertex_counts() {
        let mut config = VisualiserConfig::default();
        config.prism.sides = u32::MAX;
        assert!(config.validate().is_err());

        config.prism.sides = MAX_POLYGON_SIDES;
        config.inner.triangles = u32::MAX;
        assert!(config.validate().is_err());

        config.inner.triangles = MAX_INNER_TRIANGLES;
        config.validate().unwrap();
    }

    #[test]
    fn rejects_inverted_decibel_range() {
        let mut config = VisualiserConfig::default();
        config.spectrum.min_decibels = -20.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn json_round_trip_preserves_values() {
        let mut config = VisualiserConfig::default();
        config.inner.triangles = 4;
        let json = config.to_json_pretty().unwrap();
        assert_eq!(VisualiserConfig::from_json_str(&json).unwrap(), config);
    }
}
