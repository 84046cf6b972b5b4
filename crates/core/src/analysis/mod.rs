use std::ops::Range;

use serde::{Deserialize, Serialize};

/// Upper bound of a single magnitude sample and therefore of every band.
pub const MAX_MAGNITUDE: f64 = 255.0;

/// Frequency-ascending magnitude samples, conventionally in `0..=255`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FrequencySnapshot {
    magnitudes: Vec<f64>,
}

impl FrequencySnapshot {
    pub fn new(magnitudes: Vec<f64>) -> Self {
        Self { magnitudes }
    }

    /// Builds a snapshot from byte magnitudes as produced by
    /// [`SpectrumAnalyser`](crate::SpectrumAnalyser).
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self {
            magnitudes: bytes.iter().map(|&b| f64::from(b)).collect(),
        }
    }

    /// A snapshot of `len` samples all holding `value`.
    pub fn uniform(len: usize, value: f64) -> Self {
        Self {
            magnitudes: vec![value; len],
        }
    }

    pub fn magnitudes(&self) -> &[f64] {
        &self.magnitudes
    }

    pub fn len(&self) -> usize {
        self.magnitudes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.magnitudes.is_empty()
    }
}

impl From<Vec<f64>> for FrequencySnapshot {
    fn from(value: Vec<f64>) -> Self {
        Self::new(value)
    }
}

impl From<&[u8]> for FrequencySnapshot {
    fn from(value: &[u8]) -> Self {
        Self::from_bytes(value)
    }
}

/// Bass, mid and treble energy, each in `0.0..=MAX_MAGNITUDE`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FrequencyBands {
    pub bass: f64,
    pub mid: f64,
    pub treble: f64,
}

impl FrequencyBands {
    pub const ZERO: Self = Self {
        bass: 0.0,
        mid: 0.0,
        treble: 0.0,
    };

    pub fn new(bass: f64, mid: f64, treble: f64) -> Self {
        Self { bass, mid, treble }
    }
}

/// Reduces a snapshot to three band means over the low, middle and high
/// thirds of the spectrum.
///
/// A missing or empty snapshot yields [`FrequencyBands::ZERO`] so the
/// visualisation keeps rendering in its neutral state. Samples are clamped
/// into `0..=MAX_MAGNITUDE` and non-finite samples count as silence, which
/// keeps every band finite and bounded whatever the feed sends.
pub fn analyze_frequency_bands(snapshot: Option<&FrequencySnapshot>) -> FrequencyBands {
    let magnitudes = match snapshot {
        Some(snapshot) if !snapshot.is_empty() => snapshot.magnitudes(),
        _ => return FrequencyBands::ZERO,
    };

    let len = magnitudes.len();
    FrequencyBands {
        bass: band_mean(&magnitudes[band_range(0, len)]),
        mid: band_mean(&magnitudes[band_range(1, len)]),
        treble: band_mean(&magnitudes[band_range(2, len)]),
    }
}

/// Index range of band `band` (0..3). Ranges are contiguous thirds; with
/// fewer than three samples a band borrows its neighbour's sample instead
/// of going empty.
fn band_range(band: usize, len: usize) -> Range<usize> {
    let start = (band * len / 3).min(len - 1);
    let end = ((band + 1) * len / 3).max(start + 1);
    start..end
}

fn band_mean(samples: &[f64]) -> f64 {
    let sum: f64 = samples.iter().map(|&value| sanitise(value)).sum();
    (sum / samples.len() as f64).clamp(0.0, MAX_MAGNITUDE)
}

fn sanitise(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, MAX_MAGNITUDE)
    } else {
        0.0
    }
}
