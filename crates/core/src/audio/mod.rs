use std::{f32::consts::PI, fmt, sync::Arc};

use realfft::{num_complex::Complex32, RealFftPlanner, RealToComplex};

use crate::{config::SpectrumConfig, FrequencySnapshot, Result, VisualiserError};

const BLACKMAN_A0: f32 = 0.42;
const BLACKMAN_A1: f32 = 0.5;
const BLACKMAN_A2: f32 = 0.08;

/// Turns blocks of PCM samples into byte-frequency snapshots.
///
/// Follows the usual analyser-node pipeline: Blackman window, real FFT,
/// magnitudes normalised by the FFT size, exponential smoothing across
/// calls, then a linear map of `[min_decibels, max_decibels]` onto
/// `0..=255`. Snapshots hold `fft_size / 2` bins.
pub struct SpectrumAnalyser {
    config: SpectrumConfig,
    window: Vec<f32>,
    smoothed: Vec<f32>,
    fft: FftResources,
}

impl SpectrumAnalyser {
    pub fn new(config: SpectrumConfig) -> Result<Self> {
        config.validate()?;
        let size = config.fft_size;

        let mut planner = RealFftPlanner::<f32>::new();
        let plan = planner.plan_fft_forward(size);
        let fft = FftResources {
            size,
            scratch: plan.make_scratch_vec(),
            spectrum: plan.make_output_vec(),
            input: plan.make_input_vec(),
            plan,
        };

        Ok(Self {
            window: blackman_window(size),
            smoothed: vec![0.0; size / 2],
            config,
            fft,
        })
    }

    pub fn config(&self) -> &SpectrumConfig {
        &self.config
    }

    /// Number of bins in every snapshot.
    pub fn bin_count(&self) -> usize {
        self.config.fft_size / 2
    }

    /// Centre frequency of `bin` for audio sampled at `sample_rate`.
    pub fn bin_frequency(&self, bin: usize, sample_rate: u32) -> f32 {
        bin as f32 * sample_rate as f32 / self.config.fft_size as f32
    }

    /// Forgets the smoothing history.
    pub fn reset(&mut self) {
        self.smoothed.fill(0.0);
    }

    /// Analyses the most recent `fft_size` samples of `samples`. Shorter
    /// blocks are zero-padded in front so the newest sample stays last.
    pub fn analyse(&mut self, samples: &[f32]) -> Result<FrequencySnapshot> {
        if samples.is_empty() {
            return Err(VisualiserError::InvalidInput(
                "spectrum analysis requires at least one sample",
            ));
        }

        let size = self.fft.size;
        let recent = &samples[samples.len().saturating_sub(size)..];
        let pad = size - recent.len();

        self.fft.input[..pad].fill(0.0);
        for (index, sample) in recent.iter().enumerate() {
            let slot = pad + index;
            let value = if sample.is_finite() { *sample } else { 0.0 };
            self.fft.input[slot] = value * self.window[slot];
        }

        self.fft.plan.process_with_scratch(
            &mut self.fft.input,
            &mut self.fft.spectrum,
            &mut self.fft.scratch,
        )?;

        let smoothing = self.config.smoothing;
        let scale = 1.0 / size as f32;
        let range = self.config.max_decibels - self.config.min_decibels;
        let mut bytes = Vec::with_capacity(self.smoothed.len());

        for (previous, bin) in self.smoothed.iter_mut().zip(&self.fft.spectrum) {
            let magnitude = bin.norm() * scale;
            *previous = smoothing * *previous + (1.0 - smoothing) * magnitude;

            let decibels = 20.0 * previous.log10();
            let scaled = 255.0 / range * (decibels - self.config.min_decibels);
            // log10(0) is -inf, which clamps to silence.
            bytes.push(if scaled.is_nan() {
                0
            } else {
                scaled.floor().clamp(0.0, 255.0) as u8
            });
        }

        Ok(FrequencySnapshot::from_bytes(&bytes))
    }
}

impl fmt::Debug for SpectrumAnalyser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpectrumAnalyser")
            .field("config", &self.config)
            .field("fft", &self.fft)
            .finish()
    }
}

struct FftResources {
    size: usize,
    plan: Arc<dyn RealToComplex<f32>>,
    scratch: Vec<Complex32>,
    spectrum: Vec<Complex32>,
    input: Vec<f32>,
}

impl fmt::Debug for FftResources {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FftResources")
            .field("size", &self.size)
            .finish()
    }
}

fn blackman_window(len: usize) -> Vec<f32> {
    let n = len as f32;
    (0..len)
        .map(|index| {
            let phase = 2.0 * PI * index as f32 / n;
            BLACKMAN_A0 - BLACKMAN_A1 * phase.cos() + BLACKMAN_A2 * (2.0 * phase).cos()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn analyser() -> SpectrumAnalyser {
        SpectrumAnalyser::new(SpectrumConfig::default()).unwrap()
    }

    fn bin_tone(bin: usize, len: usize) -> Vec<f32> {
        (0..len)
            .map(|n| (2.0 * PI * bin as f32 * n as f32 / len as f32).sin())
            .collect()
    }

    #[test]
    fn silence_maps_to_zero() {
        let mut analyser = analyser();
        let snapshot = analyser.analyse(&[0.0; 2048]).unwrap();

        assert_eq!(snapshot.len(), 1024);
        assert!(snapshot.magnitudes().iter().all(|&m| m == 0.0));
    }

    #[test]
    fn tone_peaks_at_its_bin() {
        let mut analyser = analyser();
        let snapshot = analyser.analyse(&bin_tone(64, 2048)).unwrap();
        let magnitudes = snapshot.magnitudes();

        assert_eq!(magnitudes[64], 255.0);
        assert!(magnitudes[200] < 64.0);
        assert!(magnitudes[900] < 64.0);
    }

    #[test]
    fn smoothing_carries_energy_into_the_next_block() {
        let mut analyser = analyser();
        analyser.analyse(&bin_tone(64, 2048)).unwrap();
        let decayed = analyser.analyse(&[0.0; 2048]).unwrap();
        assert!(decayed.magnitudes()[64] > 0.0);

        analyser.reset();
        let cleared = analyser.analyse(&[0.0; 2048]).unwrap();
        assert_eq!(cleared.magnitudes()[64], 0.0);
    }

    #[test]
    fn short_blocks_are_padded() {
        let mut analyser = analyser();
        let snapshot = analyser.analyse(&[0.5; 100]).unwrap();
        assert_eq!(snapshot.len(), analyser.bin_count());
    }

    #[test]
    fn rejects_empty_blocks() {
        let mut analyser = analyser();
        assert!(matches!(
            analyser.analyse(&[]),
            Err(VisualiserError::InvalidInput(_))
        ));
    }

    #[test]
    fn bin_frequency_scales_with_sample_rate() {
        let analyser = analyser();
        assert_eq!(analyser.bin_frequency(1024, 48_000), 24_000.0);
    }
}
