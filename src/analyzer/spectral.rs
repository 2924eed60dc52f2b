//! Spectral feature extraction
//!
//! Turns a decoded mono sample buffer into the handful of numbers the
//! classifier works from.
//!
//! # Why High Frequencies Matter
//!
//! Lossy encoders throw away the top of the spectrum first. The lower the
//! bitrate, the lower the point where content stops:
//!
//! ```text
//! Source      | Content reaches   | Typical cutoff
//! ------------|-------------------|----------------
//! MP3 128k    | ~16 kHz           | hard wall at 16k
//! MP3 192k    | ~18 kHz           |
//! MP3 256k    | ~19.5 kHz         |
//! MP3 320k    | ~20 kHz           | wall at 20k
//! Lossless    | up to Nyquist     | natural rolloff to 22.05k
//! ```
//!
//! Re-encoding a lossy file into a lossless container keeps the wall, so
//! the averaged spectrum of an upscaled file goes quiet well below Nyquist.
//!
//! # Pipeline
//!
//! 1. STFT (periodic Hann window, centered frames), magnitude per bin
//! 2. Average magnitude across frames
//! 3. Convert to dB relative to the loudest bin, clipped at `-top_db`
//! 4. Read features off the dB spectrum:
//!    - **cutoff frequency**: highest bin in the scan band above a threshold,
//!      found with a strict pass and, failing that, a relaxed pass
//!    - **high-frequency energy**: mean dB over 18-22 kHz
//!    - **spectral presence**: percent of 18-22 kHz bins above -70 dB
//!    - **content above 20k**: any 20-22 kHz bin above -65 dB
//! 5. Dynamic range from the RMS envelope (independent of the STFT)
//!
//! Nothing here fails. Values that cannot be computed come back as `None`
//! or as the [`FLOOR_DB`] sentinel.

use crate::config::AnalysisConfig;
use rustfft::{num_complex::Complex, FftPlanner};
use serde::{Deserialize, Serialize};

/// Reported for empty bands and for spectra with no energy at all
pub const FLOOR_DB: f64 = -100.0;

/// Smallest amplitude considered when converting to dB
const AMIN: f64 = 1e-5;

/// Which pass of the cutoff scan resolved the frequency
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CutoffPass {
    /// Bin exceeded the primary energy threshold
    Strict,
    /// Only the relaxed (primary minus offset) threshold was exceeded
    Relaxed,
}

/// Features extracted from one file's leading audio window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpectralFeatures {
    /// Highest frequency in the scan band carrying energy (Hz); `None` if
    /// neither pass found one
    pub cutoff_frequency: Option<f64>,
    pub cutoff_pass: Option<CutoffPass>,
    /// Mean level of the high-frequency sub-band (dB relative to peak)
    pub high_freq_energy: f64,
    /// Percent of high-frequency bins above the presence threshold, 0-100
    pub spectral_presence: f64,
    pub has_content_above_20k: bool,
    /// Loudest minus quietest non-silent RMS frame (dB)
    pub dynamic_range: Option<f64>,
}

/// Averaged magnitude spectrum in dB, paired with bin frequencies
#[derive(Debug, Clone)]
pub struct Spectrum {
    frequencies: Vec<f64>,
    db: Vec<f64>,
}

impl Spectrum {
    /// Compute the averaged spectrum of `samples`
    pub fn compute(samples: &[f32], sample_rate: u32, config: &AnalysisConfig) -> Self {
        let magnitudes = average_magnitude_spectrum(samples, config.fft_size, config.hop_length);
        let frequencies = if magnitudes.is_empty() {
            Vec::new()
        } else {
            fft_frequencies(sample_rate, config.fft_size)
        };

        Self {
            frequencies,
            db: amplitude_to_db_relative(&magnitudes, config.top_db),
        }
    }

    #[cfg(test)]
    fn from_db(frequencies: Vec<f64>, db: Vec<f64>) -> Self {
        assert_eq!(frequencies.len(), db.len());
        Self { frequencies, db }
    }

    /// (frequency, dB) pairs whose frequency lies in `[low, high]`
    fn band(&self, low: f64, high: f64) -> impl DoubleEndedIterator<Item = (f64, f64)> + '_ {
        self.frequencies
            .iter()
            .zip(self.db.iter())
            .filter(move |&(&f, _)| f >= low && f <= high)
            .map(|(&f, &db)| (f, db))
    }

    /// Scan `[low, high]` from the top down for the first bin above `threshold`
    fn scan_cutoff(&self, low: f64, high: f64, threshold: f64) -> Option<f64> {
        self.band(low, high)
            .rev()
            .find(|&(_, db)| db > threshold)
            .map(|(f, _)| f)
    }

    /// Two-pass cutoff search: strict threshold first, relaxed threshold second
    pub fn cutoff_frequency(&self, config: &AnalysisConfig) -> Option<(f64, CutoffPass)> {
        let passes = [
            (CutoffPass::Strict, config.energy_threshold),
            (CutoffPass::Relaxed, config.energy_threshold - config.relaxed_offset),
        ];

        passes.into_iter().find_map(|(pass, threshold)| {
            self.scan_cutoff(config.min_frequency, config.max_frequency, threshold)
                .map(|f| (f, pass))
        })
    }

    /// Mean dB over `[low, high]`, or [`FLOOR_DB`] when no bin falls inside
    pub fn band_energy(&self, low: f64, high: f64) -> f64 {
        let (sum, count) = self
            .band(low, high)
            .fold((0.0, 0usize), |(sum, count), (_, db)| (sum + db, count + 1));

        if count == 0 {
            FLOOR_DB
        } else {
            sum / count as f64
        }
    }

    /// Percent of bins in `[low, high]` above `threshold`; 0 for an empty band
    pub fn presence(&self, low: f64, high: f64, threshold: f64) -> f64 {
        let (above, total) = self
            .band(low, high)
            .fold((0usize, 0usize), |(above, total), (_, db)| {
                (above + usize::from(db > threshold), total + 1)
            });

        if total == 0 {
            return 0.0;
        }

        (100.0 * above as f64 / total as f64).clamp(0.0, 100.0)
    }

    /// True if any bin in `[low, high]` exceeds `threshold`
    pub fn any_above(&self, low: f64, high: f64, threshold: f64) -> bool {
        self.band(low, high).any(|(_, db)| db > threshold)
    }
}

/// Extract the full feature set from a mono buffer
pub fn extract(samples: &[f32], sample_rate: u32, config: &AnalysisConfig) -> SpectralFeatures {
    let spectrum = Spectrum::compute(samples, sample_rate, config);
    let cutoff = spectrum.cutoff_frequency(config);

    SpectralFeatures {
        cutoff_frequency: cutoff.map(|(f, _)| f),
        cutoff_pass: cutoff.map(|(_, pass)| pass),
        high_freq_energy: spectrum.band_energy(config.hf_band_low, config.hf_band_high),
        spectral_presence: spectrum.presence(
            config.hf_band_low,
            config.hf_band_high,
            config.presence_threshold,
        ),
        has_content_above_20k: spectrum.any_above(
            config.ultra_band_low,
            config.ultra_band_high,
            config.ultra_threshold,
        ),
        dynamic_range: dynamic_range(samples, config),
    }
}

/// Periodic Hann window (the DFT-even variant used for spectral analysis)
fn hann_window(size: usize) -> Vec<f64> {
    (0..size)
        .map(|i| 0.5 - 0.5 * (2.0 * std::f64::consts::PI * i as f64 / size as f64).cos())
        .collect()
}

/// Convert amplitude to dB relative to `reference`, flooring both at [`AMIN`]
fn amplitude_to_db(value: f64, reference: f64) -> f64 {
    20.0 * value.max(AMIN).log10() - 20.0 * reference.max(AMIN).log10()
}

/// Relative dB spectrum: 0 dB at the loudest bin, nothing below `-top_db`.
///
/// A spectrum with no energy anywhere has no meaningful reference, so every
/// bin is pinned to [`FLOOR_DB`] instead.
fn amplitude_to_db_relative(magnitudes: &[f64], top_db: f64) -> Vec<f64> {
    let peak = magnitudes.iter().cloned().fold(0.0_f64, f64::max);

    if peak <= 0.0 {
        return vec![FLOOR_DB; magnitudes.len()];
    }

    let db: Vec<f64> = magnitudes.iter().map(|&m| amplitude_to_db(m, peak)).collect();
    let ceiling = db.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    db.into_iter().map(|v| v.max(ceiling - top_db)).collect()
}

/// Center frequency of each of the `fft_size / 2 + 1` bins
pub fn fft_frequencies(sample_rate: u32, fft_size: usize) -> Vec<f64> {
    (0..=fft_size / 2)
        .map(|k| k as f64 * sample_rate as f64 / fft_size as f64)
        .collect()
}

/// Zero-pad by half a frame on each side so frame `t` is centered on sample
/// `t * hop`. Returns the padded signal and the frame count.
fn centered(samples: &[f32], frame_length: usize, hop: usize) -> (Vec<f64>, usize) {
    if samples.is_empty() || frame_length == 0 || hop == 0 {
        return (Vec::new(), 0);
    }

    let pad = frame_length / 2;
    let mut padded = vec![0.0; samples.len() + 2 * pad];
    for (dst, &src) in padded[pad..].iter_mut().zip(samples) {
        *dst = src as f64;
    }

    let frames = if padded.len() < frame_length {
        0
    } else {
        1 + (padded.len() - frame_length) / hop
    };

    (padded, frames)
}

/// Mean STFT magnitude per bin across all frames
fn average_magnitude_spectrum(samples: &[f32], fft_size: usize, hop: usize) -> Vec<f64> {
    let (padded, num_frames) = centered(samples, fft_size, hop);
    if num_frames == 0 {
        return Vec::new();
    }

    let mut planner = FftPlanner::new();
    let fft = planner.plan_fft_forward(fft_size);
    let window = hann_window(fft_size);
    let num_bins = fft_size / 2 + 1;

    let mut sum = vec![0.0; num_bins];
    let mut buffer = vec![Complex::new(0.0, 0.0); fft_size];

    for frame in 0..num_frames {
        let start = frame * hop;

        for ((slot, &s), &w) in buffer
            .iter_mut()
            .zip(&padded[start..start + fft_size])
            .zip(window.iter())
        {
            *slot = Complex::new(s * w, 0.0);
        }

        fft.process(&mut buffer);

        for (acc, c) in sum.iter_mut().zip(buffer.iter()) {
            *acc += c.norm();
        }
    }

    let n = num_frames as f64;
    sum.iter().map(|&v| v / n).collect()
}

/// RMS of each centered frame
fn frame_rms(samples: &[f32], frame_length: usize, hop: usize) -> Vec<f64> {
    let (padded, num_frames) = centered(samples, frame_length, hop);

    (0..num_frames)
        .map(|frame| {
            let start = frame * hop;
            let frame = &padded[start..start + frame_length];
            let sum_sq: f64 = frame.iter().map(|&x| x * x).sum();
            (sum_sq / frame_length as f64).sqrt()
        })
        .collect()
}

/// Spread between the loudest and quietest non-silent frames, in dB.
///
/// Silent frames (RMS exactly zero) are dropped first; if that leaves
/// nothing the range is undefined.
fn dynamic_range(samples: &[f32], config: &AnalysisConfig) -> Option<f64> {
    let levels: Vec<f64> = frame_rms(samples, config.rms_frame_length, config.hop_length)
        .into_iter()
        .filter(|&r| r > 0.0)
        .map(|r| amplitude_to_db(r, 1.0))
        .collect();

    if levels.is_empty() {
        return None;
    }

    let max = levels.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let min = levels
        .iter()
        .map(|&v| v.max(max - config.top_db))
        .fold(f64::INFINITY, f64::min);

    Some(max - min)
}
