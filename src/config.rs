//! Analysis and classification configuration
//!
//! Every constant the extractor and classifier depend on lives here and is
//! passed in explicitly. Defaults are the calibrated values; any subset can be
//! overridden from a TOML file:
//!
//! ```toml
//! supported_formats = [".mp3", ".flac"]
//!
//! [analysis]
//! duration_seconds = 20.0
//!
//! [thresholds]
//! suspicious_margin = 1500.0
//! ```

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Extensions the classifier has a policy for
pub const SUPPORTED_FORMATS: [&str; 3] = [".mp3", ".flac", ".wav"];

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Extensions picked up by the scanner (leading dot, lower case)
    pub supported_formats: Vec<String>,
    pub analysis: AnalysisConfig,
    pub thresholds: ClassifierThresholds,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            supported_formats: SUPPORTED_FORMATS.iter().map(|s| s.to_string()).collect(),
            analysis: AnalysisConfig::default(),
            thresholds: ClassifierThresholds::default(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file, filling missing keys with defaults
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
        let config = Self::from_toml_str(&content)?;
        tracing::debug!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)
            .map_err(|e| Error::Config(format!("Parse TOML failed: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values that would make the analysis meaningless
    pub fn validate(&self) -> Result<()> {
        let a = &self.analysis;

        if a.duration_seconds <= 0.0 {
            return Err(Error::Config("duration_seconds must be positive".to_string()));
        }
        if a.target_sample_rate == 0 {
            return Err(Error::Config("target_sample_rate must be non-zero".to_string()));
        }
        if a.fft_size < 2 || a.hop_length == 0 || a.rms_frame_length == 0 {
            return Err(Error::Config(
                "fft_size, hop_length and rms_frame_length must be non-zero".to_string(),
            ));
        }
        if a.hop_length > a.fft_size {
            return Err(Error::Config(format!(
                "hop_length ({}) larger than fft_size ({})",
                a.hop_length, a.fft_size
            )));
        }
        if a.top_db <= 0.0 {
            return Err(Error::Config("top_db must be positive".to_string()));
        }

        for (name, low, high) in [
            ("scan band", a.min_frequency, a.max_frequency),
            ("high-frequency band", a.hf_band_low, a.hf_band_high),
            ("ultra-high band", a.ultra_band_low, a.ultra_band_high),
        ] {
            if low < 0.0 || low > high {
                return Err(Error::Config(format!(
                    "{} is inverted or negative ({} - {} Hz)",
                    name, low, high
                )));
            }
        }

        if self.thresholds.suspicious_margin < 0.0 {
            return Err(Error::Config("suspicious_margin must not be negative".to_string()));
        }

        if self.supported_formats.is_empty() {
            return Err(Error::Config("supported_formats is empty".to_string()));
        }

        Ok(())
    }
}

/// Parameters of the spectral feature extractor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Leading window of each file that gets decoded (seconds)
    pub duration_seconds: f64,
    /// Decoded audio is resampled to this rate before analysis
    pub target_sample_rate: u32,
    pub fft_size: usize,
    pub hop_length: usize,
    /// Frame length of the RMS envelope used for dynamic range
    pub rms_frame_length: usize,
    /// dB values are clipped at `peak - top_db`
    pub top_db: f64,

    /// Cutoff scan band (Hz)
    pub min_frequency: f64,
    pub max_frequency: f64,
    /// Strict-pass threshold for the cutoff scan (dB relative to peak)
    pub energy_threshold: f64,
    /// The relaxed pass uses `energy_threshold - relaxed_offset`
    pub relaxed_offset: f64,

    /// Sub-band for high-frequency energy and spectral presence (Hz)
    pub hf_band_low: f64,
    pub hf_band_high: f64,
    pub presence_threshold: f64,

    /// Sub-band for the content-above-20k flag (Hz)
    pub ultra_band_low: f64,
    pub ultra_band_high: f64,
    pub ultra_threshold: f64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            duration_seconds: 30.0,
            target_sample_rate: 44100,
            fft_size: 4096,
            hop_length: 512,
            rms_frame_length: 2048,
            top_db: 80.0,
            min_frequency: 16000.0,
            max_frequency: 22050.0,
            energy_threshold: -60.0,
            relaxed_offset: 20.0,
            hf_band_low: 18000.0,
            hf_band_high: 22000.0,
            presence_threshold: -70.0,
            ultra_band_low: 20000.0,
            ultra_band_high: 22000.0,
            ultra_threshold: -65.0,
        }
    }
}

/// Decision thresholds of the classifier
///
/// The presence tiers (30/15/5 %) and the dB levels are empirical calibration
/// values, not derived ones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierThresholds {
    /// Expected MP3 cutoff per bitrate bucket (Hz)
    pub mp3_320: f64,
    pub mp3_256: f64,
    pub mp3_192: f64,
    pub mp3_128: f64,
    /// Slack below the expected cutoff before an MP3 is doubted (Hz)
    pub suspicious_margin: f64,

    /// Lossless files with little HF presence and a cutoff below this are fake
    pub lossless_fake_cutoff: f64,
    /// Spectral presence tiers (percent)
    pub presence_legitimate: f64,
    pub presence_mixed: f64,
    pub presence_low: f64,
    /// HF energy that rescues a mixed-presence lossless file (dB)
    pub hf_energy_legitimate: f64,
}

impl Default for ClassifierThresholds {
    fn default() -> Self {
        Self {
            mp3_320: 20000.0,
            mp3_256: 19500.0,
            mp3_192: 18000.0,
            mp3_128: 16000.0,
            suspicious_margin: 2000.0,
            lossless_fake_cutoff: 16500.0,
            presence_legitimate: 30.0,
            presence_mixed: 15.0,
            presence_low: 5.0,
            hf_energy_legitimate: -60.0,
        }
    }
}
