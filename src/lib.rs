//! Lossprobe - Detect upscaled and transcoded audio files
//!
//! Lossprobe inspects MP3, FLAC and WAV files to find ones whose actual
//! audio content doesn't match what the container claims: MP3s re-encoded
//! at a higher bitrate than their source, and "lossless" files that were
//! made from lossy sources.
//!
//! # Overview
//!
//! Lossy encoders low-pass the signal before encoding. Re-encoding or
//! converting to a lossless container keeps that low-pass: the spectrum
//! still falls off a cliff where the first lossy encoder cut it. Lossprobe
//! measures where that cliff is and how much energy lives above it, then
//! compares the result with what the file's format and bitrate imply.
//!
//! # Pipeline
//!
//! 1. **Metadata** ([`analyzer::metadata`]): declared bitrate, sample rate,
//!    channels and duration, read without decoding.
//! 2. **Features** ([`analyzer::spectral`]): the leading window is decoded,
//!    resampled and reduced to a [`SpectralFeatures`] record (cutoff
//!    frequency, high-band energy, spectral presence, dynamic range).
//! 3. **Classification** ([`classifier`]): a pure rule set turns metadata
//!    and features into `legitimate`, `suspicious`, `fake` or `error`.
//!
//! # Quick Start
//!
//! ```no_run
//! use lossprobe::{Analyzer, Classification};
//!
//! let analyzer = Analyzer::new();
//! let (result, outcome) = analyzer.evaluate("suspicious.flac");
//!
//! match outcome.classification {
//!     Classification::Legitimate => println!("Looks legitimate"),
//!     Classification::Suspicious => println!("Something's off - investigate"),
//!     Classification::Fake => println!("Upscaled: {}", outcome.reason),
//!     Classification::Error => println!("Couldn't analyze: {:?}", result.error),
//! }
//!
//! if let Some(features) = &result.features {
//!     println!("Cutoff: {:?} Hz", features.cutoff_frequency);
//! }
//! ```
//!
//! # Modules
//!
//! - [`analyzer`]: Per-file pipeline, decoding and feature extraction
//! - [`classifier`]: Format-specific classification rules
//! - [`config`]: TOML configuration and thresholds
//! - [`mp3`]: MP3 frame header parsing (bitrate fallback)
//! - [`report`]: Output formatters (JSON, CSV)
//! - [`scan`]: Audio file discovery

pub mod analyzer;
pub mod classifier;
pub mod config;
pub mod error;
pub mod mp3;
pub mod report;
pub mod scan;

pub use analyzer::metadata::ContainerMetadata;
pub use analyzer::spectral::SpectralFeatures;
pub use analyzer::{AnalysisResult, Analyzer};
pub use classifier::{Classification, ClassificationOutcome};
pub use config::Config;
pub use error::{Error, Result};
