//! Classification of analyzed files
//!
//! A pure function from an [`AnalysisResult`] and a set of
//! [`ClassifierThresholds`] to a [`ClassificationOutcome`]. Nothing is cached
//! and nothing is global; the same inputs always produce the same verdict.
//!
//! # Per-Format Policy
//!
//! The two policies deliberately look at different evidence:
//!
//! - **MP3** compares the measured cutoff against the cutoff the *declared
//!   bitrate* should produce. Spectral presence and HF energy are ignored.
//! - **FLAC / WAV** ignore the declared bitrate entirely (for lossless
//!   containers it only reflects compression ratio) and judge the 18-22 kHz
//!   band directly.
//!
//! ```text
//! MP3 bucket | Expected cutoff
//! -----------|----------------
//! >= 320k    | 20000 Hz
//! >= 256k    | 19500 Hz
//! >= 192k    | 18000 Hz
//! otherwise  | 16000 Hz
//! ```
//!
//! Comparisons are strict (`<`, `>`) unless noted; a value exactly on a
//! threshold lands in the more trusting branch.

use crate::analyzer::metadata::{AudioFormat, ContainerMetadata};
use crate::analyzer::spectral::SpectralFeatures;
use crate::analyzer::AnalysisResult;
use crate::config::ClassifierThresholds;
use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Classification {
    /// Spectral content matches the declared quality
    Legitimate,
    /// Some evidence of a lower-quality origin
    Suspicious,
    /// Strong evidence of upscaling or transcoding
    Fake,
    /// Could not be judged
    Error,
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Classification::Legitimate => write!(f, "legitimate"),
            Classification::Suspicious => write!(f, "suspicious"),
            Classification::Fake => write!(f, "fake"),
            Classification::Error => write!(f, "error"),
        }
    }
}

/// Verdict plus the reason behind it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationOutcome {
    pub classification: Classification,
    pub reason: String,
}

impl ClassificationOutcome {
    pub fn new(classification: Classification, reason: impl Into<String>) -> Self {
        Self {
            classification,
            reason: reason.into(),
        }
    }

    fn legitimate(reason: impl Into<String>) -> Self {
        Self::new(Classification::Legitimate, reason)
    }

    fn suspicious(reason: impl Into<String>) -> Self {
        Self::new(Classification::Suspicious, reason)
    }

    fn fake(reason: impl Into<String>) -> Self {
        Self::new(Classification::Fake, reason)
    }

    fn error(reason: impl Into<String>) -> Self {
        Self::new(Classification::Error, reason)
    }
}

/// Classify one analysis result
pub fn classify(result: &AnalysisResult, thresholds: &ClassifierThresholds) -> ClassificationOutcome {
    if let Some(ref error) = result.error {
        return ClassificationOutcome::error(error.clone());
    }

    let format = match result.metadata.audio_format() {
        Some(f) => f,
        None => {
            let format = display_format(&result.metadata.format).to_string();
            return ClassificationOutcome::error(Error::UnsupportedFormat(format).to_string());
        }
    };

    let features = match result.features {
        Some(ref f) => f,
        None => return ClassificationOutcome::error("Spectral features unavailable"),
    };

    match format {
        AudioFormat::Mp3 => detect_mp3(&result.metadata, features, thresholds),
        AudioFormat::Flac => detect_flac(features, thresholds),
        AudioFormat::Wav => detect_wav(features, thresholds),
    }
}

fn display_format(format: &str) -> &str {
    if format.is_empty() {
        "(no extension)"
    } else {
        format
    }
}

/// MP3 policy: measured cutoff against the declared bitrate's expected cutoff
pub fn detect_mp3(
    metadata: &ContainerMetadata,
    features: &SpectralFeatures,
    t: &ClassifierThresholds,
) -> ClassificationOutcome {
    let cutoff = match features.cutoff_frequency {
        Some(c) => c,
        None => return ClassificationOutcome::error("Cutoff frequency could not be determined"),
    };

    let kbps = metadata.bitrate.map(|b| b as f64 / 1000.0).unwrap_or(0.0);
    let margin = t.suspicious_margin;

    if cutoff < t.mp3_128 - margin {
        return ClassificationOutcome::fake(format!(
            "Cutoff frequency very low ({:.0} Hz), likely corrupt or very low quality source",
            cutoff
        ));
    }

    if kbps >= 320.0 {
        return if cutoff < t.mp3_192 {
            ClassificationOutcome::fake(format!(
                "Declared 320 kbps but cutoff at {:.0} Hz indicates a 128 kbps origin",
                cutoff
            ))
        } else if cutoff < t.mp3_256 - margin {
            ClassificationOutcome::fake(format!(
                "Declared 320 kbps but cutoff at {:.0} Hz indicates a 192 kbps origin",
                cutoff
            ))
        } else if cutoff < t.mp3_320 - margin {
            ClassificationOutcome::suspicious(format!(
                "Declared 320 kbps but cutoff at {:.0} Hz suggests a 256 kbps origin",
                cutoff
            ))
        } else {
            ClassificationOutcome::legitimate(format!(
                "Cutoff frequency {:.0} Hz consistent with MP3 320 kbps",
                cutoff
            ))
        };
    }

    let expected = if kbps >= 256.0 {
        t.mp3_256
    } else if kbps >= 192.0 {
        t.mp3_192
    } else {
        t.mp3_128
    };

    if cutoff >= expected - margin {
        ClassificationOutcome::legitimate(format!(
            "Cutoff frequency {:.0} Hz consistent with declared bitrate ({:.0} kbps)",
            cutoff, kbps
        ))
    } else {
        ClassificationOutcome::suspicious(format!(
            "Cutoff frequency {:.0} Hz lower than expected for {:.0} kbps",
            cutoff, kbps
        ))
    }
}

/// FLAC policy
pub fn detect_flac(features: &SpectralFeatures, t: &ClassifierThresholds) -> ClassificationOutcome {
    classify_lossless(features, t)
}

/// WAV policy: uncompressed PCM should keep the full spectrum, same as FLAC
pub fn detect_wav(features: &SpectralFeatures, t: &ClassifierThresholds) -> ClassificationOutcome {
    classify_lossless(features, t)
}

/// Shared lossless policy: judge the high-frequency band directly
fn classify_lossless(features: &SpectralFeatures, t: &ClassifierThresholds) -> ClassificationOutcome {
    let presence = features.spectral_presence;
    let energy = features.high_freq_energy;

    if features.cutoff_frequency.is_none() && presence == 0.0 {
        return ClassificationOutcome::error(
            "No measurable high-frequency content: cutoff undetermined and spectral presence is 0%",
        );
    }

    if features.has_content_above_20k {
        return ClassificationOutcome::legitimate(
            "Content above 20 kHz present, consistent with a lossless source",
        );
    }

    if presence > t.presence_legitimate {
        return ClassificationOutcome::legitimate(format!(
            "High spectral presence in 18-22 kHz ({:.1}%), consistent with lossless",
            presence
        ));
    }

    if presence > t.presence_mixed {
        return if energy > t.hf_energy_legitimate {
            ClassificationOutcome::legitimate(format!(
                "Moderate spectral presence ({:.1}%) with strong high-frequency energy ({:.1} dB)",
                presence, energy
            ))
        } else {
            ClassificationOutcome::suspicious(format!(
                "Moderate spectral presence ({:.1}%) but weak high-frequency energy ({:.1} dB)",
                presence, energy
            ))
        };
    }

    if presence > t.presence_low {
        return ClassificationOutcome::suspicious(format!(
            "Low spectral presence in 18-22 kHz ({:.1}%), possible lossy origin",
            presence
        ));
    }

    match features.cutoff_frequency {
        Some(cutoff) if cutoff < t.lossless_fake_cutoff => ClassificationOutcome::fake(format!(
            "Almost no high-frequency content ({:.1}%) and cutoff at {:.0} Hz, indicates conversion from lossy",
            presence, cutoff
        )),
        Some(cutoff) => ClassificationOutcome::suspicious(format!(
            "Almost no high-frequency content ({:.1}%) with cutoff at {:.0} Hz",
            presence, cutoff
        )),
        None => ClassificationOutcome::suspicious(format!(
            "Almost no high-frequency content ({:.1}%), cutoff undetermined",
            presence
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn features(cutoff: Option<f64>, presence: f64, energy: f64, above_20k: bool) -> SpectralFeatures {
        SpectralFeatures {
            cutoff_frequency: cutoff,
            cutoff_pass: None,
            high_freq_energy: energy,
            spectral_presence: presence,
            has_content_above_20k: above_20k,
            dynamic_range: Some(12.0),
        }
    }

    fn metadata(format: &str, bitrate: Option<u32>) -> ContainerMetadata {
        ContainerMetadata {
            format: format.to_string(),
            bitrate,
            sample_rate: Some(44100),
            channels: Some(2),
            duration_seconds: Some(200.0),
            file_size_bytes: 1_000_000,
        }
    }

    fn result(format: &str, bitrate: Option<u32>, features: Option<SpectralFeatures>) -> AnalysisResult {
        AnalysisResult {
            file_path: format!("/music/track{}", format),
            file_name: format!("track{}", format),
            metadata: metadata(format, bitrate),
            features,
            error: None,
        }
    }

    fn mp3(bitrate_kbps: u32, cutoff: Option<f64>) -> Classification {
        detect_mp3(
            &metadata(".mp3", Some(bitrate_kbps * 1000)),
            &features(cutoff, 0.0, -90.0, false),
            &ClassifierThresholds::default(),
        )
        .classification
    }

    fn lossless(cutoff: Option<f64>, presence: f64, energy: f64, above_20k: bool) -> Classification {
        detect_flac(
            &features(cutoff, presence, energy, above_20k),
            &ClassifierThresholds::default(),
        )
        .classification
    }

    // ==========================================================================
    // DISPATCH
    // ==========================================================================

    #[test]
    fn test_prior_error_short_circuits() {
        let mut r = result(".flac", None, Some(features(Some(22000.0), 100.0, -5.0, true)));
        r.error = Some("Decode error: no audio track".to_string());

        let outcome = classify(&r, &ClassifierThresholds::default());
        assert_eq!(outcome.classification, Classification::Error);
        assert_eq!(outcome.reason, "Decode error: no audio track");
    }

    #[test]
    fn test_unsupported_format() {
        let r = result(".ogg", None, Some(features(Some(22000.0), 100.0, -5.0, true)));
        let outcome = classify(&r, &ClassifierThresholds::default());

        assert_eq!(outcome.classification, Classification::Error);
        assert_eq!(outcome.reason, Error::UnsupportedFormat(".ogg".to_string()).to_string());
    }

    #[test]
    fn test_missing_extension_named_in_reason() {
        let r = result("", None, Some(features(Some(22000.0), 100.0, -5.0, true)));
        let outcome = classify(&r, &ClassifierThresholds::default());
        assert_eq!(outcome.classification, Classification::Error);
        assert!(outcome.reason.contains("no extension"));
    }

    #[test]
    fn test_missing_features_is_error() {
        let r = result(".mp3", Some(320_000), None);
        assert_eq!(
            classify(&r, &ClassifierThresholds::default()).classification,
            Classification::Error
        );
    }

    #[test]
    fn test_dispatch_by_format() {
        let f = features(Some(16000.0), 2.0, -80.0, false);
        let t = ClassifierThresholds::default();

        // Same features, different policies
        let as_mp3 = classify(&result(".mp3", Some(128_000), Some(f.clone())), &t);
        let as_flac = classify(&result(".flac", Some(900_000), Some(f.clone())), &t);
        let as_wav = classify(&result(".wav", Some(1_411_000), Some(f)), &t);

        assert_eq!(as_mp3.classification, Classification::Legitimate);
        assert_eq!(as_flac.classification, Classification::Fake);
        assert_eq!(as_wav, as_flac);
    }

    // ==========================================================================
    // MP3 POLICY
    // ==========================================================================
    //
    // Default margin 2000 Hz. With the default table, the 192k-origin and
    // 256k-origin branches of the 320k bucket sit at or below the 128k-origin
    // branch (17500/18000 vs 18000), so a 320k file is either fake or
    // legitimate. Custom thresholds below exercise the other branches.
    // ==========================================================================

    #[test]
    fn test_mp3_no_cutoff_is_error() {
        assert_eq!(mp3(320, None), Classification::Error);
        assert_eq!(mp3(128, None), Classification::Error);
    }

    #[test]
    fn test_mp3_320_with_128k_cutoff_is_fake() {
        let outcome = detect_mp3(
            &metadata(".mp3", Some(320_000)),
            &features(Some(16000.0), 0.0, -90.0, false),
            &ClassifierThresholds::default(),
        );
        assert_eq!(outcome.classification, Classification::Fake);
        assert!(outcome.reason.contains("128 kbps"));
    }

    #[test]
    fn test_mp3_320_legitimate() {
        assert_eq!(mp3(320, Some(20500.0)), Classification::Legitimate);
        assert_eq!(mp3(320, Some(19000.0)), Classification::Legitimate);
    }

    #[test]
    fn test_mp3_320_boundary_at_192k_threshold() {
        // Exactly 18000 is not below 18000
        assert_eq!(mp3(320, Some(18000.0)), Classification::Legitimate);
        assert_eq!(mp3(320, Some(17999.0)), Classification::Fake);
    }

    #[test]
    fn test_mp3_very_low_cutoff_fake_regardless_of_bitrate() {
        // Below 16000 - 2000
        assert_eq!(mp3(128, Some(13000.0)), Classification::Fake);
        assert_eq!(mp3(64, Some(11000.0)), Classification::Fake);
        // Exactly 14000 is not below
        assert_eq!(mp3(128, Some(14000.0)), Classification::Legitimate);
    }

    #[test]
    fn test_mp3_lower_buckets() {
        // 256k expects 19500, legitimate from 17500
        assert_eq!(mp3(256, Some(17500.0)), Classification::Legitimate);
        assert_eq!(mp3(256, Some(17499.0)), Classification::Suspicious);
        // 192k expects 18000, legitimate from 16000
        assert_eq!(mp3(192, Some(16000.0)), Classification::Legitimate);
        assert_eq!(mp3(192, Some(15000.0)), Classification::Suspicious);
        // Everything else expects 16000
        assert_eq!(mp3(128, Some(15000.0)), Classification::Legitimate);
        assert_eq!(mp3(96, Some(14500.0)), Classification::Legitimate);
    }

    #[test]
    fn test_mp3_bucket_edges() {
        // 255 kbps lands in the 192 bucket
        assert_eq!(mp3(255, Some(16500.0)), Classification::Legitimate);
        // 319 kbps is not the 320 bucket, so a 17000 cutoff is only suspicious
        assert_eq!(mp3(319, Some(17000.0)), Classification::Suspicious);
    }

    #[test]
    fn test_mp3_missing_bitrate_uses_lowest_bucket() {
        let outcome = detect_mp3(
            &metadata(".mp3", None),
            &features(Some(15000.0), 0.0, -90.0, false),
            &ClassifierThresholds::default(),
        );
        assert_eq!(outcome.classification, Classification::Legitimate);
        assert!(outcome.reason.contains("0 kbps"));
    }

    #[test]
    fn test_mp3_ignores_lossless_evidence() {
        let outcome = detect_mp3(
            &metadata(".mp3", Some(320_000)),
            &features(Some(16000.0), 100.0, -1.0, true),
            &ClassifierThresholds::default(),
        );
        assert_eq!(outcome.classification, Classification::Fake);
    }

    #[test]
    fn test_mp3_320_all_branches_with_narrow_margin() {
        let t = ClassifierThresholds {
            suspicious_margin: 500.0,
            ..ClassifierThresholds::default()
        };
        let run = |cutoff: f64| {
            detect_mp3(
                &metadata(".mp3", Some(320_000)),
                &features(Some(cutoff), 0.0, -90.0, false),
                &t,
            )
        };

        // < 18000: 128k origin
        let o = run(17800.0);
        assert_eq!(o.classification, Classification::Fake);
        assert!(o.reason.contains("128 kbps"));

        // < 19000: 192k origin
        let o = run(18500.0);
        assert_eq!(o.classification, Classification::Fake);
        assert!(o.reason.contains("192 kbps"));

        // < 19500: 256k origin
        let o = run(19200.0);
        assert_eq!(o.classification, Classification::Suspicious);
        assert!(o.reason.contains("256 kbps"));

        // Boundary is lenient
        assert_eq!(run(19500.0).classification, Classification::Legitimate);
    }

    // ==========================================================================
    // LOSSLESS POLICY (FLAC / WAV)
    // ==========================================================================
    //
    // Presence tiers 30 / 15 / 5 percent and the -60 dB energy level are
    // calibration values; these tests pin the current calibration.
    // ==========================================================================

    #[test]
    fn test_lossless_nothing_measurable_is_error() {
        assert_eq!(lossless(None, 0.0, -100.0, false), Classification::Error);
    }

    #[test]
    fn test_lossless_no_cutoff_but_some_presence() {
        assert_eq!(lossless(None, 3.0, -75.0, false), Classification::Suspicious);
        assert_eq!(lossless(None, 40.0, -50.0, false), Classification::Legitimate);
    }

    #[test]
    fn test_lossless_content_above_20k_wins() {
        assert_eq!(lossless(Some(15000.0), 0.0, -95.0, true), Classification::Legitimate);
        assert_eq!(lossless(Some(22050.0), 1.0, -79.0, true), Classification::Legitimate);
    }

    #[test]
    fn test_lossless_high_presence() {
        assert_eq!(lossless(Some(21000.0), 31.0, -70.0, false), Classification::Legitimate);
        // 30 exactly is not above 30: falls to the mixed tier
        assert_eq!(lossless(Some(21000.0), 30.0, -70.0, false), Classification::Suspicious);
    }

    #[test]
    fn test_lossless_mixed_presence_uses_energy() {
        assert_eq!(lossless(Some(20000.0), 20.0, -55.0, false), Classification::Legitimate);
        assert_eq!(lossless(Some(20000.0), 20.0, -65.0, false), Classification::Suspicious);
        // -60 exactly is not above -60
        assert_eq!(lossless(Some(20000.0), 20.0, -60.0, false), Classification::Suspicious);
    }

    #[test]
    fn test_lossless_low_presence_is_suspicious() {
        assert_eq!(lossless(Some(19000.0), 10.0, -40.0, false), Classification::Suspicious);
        assert_eq!(lossless(Some(19000.0), 15.0, -40.0, false), Classification::Suspicious);
    }

    #[test]
    fn test_lossless_negligible_presence() {
        assert_eq!(lossless(Some(15000.0), 2.0, -78.0, false), Classification::Fake);
        assert_eq!(lossless(Some(16499.0), 5.0, -78.0, false), Classification::Fake);
        // 16500 exactly is not below the fake cutoff
        assert_eq!(lossless(Some(16500.0), 5.0, -78.0, false), Classification::Suspicious);
        assert_eq!(lossless(Some(18000.0), 0.0, -80.0, false), Classification::Suspicious);
    }

    #[test]
    fn test_wav_matches_flac() {
        let t = ClassifierThresholds::default();
        for f in [
            features(None, 0.0, -100.0, false),
            features(Some(15000.0), 2.0, -78.0, false),
            features(Some(20000.0), 20.0, -65.0, false),
            features(Some(22050.0), 100.0, -3.0, true),
        ] {
            assert_eq!(detect_wav(&f, &t), detect_flac(&f, &t));
        }
    }

    #[test]
    fn test_lossless_custom_tiers() {
        let t = ClassifierThresholds {
            presence_legitimate: 50.0,
            ..ClassifierThresholds::default()
        };
        let f = features(Some(21000.0), 40.0, -70.0, false);
        assert_eq!(detect_flac(&f, &t).classification, Classification::Suspicious);
        assert_eq!(
            detect_flac(&f, &ClassifierThresholds::default()).classification,
            Classification::Legitimate
        );
    }

    #[test]
    fn test_classification_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Classification::Fake).unwrap(), "\"fake\"");
        assert_eq!(Classification::Suspicious.to_string(), "suspicious");
        let parsed: Classification = serde_json::from_str("\"legitimate\"").unwrap();
        assert_eq!(parsed, Classification::Legitimate);
    }
}
