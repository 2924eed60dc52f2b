//! Per-file analysis
//!
//! The [`Analyzer`] runs the pipeline for one file:
//!
//! ```text
//! path ──► metadata::probe ──────────────────────┐
//!      └─► decoder ──► spectral::extract ────────┴─► AnalysisResult ──► classifier
//! ```
//!
//! It never returns an error. A file that can't be decoded still yields a
//! result: metadata is kept, features are absent, and `error` says why.

pub mod decode;
pub mod metadata;
pub mod spectral;

use crate::classifier::{self, ClassificationOutcome};
use crate::config::Config;
use decode::{AudioDecoder, SymphoniaDecoder};
use metadata::{ContainerMetadata, LoftyReader, MetadataReader};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use spectral::SpectralFeatures;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Everything measured about one file. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub file_path: String,
    pub file_name: String,
    pub metadata: ContainerMetadata,
    /// `None` when decoding failed
    pub features: Option<SpectralFeatures>,
    /// Set when the file could not be analyzed; forces an `error` verdict
    pub error: Option<String>,
}

pub struct Analyzer {
    config: Config,
    decoder: Box<dyn AudioDecoder>,
    metadata_reader: Box<dyn MetadataReader>,
}

impl Default for Analyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl Analyzer {
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    pub fn with_config(config: Config) -> Self {
        Self {
            config,
            decoder: Box::new(SymphoniaDecoder),
            metadata_reader: Box::new(LoftyReader),
        }
    }

    /// Replace the audio decoder
    pub fn with_decoder(mut self, decoder: impl AudioDecoder + 'static) -> Self {
        self.decoder = Box::new(decoder);
        self
    }

    /// Replace the container metadata reader
    pub fn with_metadata_reader(mut self, reader: impl MetadataReader + 'static) -> Self {
        self.metadata_reader = Box::new(reader);
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Probe metadata, decode the leading window and extract features
    pub fn analyze<P: AsRef<Path>>(&self, path: P) -> AnalysisResult {
        let path = path.as_ref();
        let file_path = path.display().to_string();
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| file_path.clone());

        let metadata = metadata::probe(path, self.metadata_reader.as_ref());
        debug!(
            file = %file_path,
            format = %metadata.format,
            bitrate = ?metadata.bitrate,
            sample_rate = ?metadata.sample_rate,
            "Probed metadata"
        );

        let analysis = &self.config.analysis;
        let buffer = match self
            .decoder
            .decode(path, analysis.target_sample_rate, analysis.duration_seconds)
        {
            Ok(b) => b,
            Err(e) => {
                warn!(file = %file_path, error = %e, "Could not decode audio");
                return AnalysisResult {
                    file_path,
                    file_name,
                    metadata,
                    features: None,
                    error: Some(e.to_string()),
                };
            }
        };

        let features = spectral::extract(&buffer.samples, buffer.sample_rate, analysis);
        debug!(
            file = %file_path,
            seconds = buffer.duration_seconds(),
            cutoff = ?features.cutoff_frequency,
            pass = ?features.cutoff_pass,
            hf_energy = features.high_freq_energy,
            presence = features.spectral_presence,
            above_20k = features.has_content_above_20k,
            dynamic_range = ?features.dynamic_range,
            "Extracted spectral features"
        );

        AnalysisResult {
            file_path,
            file_name,
            metadata,
            features: Some(features),
            error: None,
        }
    }

    /// Classify a result with this analyzer's thresholds
    pub fn classify(&self, result: &AnalysisResult) -> ClassificationOutcome {
        classifier::classify(result, &self.config.thresholds)
    }

    /// Analyze and classify one file
    pub fn evaluate<P: AsRef<Path>>(&self, path: P) -> (AnalysisResult, ClassificationOutcome) {
        let result = self.analyze(path);
        let outcome = self.classify(&result);
        (result, outcome)
    }

    /// Evaluate many files in parallel. Output order matches input order.
    pub fn evaluate_batch(&self, paths: &[PathBuf]) -> Vec<(AnalysisResult, ClassificationOutcome)> {
        self.evaluate_batch_with(paths, |_, _| {})
    }

    /// Like [`evaluate_batch`](Self::evaluate_batch), calling `on_done` as each
    /// file finishes (from worker threads, in completion order)
    pub fn evaluate_batch_with<F>(&self, paths: &[PathBuf], on_done: F) -> Vec<(AnalysisResult, ClassificationOutcome)>
    where
        F: Fn(&AnalysisResult, &ClassificationOutcome) + Sync,
    {
        info!(files = paths.len(), "Starting batch");
        let started = std::time::Instant::now();

        let evaluated: Vec<_> = paths
            .par_iter()
            .map(|path| {
                let (result, outcome) = self.evaluate(path);
                on_done(&result, &outcome);
                (result, outcome)
            })
            .collect();

        info!(
            files = evaluated.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Batch complete"
        );
        evaluated
    }
}
