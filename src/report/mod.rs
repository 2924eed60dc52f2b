//! Report generation for analysis results
//!
//! Every file is flattened into one [`ReportRow`], which is what the writers
//! serialize:
//!
//! - **JSON**: array of rows, absent values as `null`
//! - **CSV**: one line per row, absent values as empty fields
//!
//! # Usage
//!
//! ```ignore
//! use lossprobe::report;
//!
//! // Picks the format from the extension
//! report::generate("report.json", &rows)?;  // JSON
//! report::generate("report.csv", &rows)?;   // CSV
//! ```

pub mod csv;
pub mod json;

use crate::analyzer::AnalysisResult;
use crate::classifier::{Classification, ClassificationOutcome};
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::io;
use std::path::Path;

/// Flat per-file record handed to the writers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportRow {
    pub file_name: String,
    pub file_path: String,
    pub format: String,
    /// Bits per second
    pub bitrate: Option<u32>,
    pub sample_rate: Option<u32>,
    pub channels: Option<u8>,
    /// Seconds
    pub duration: Option<f64>,
    /// Bytes
    pub file_size: u64,
    pub cutoff_frequency: Option<f64>,
    pub high_freq_energy: Option<f64>,
    pub spectral_presence: Option<f64>,
    pub has_content_above_20k: Option<bool>,
    pub dynamic_range: Option<f64>,
    pub classification: Classification,
    pub reason: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ReportRow {
    pub fn new(result: &AnalysisResult, outcome: &ClassificationOutcome) -> Self {
        let features = result.features.as_ref();
        let meta = &result.metadata;

        Self {
            file_name: result.file_name.clone(),
            file_path: result.file_path.clone(),
            format: meta.format.clone(),
            bitrate: meta.bitrate,
            sample_rate: meta.sample_rate,
            channels: meta.channels,
            duration: meta.duration_seconds,
            file_size: meta.file_size_bytes,
            cutoff_frequency: features.and_then(|f| f.cutoff_frequency),
            high_freq_energy: features.map(|f| f.high_freq_energy),
            spectral_presence: features.map(|f| f.spectral_presence),
            has_content_above_20k: features.map(|f| f.has_content_above_20k),
            dynamic_range: features.and_then(|f| f.dynamic_range),
            classification: outcome.classification,
            reason: outcome.reason.clone(),
            error: result.error.clone(),
        }
    }
}

/// Generate a report in the format implied by the file extension
pub fn generate<P: AsRef<Path>>(path: P, rows: &[ReportRow]) -> Result<()> {
    let path = path.as_ref();
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let mut file = io::BufWriter::new(std::fs::File::create(path)?);

    match ext.as_str() {
        "json" => json::write(&mut file, rows)?,
        _ => csv::write(&mut file, rows)?,
    }
    Ok(())
}

/// Classification counts for a batch
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Summary {
    pub total: usize,
    pub legitimate: usize,
    pub suspicious: usize,
    pub fake: usize,
    pub error: usize,
}

impl Summary {
    pub fn from_rows(rows: &[ReportRow]) -> Self {
        let mut summary = Self {
            total: rows.len(),
            ..Self::default()
        };

        for r in rows {
            match r.classification {
                Classification::Legitimate => summary.legitimate += 1,
                Classification::Suspicious => summary.suspicious += 1,
                Classification::Fake => summary.fake += 1,
                Classification::Error => summary.error += 1,
            }
        }

        summary
    }

    /// Share of the batch with `count` files, in percent
    pub fn percent(&self, count: usize) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            100.0 * count as f64 / self.total as f64
        }
    }
}
