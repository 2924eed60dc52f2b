//! Container metadata
//!
//! Reads what the container declares (bitrate, sample rate, channels,
//! duration) without decoding audio. Every field is best-effort: a reader
//! that can't recover a value leaves it `None`. Only the file size and the
//! extension-derived format are always present.

use crate::mp3;
use lofty::prelude::*;
use lofty::probe::Probe;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Cursor;
use std::path::Path;
use tracing::debug;

/// Frames read by the MP3 bitrate fallback
const MP3_PROBE_FRAMES: usize = 200;

/// Audio bytes (after any ID3v2 tag) the MP3 bitrate fallback looks at
const MP3_PROBE_BYTES: u64 = 1 << 20;

/// Container formats with a classification policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AudioFormat {
    Mp3,
    Flac,
    Wav,
}

impl AudioFormat {
    /// Map an extension (`.mp3`, `mp3`, `.MP3`) to a supported format
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.trim_start_matches('.').to_ascii_lowercase().as_str() {
            "mp3" => Some(AudioFormat::Mp3),
            "flac" => Some(AudioFormat::Flac),
            "wav" => Some(AudioFormat::Wav),
            _ => None,
        }
    }
}

/// Stream properties as reported by a metadata reader
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrackProperties {
    /// Bits per second
    pub bitrate: Option<u32>,
    pub sample_rate: Option<u32>,
    pub channels: Option<u8>,
    pub duration_seconds: Option<f64>,
}

/// Reads declared stream properties. Never fails: unreadable fields are `None`.
pub trait MetadataReader: Send + Sync {
    fn read(&self, path: &Path) -> TrackProperties;
}

/// Metadata reader backed by lofty
#[derive(Debug, Clone, Copy, Default)]
pub struct LoftyReader;

impl MetadataReader for LoftyReader {
    fn read(&self, path: &Path) -> TrackProperties {
        let tagged_file = match Probe::open(path).and_then(|probe| probe.read()) {
            Ok(f) => f,
            Err(e) => {
                debug!(file = %path.display(), error = %e, "No container metadata");
                return TrackProperties::default();
            }
        };

        let properties = tagged_file.properties();
        let duration = properties.duration().as_secs_f64();

        TrackProperties {
            // lofty reports kbps
            bitrate: properties.audio_bitrate().filter(|&b| b > 0).map(|kbps| kbps * 1000),
            sample_rate: properties.sample_rate().filter(|&r| r > 0),
            channels: properties.channels().filter(|&c| c > 0),
            duration_seconds: (duration > 0.0).then_some(duration),
        }
    }
}

/// Declared properties of one file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContainerMetadata {
    /// Lower-cased extension with leading dot, e.g. `.flac`
    pub format: String,
    /// Bits per second
    pub bitrate: Option<u32>,
    pub sample_rate: Option<u32>,
    pub channels: Option<u8>,
    pub duration_seconds: Option<f64>,
    pub file_size_bytes: u64,
}

impl ContainerMetadata {
    pub fn audio_format(&self) -> Option<AudioFormat> {
        AudioFormat::from_extension(&self.format)
    }
}

/// Lower-cased extension including the dot; empty when there is none
pub fn format_of(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{}", e.to_ascii_lowercase()))
        .unwrap_or_default()
}

/// Gather container metadata for `path`
pub fn probe(path: &Path, reader: &dyn MetadataReader) -> ContainerMetadata {
    let format = format_of(path);
    let file_size_bytes = std::fs::metadata(path).map(|m| m.len()).unwrap_or(0);

    let mut props = reader.read(path);

    if AudioFormat::from_extension(&format) == Some(AudioFormat::Mp3) && props.bitrate.is_none() {
        fill_from_frames(path, &mut props);
    }

    ContainerMetadata {
        format,
        bitrate: props.bitrate,
        sample_rate: props.sample_rate,
        channels: props.channels,
        duration_seconds: props.duration_seconds,
        file_size_bytes,
    }
}

/// Fill missing MP3 fields from the frame headers
fn fill_from_frames(path: &Path, props: &mut TrackProperties) {
    let info = File::open(path)
        .and_then(|mut file| mp3::read_leading(&mut file, MP3_PROBE_BYTES))
        .and_then(|data| mp3::probe_stream(&mut Cursor::new(data), MP3_PROBE_FRAMES));

    match info {
        Ok(Some(info)) => {
            debug!(
                file = %path.display(),
                bitrate = info.avg_bitrate,
                frames = info.frames_scanned,
                vbr = info.is_vbr,
                "Bitrate taken from MP3 frame headers"
            );
            props.bitrate = Some(info.avg_bitrate);
            props.sample_rate.get_or_insert(info.sample_rate);
            props.channels.get_or_insert(info.channels);
        }
        Ok(None) => debug!(file = %path.display(), "No MP3 frames found"),
        Err(e) => debug!(file = %path.display(), error = %e, "MP3 frame scan failed"),
    }
}
