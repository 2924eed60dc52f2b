//! Audio decoding
//!
//! Produces the mono, fixed-rate buffer the spectral extractor consumes.
//! Only the leading `max_duration_seconds` of a file are decoded. Files at a
//! different native rate are resampled so every file is analyzed on the same
//! frequency grid.

use crate::error::{Error, Result};
use rubato::{Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction};
use std::fs::File;
use std::io;
use std::path::Path;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::{debug, warn};

/// Mono PCM samples at a constant sample rate
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl AudioBuffer {
    pub fn duration_seconds(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / self.sample_rate as f64
    }
}

/// Source of decoded audio for the analyzer
pub trait AudioDecoder: Send + Sync {
    /// Decode at most `max_duration_seconds` of `path` into mono samples at
    /// `target_sample_rate`
    fn decode(&self, path: &Path, target_sample_rate: u32, max_duration_seconds: f64) -> Result<AudioBuffer>;
}

/// Decoder backed by symphonia (MP3, FLAC, WAV, OGG, ...)
#[derive(Debug, Clone, Copy, Default)]
pub struct SymphoniaDecoder;

impl AudioDecoder for SymphoniaDecoder {
    fn decode(&self, path: &Path, target_sample_rate: u32, max_duration_seconds: f64) -> Result<AudioBuffer> {
        let file = File::open(path).map_err(|e| Error::Decode(format!("{}: {}", path.display(), e)))?;
        let (samples, native_rate) = decode_mono(file, path, max_duration_seconds)?;

        let samples = if native_rate != target_sample_rate {
            debug!(
                file = %path.display(),
                from = native_rate,
                to = target_sample_rate,
                "Resampling decoded audio"
            );
            resample(samples, native_rate, target_sample_rate)?
        } else {
            samples
        };

        Ok(AudioBuffer {
            samples,
            sample_rate: target_sample_rate,
        })
    }
}

/// Decode the leading window of `file`, downmixed to mono at the native rate
fn decode_mono(file: File, path: &Path, max_duration_seconds: f64) -> Result<(Vec<f32>, u32)> {
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .map_err(|e| Error::Decode(format!("unrecognized container: {}", e)))?;

    let mut format = probed.format;
    let track = format
        .default_track()
        .ok_or_else(|| Error::Decode("no audio track".to_string()))?;
    let track_id = track.id;
    let sample_rate = track
        .codec_params
        .sample_rate
        .ok_or_else(|| Error::Decode("unknown sample rate".to_string()))?;

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| Error::Decode(format!("unsupported codec: {}", e)))?;

    let max_samples = (max_duration_seconds * sample_rate as f64).ceil() as usize;
    let mut samples: Vec<f32> = Vec::with_capacity(max_samples.min(sample_rate as usize * 60));
    let mut sample_buf: Option<SampleBuffer<f32>> = None;
    let mut buf_frames = 0u64;

    while samples.len() < max_samples {
        let packet = match format.next_packet() {
            Ok(p) => p,
            Err(SymphoniaError::IoError(e)) if e.kind() == io::ErrorKind::UnexpectedEof => break,
            Err(SymphoniaError::ResetRequired) => break,
            Err(e) if samples.is_empty() => {
                return Err(Error::Decode(format!("reading packets: {}", e)));
            }
            Err(e) => {
                warn!(file = %path.display(), error = %e, "Stopped reading early");
                break;
            }
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(d) => d,
            // Corrupt frame: skip it, the rest of the stream may be fine
            Err(SymphoniaError::DecodeError(e)) => {
                debug!(file = %path.display(), error = e, "Skipping undecodable packet");
                continue;
            }
            Err(e) if samples.is_empty() => return Err(Error::Decode(e.to_string())),
            Err(e) => {
                warn!(file = %path.display(), error = %e, "Stopped decoding early");
                break;
            }
        };

        let channel_count = decoded.spec().channels.count().max(1);
        let frames = decoded.capacity() as u64;
        if sample_buf.is_none() || frames > buf_frames {
            sample_buf = Some(SampleBuffer::new(frames, *decoded.spec()));
            buf_frames = frames;
        }

        if let Some(ref mut buf) = sample_buf {
            buf.copy_interleaved_ref(decoded);

            for frame in buf.samples().chunks(channel_count) {
                let mono = frame.iter().sum::<f32>() / channel_count as f32;
                samples.push(mono);
            }
        }
    }

    samples.truncate(max_samples);

    if samples.is_empty() {
        return Err(Error::Decode("no audio samples decoded".to_string()));
    }

    Ok((samples, sample_rate))
}

/// Resample a mono buffer with a sinc interpolator
fn resample(samples: Vec<f32>, from_rate: u32, to_rate: u32) -> Result<Vec<f32>> {
    if samples.is_empty() || from_rate == to_rate {
        return Ok(samples);
    }

    let params = SincInterpolationParameters {
        sinc_len: 256,
        f_cutoff: 0.95,
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 256,
        window: WindowFunction::BlackmanHarris2,
    };

    let ratio = to_rate as f64 / from_rate as f64;
    let num_frames = samples.len();

    let mut resampler = SincFixedIn::<f32>::new(ratio, 2.0, params, num_frames, 1)
        .map_err(|e| Error::Decode(format!("resampler setup failed: {}", e)))?;

    let input = vec![samples];
    let mut output = resampler
        .process(&input, None)
        .map_err(|e| Error::Decode(format!("resampling failed: {}", e)))?;

    Ok(output.pop().unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_wav(path: &Path, sample_rate: u32, channels: u16, frames: usize) {
        let spec = hound::WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        for i in 0..frames {
            let t = i as f64 / sample_rate as f64;
            let v = (0.5 * (2.0 * std::f64::consts::PI * 440.0 * t).sin() * i16::MAX as f64) as i16;
            for _ in 0..channels {
                writer.write_sample(v).unwrap();
            }
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn test_decode_wav_at_native_rate() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tone.wav");
        write_wav(&path, 44100, 2, 44100);

        let buffer = SymphoniaDecoder.decode(&path, 44100, 30.0).unwrap();
        assert_eq!(buffer.sample_rate, 44100);
        assert_eq!(buffer.samples.len(), 44100);
        assert!(buffer.samples.iter().all(|s| s.abs() <= 0.51));
        assert!((buffer.duration_seconds() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_decode_limits_duration() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("long.wav");
        write_wav(&path, 8000, 1, 8000 * 3);

        let buffer = SymphoniaDecoder.decode(&path, 8000, 1.5).unwrap();
        assert_eq!(buffer.samples.len(), 12000);
    }

    #[test]
    fn test_decode_resamples_to_target() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tone48k.wav");
        write_wav(&path, 48000, 1, 48000);

        let buffer = SymphoniaDecoder.decode(&path, 44100, 30.0).unwrap();
        assert_eq!(buffer.sample_rate, 44100);
        let expected = 44100.0;
        let got = buffer.samples.len() as f64;
        assert!((got - expected).abs() / expected < 0.02, "got {} samples", got);
    }

    #[test]
    fn test_decode_missing_file() {
        let err = SymphoniaDecoder
            .decode(Path::new("/nonexistent/file.flac"), 44100, 30.0)
            .unwrap_err();
        assert!(matches!(err, Error::Decode(_)));
    }

    #[test]
    fn test_decode_garbage_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("garbage.mp3");
        std::fs::write(&path, b"definitely not audio data at all").unwrap();

        let err = SymphoniaDecoder.decode(&path, 44100, 30.0).unwrap_err();
        assert!(matches!(err, Error::Decode(_)));
    }

    #[test]
    fn test_resample_passthrough() {
        let samples = vec![0.1, 0.2, 0.3];
        assert_eq!(resample(samples.clone(), 44100, 44100).unwrap(), samples);
        assert!(resample(vec![], 48000, 44100).unwrap().is_empty());
    }
}
