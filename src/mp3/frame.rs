//! MPEG audio frame headers
//!
//! Every frame starts with a 4-byte header:
//!
//! ```text
//! AAAAAAAA AAABBCCD EEEEFFGH IIJJKLMM
//!
//! A  sync word, 11 bits set
//! B  version: 00=2.5, 10=2, 11=1 (01 reserved)
//! C  layer: 01=III, 10=II, 11=I (00 reserved)
//! E  bitrate index
//! F  sample rate index
//! G  padding
//! I  channel mode (11 = mono)
//! ```
//!
//! Everything else in the header is irrelevant to the probe.

use std::io::{self, Read, Seek, SeekFrom};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Version {
    V1,
    V2,
    V25,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Layer {
    I,
    II,
    III,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelMode {
    Stereo,
    JointStereo,
    DualChannel,
    Mono,
}

impl ChannelMode {
    pub fn channels(self) -> u8 {
        match self {
            ChannelMode::Mono => 1,
            _ => 2,
        }
    }
}

/// Fields of one frame header relevant to metadata
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    /// Bits per second
    pub bitrate: u32,
    pub sample_rate: u32,
    pub channel_mode: ChannelMode,
    /// Total frame length in bytes, header included
    pub frame_length: u32,
}

// kbps by bitrate index; 0 = free format or invalid
const KBPS_V1_L1: [u32; 16] = [0, 32, 64, 96, 128, 160, 192, 224, 256, 288, 320, 352, 384, 416, 448, 0];
const KBPS_V1_L2: [u32; 16] = [0, 32, 48, 56, 64, 80, 96, 112, 128, 160, 192, 224, 256, 320, 384, 0];
const KBPS_V1_L3: [u32; 16] = [0, 32, 40, 48, 56, 64, 80, 96, 112, 128, 160, 192, 224, 256, 320, 0];
const KBPS_V2_L1: [u32; 16] = [0, 32, 48, 56, 64, 80, 96, 112, 128, 144, 160, 176, 192, 224, 256, 0];
const KBPS_V2_L23: [u32; 16] = [0, 8, 16, 24, 32, 40, 48, 56, 64, 80, 96, 112, 128, 144, 160, 0];

const RATES_V1: [u32; 4] = [44100, 48000, 32000, 0];
const RATES_V2: [u32; 4] = [22050, 24000, 16000, 0];
const RATES_V25: [u32; 4] = [11025, 12000, 8000, 0];

impl FrameHeader {
    /// Parse a header, returning `None` for anything that isn't a usable frame
    pub fn parse(bytes: [u8; 4]) -> Option<Self> {
        if bytes[0] != 0xFF || bytes[1] & 0xE0 != 0xE0 {
            return None;
        }

        let version = match (bytes[1] >> 3) & 0b11 {
            0b00 => Version::V25,
            0b10 => Version::V2,
            0b11 => Version::V1,
            _ => return None,
        };

        let layer = match (bytes[1] >> 1) & 0b11 {
            0b01 => Layer::III,
            0b10 => Layer::II,
            0b11 => Layer::I,
            _ => return None,
        };

        let table = match (version, layer) {
            (Version::V1, Layer::I) => &KBPS_V1_L1,
            (Version::V1, Layer::II) => &KBPS_V1_L2,
            (Version::V1, Layer::III) => &KBPS_V1_L3,
            (_, Layer::I) => &KBPS_V2_L1,
            (_, _) => &KBPS_V2_L23,
        };
        let kbps = table[(bytes[2] >> 4) as usize];
        if kbps == 0 {
            return None;
        }

        let rates = match version {
            Version::V1 => &RATES_V1,
            Version::V2 => &RATES_V2,
            Version::V25 => &RATES_V25,
        };
        let sample_rate = rates[((bytes[2] >> 2) & 0b11) as usize];
        if sample_rate == 0 {
            return None;
        }

        let padding = u32::from(bytes[2] & 0b10 != 0);

        let channel_mode = match bytes[3] >> 6 {
            0b00 => ChannelMode::Stereo,
            0b01 => ChannelMode::JointStereo,
            0b10 => ChannelMode::DualChannel,
            _ => ChannelMode::Mono,
        };

        let bitrate = kbps * 1000;
        let frame_length = match (version, layer) {
            (_, Layer::I) => (12 * bitrate / sample_rate + padding) * 4,
            (Version::V1, _) | (_, Layer::II) => 144 * bitrate / sample_rate + padding,
            // MPEG-2/2.5 layer III frames carry half the samples
            (_, Layer::III) => 72 * bitrate / sample_rate + padding,
        };

        Some(FrameHeader {
            bitrate,
            sample_rate,
            channel_mode,
            frame_length,
        })
    }
}

/// Summary of the frames seen by [`probe_stream`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamInfo {
    /// Mean bitrate over the scanned frames (bits per second)
    pub avg_bitrate: u32,
    pub sample_rate: u32,
    pub channels: u8,
    pub frames_scanned: usize,
    pub is_vbr: bool,
}

/// Size of an ID3v2 tag at the start of the stream, 0 if there is none
fn id3v2_length<R: Read + Seek>(reader: &mut R) -> io::Result<u64> {
    let mut header = [0u8; 10];
    reader.seek(SeekFrom::Start(0))?;
    match reader.read_exact(&mut header) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(0),
        Err(e) => return Err(e),
    }

    if &header[..3] != b"ID3" {
        return Ok(0);
    }

    // Syncsafe integer: 7 bits per byte
    let size = header[6..10]
        .iter()
        .fold(0u64, |acc, &b| (acc << 7) | u64::from(b & 0x7F));
    Ok(10 + size)
}

/// Read the ID3v2 tag (if any) plus at most `audio_bytes` after it.
///
/// [`probe_stream`] resyncs one byte at a time, so it should run over an
/// in-memory prefix rather than a file.
pub fn read_leading<R: Read + Seek>(reader: &mut R, audio_bytes: u64) -> io::Result<Vec<u8>> {
    let tag = id3v2_length(reader)?;
    reader.seek(SeekFrom::Start(0))?;

    let mut data = Vec::new();
    reader.by_ref().take(tag.saturating_add(audio_bytes)).read_to_end(&mut data)?;
    Ok(data)
}

/// Walk up to `max_frames` frame headers and summarize them.
///
/// Returns `Ok(None)` when no valid frame is found.
pub fn probe_stream<R: Read + Seek>(reader: &mut R, max_frames: usize) -> io::Result<Option<StreamInfo>> {
    let start = id3v2_length(reader)?;
    reader.seek(SeekFrom::Start(start))?;

    let mut first: Option<FrameHeader> = None;
    let mut bitrate_sum = 0u64;
    let mut frames = 0usize;
    let mut is_vbr = false;
    let mut buf = [0u8; 4];

    while frames < max_frames {
        match reader.read_exact(&mut buf) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => break,
            Err(e) => return Err(e),
        }

        match FrameHeader::parse(buf) {
            Some(header) => {
                if let Some(ref f) = first {
                    is_vbr |= f.bitrate != header.bitrate;
                } else {
                    first = Some(header);
                }
                bitrate_sum += u64::from(header.bitrate);
                frames += 1;

                if header.frame_length > 4 {
                    reader.seek(SeekFrom::Current(i64::from(header.frame_length) - 4))?;
                }
            }
            // Not a header: slide forward one byte
            None => {
                reader.seek(SeekFrom::Current(-3))?;
            }
        }
    }

    Ok(first.map(|f| StreamInfo {
        avg_bitrate: (bitrate_sum / frames as u64) as u32,
        sample_rate: f.sample_rate,
        channels: f.channel_mode.channels(),
        frames_scanned: frames,
        is_vbr,
    }))
}
