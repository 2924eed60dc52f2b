//! MPEG audio stream inspection
//!
//! Tag readers don't always report a bitrate for MP3 files (missing Xing
//! header, odd tagging). The frame headers themselves always carry one, so
//! [`probe_stream`] reads them directly from a bounded prefix ([`read_leading`]).

pub mod frame;

pub use frame::{probe_stream, read_leading, ChannelMode, FrameHeader, StreamInfo};
