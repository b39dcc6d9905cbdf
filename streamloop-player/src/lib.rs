//! # streamloop player library (streamloop-player)
//!
//! Streaming playback of compressed, block-based VBR audio into a continuous
//! interleaved stereo buffer, with seeking and sample-accurate loop regions.
//!
//! **Architecture:**
//! - [`playback::stream::StreamDescriptor`] owns the compressed payload and its
//!   metadata, and discovers the smallest decoder arena the payload needs.
//! - [`playback::cursor::PlaybackCursor`] is one playback session: its own
//!   arena and decoder handle, driven by the host's audio callback through
//!   [`playback::cursor::PlaybackCursor::mix`].
//! - [`audio::codec::FrameDecoder`] is the seam to the frame decoder; the
//!   default backend is [`audio::symphonia_codec::SymphoniaDecoder`].

pub mod audio;
pub mod config;
pub mod error;
pub mod playback;

pub use audio::arena::{Arena, ArenaAllocator, HeapAllocator};
pub use audio::codec::FrameDecoder;
pub use audio::types::AudioFrame;
pub use error::{DecodeError, Error, Result};
pub use playback::cursor::PlaybackCursor;
pub use playback::stream::StreamDescriptor;
