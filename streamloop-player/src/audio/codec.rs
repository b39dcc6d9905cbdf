//! Frame decoder seam
//!
//! [`FrameDecoder`] is the narrow contract the playback engine needs from a
//! compressed-audio decoder: open a payload inside a caller-owned arena,
//! report stream parameters, decode frames on request, and reposition.
//!
//! [`DecodeSession`] bundles a decoder with the arena it is bound to. The two
//! are created together, torn down together, and the arena always goes back
//! to the allocator it came from, including when `open` fails.

use crate::audio::arena::{Arena, ArenaAllocator};
use crate::audio::types::{AudioFrame, StreamInfo};
use std::sync::Arc;
use thiserror::Error;

/// Why a decoder could not be opened
#[derive(Error, Debug, Clone, PartialEq)]
pub enum OpenError {
    /// The arena is too small for this payload's decoder state; retrying with
    /// a larger arena may succeed
    #[error("Decoder arena too small")]
    OutOfMemory,

    /// The payload is corrupt or unsupported; retrying cannot help
    #[error("{0}")]
    Fatal(String),
}

/// A reposition request the decoder could not honor
#[derive(Error, Debug, Clone, PartialEq)]
#[error("Seek to frame {frame} failed: {reason}")]
pub struct SeekError {
    pub frame: u64,
    pub reason: String,
}

/// Compressed-audio frame decoder.
///
/// All working storage a decoder needs beyond its own handle lives in the
/// arena passed to each call. Implementations must not keep references into
/// the arena between calls.
pub trait FrameDecoder: Send + Sized {
    /// Open `payload`, laying out working storage in `arena`.
    ///
    /// Returns [`OpenError::OutOfMemory`] when `arena` is too small, which the
    /// caller may answer by retrying with a larger one.
    fn open(payload: Arc<[u8]>, arena: &mut Arena) -> Result<Self, OpenError>;

    /// Channel count and sample rate of the open stream
    fn stream_info(&self) -> StreamInfo;

    /// Total stream length in seconds
    fn total_length_seconds(&self) -> f64;

    /// Decode up to `out.len()` frames into `out`, returning how many were
    /// produced. Fewer than requested means the end of the stream was reached.
    ///
    /// Stereo streams fill both channels. Single-channel streams fill `left`
    /// only; `right` is left unspecified for the produced span.
    fn decode_frames(&mut self, arena: &mut Arena, out: &mut [AudioFrame]) -> usize;

    /// Reposition so the next decoded frame is `frame`
    fn seek_to_frame(&mut self, arena: &mut Arena, frame: u64) -> Result<(), SeekError>;

    /// Release decoder-internal state. The arena itself stays with the caller.
    fn close(&mut self, _arena: &mut Arena) {}
}

/// A decoder handle bound to its own arena.
///
/// Dropping the session closes the decoder and hands the arena back to its
/// allocator, exactly once.
pub struct DecodeSession<D: FrameDecoder> {
    decoder: D,
    arena: Arena,
    allocator: Arc<dyn ArenaAllocator>,
}

impl<D: FrameDecoder> DecodeSession<D> {
    /// Allocate an arena of `arena_size` bytes and open `payload` against it.
    ///
    /// On failure the arena is released before the error is returned.
    pub fn open(
        allocator: Arc<dyn ArenaAllocator>,
        arena_size: usize,
        payload: Arc<[u8]>,
    ) -> Result<Self, OpenError> {
        let mut arena = allocator.allocate(arena_size);
        match D::open(payload, &mut arena) {
            Ok(decoder) => Ok(Self {
                decoder,
                arena,
                allocator,
            }),
            Err(e) => {
                allocator.release(arena);
                Err(e)
            }
        }
    }

    /// Stream parameters reported by the decoder
    pub fn stream_info(&self) -> StreamInfo {
        self.decoder.stream_info()
    }

    /// Total stream length in seconds reported by the decoder
    pub fn total_length_seconds(&self) -> f64 {
        self.decoder.total_length_seconds()
    }

    /// Size of the bound arena in bytes
    pub fn arena_size(&self) -> usize {
        self.arena.size_bytes()
    }

    /// Decode into `out`; see [`FrameDecoder::decode_frames`]
    pub fn decode(&mut self, out: &mut [AudioFrame]) -> usize {
        self.decoder.decode_frames(&mut self.arena, out)
    }

    /// Reposition the decoder; see [`FrameDecoder::seek_to_frame`]
    pub fn seek(&mut self, frame: u64) -> Result<(), SeekError> {
        self.decoder.seek_to_frame(&mut self.arena, frame)
    }
}

impl<D: FrameDecoder> Drop for DecodeSession<D> {
    fn drop(&mut self) {
        self.decoder.close(&mut self.arena);
        // A zero-length boxed slice does not allocate
        let arena = std::mem::replace(&mut self.arena, Arena::with_size(0));
        self.allocator.release(arena);
    }
}
