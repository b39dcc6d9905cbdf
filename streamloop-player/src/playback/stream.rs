//! Stream descriptor: one compressed asset and its derived metadata
//!
//! A [`StreamDescriptor`] owns the compressed payload and everything derived
//! from it at ingest time: channel count, sample rate, total length, the loop
//! region, and the decoder arena size every playback cursor will use.
//!
//! # Ingest
//!
//! [`StreamDescriptor::set_payload`] runs the arena capacity probe: a throwaway
//! decoder is opened against arenas of growing size until one is large enough
//! (see [`crate::playback::capacity`]). Only a successful open commits
//! anything; on failure the descriptor keeps its previous payload and
//! metadata.
//!
//! # Sharing
//!
//! Cursors are created from an `Arc<StreamDescriptor>` and keep that `Arc`.
//! The descriptor is read-only while shared; edit it through `Arc::make_mut`
//! (or before sharing). Edits made that way apply to cursors created
//! afterwards, while running cursors keep the snapshot they started with.

use crate::audio::arena::{ArenaAllocator, HeapAllocator};
use crate::audio::codec::{DecodeSession, FrameDecoder, OpenError};
use crate::audio::symphonia_codec::SymphoniaDecoder;
use crate::error::DecodeError;
use crate::playback::capacity::{find_minimal_capacity, CapacityError, ProbeError, ProbeLimits};
use crate::playback::cursor::PlaybackCursor;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use streamloop_common::time::seconds_to_frames;
use tracing::{debug, info, warn};

/// Persisted loop properties of a stream.
///
/// Restore these after the payload: loop points clamp to the stream length,
/// which is only known once a payload has been ingested.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LoopSettings {
    /// Loop playback between `loop_begin` and `loop_end`
    #[serde(rename = "loop", default = "default_loop_enabled")]
    pub enabled: bool,

    /// Loop start in seconds
    #[serde(default)]
    pub loop_begin: f64,

    /// Loop end in seconds (0 = end of stream)
    #[serde(default)]
    pub loop_end: f64,
}

fn default_loop_enabled() -> bool {
    true
}

impl Default for LoopSettings {
    fn default() -> Self {
        Self {
            enabled: default_loop_enabled(),
            loop_begin: 0.0,
            loop_end: 0.0,
        }
    }
}

/// Compressed asset plus derived metadata, shared by its playback cursors
pub struct StreamDescriptor<D = SymphoniaDecoder> {
    allocator: Arc<dyn ArenaAllocator>,
    probe_limits: ProbeLimits,

    payload: Option<Arc<[u8]>>,
    channel_count: u16,
    sample_rate: u32,
    length: f64,

    loop_enabled: bool,
    loop_begin: f64,
    loop_begin_frames: u64,
    loop_end: f64,
    loop_end_frames: u64,

    /// Smallest arena the payload opened in; reused by every cursor
    decode_arena_size: usize,

    _decoder: PhantomData<fn() -> D>,
}

impl<D: FrameDecoder> StreamDescriptor<D> {
    /// Create an empty descriptor drawing decoder arenas from `allocator`
    pub fn new(allocator: Arc<dyn ArenaAllocator>) -> Self {
        Self {
            allocator,
            probe_limits: ProbeLimits::default(),
            payload: None,
            channel_count: 1,
            sample_rate: 1,
            length: 0.0,
            loop_enabled: true,
            loop_begin: 0.0,
            loop_begin_frames: 0,
            loop_end: 0.0,
            loop_end_frames: 0,
            decode_arena_size: 0,
            _decoder: PhantomData,
        }
    }

    /// Replace the arena probe bounds used by later `set_payload` calls
    pub fn with_probe_limits(mut self, limits: ProbeLimits) -> Self {
        self.probe_limits = limits;
        self
    }

    /// Ingest a compressed payload.
    ///
    /// Probes for the smallest arena the decoder opens in, reads channel
    /// count, sample rate and length from it, and takes a copy of `data`.
    /// Runs from scratch on every call.
    ///
    /// # Errors
    /// - [`DecodeError::InvalidPayload`] when the decoder rejects the bytes
    /// - [`DecodeError::ArenaExhausted`] when no arena up to the probe ceiling
    ///   is large enough
    ///
    /// On error nothing is committed.
    pub fn set_payload(&mut self, data: &[u8]) -> Result<(), DecodeError> {
        let payload: Arc<[u8]> = Arc::from(data);
        let allocator = Arc::clone(&self.allocator);

        let probed = find_minimal_capacity(self.probe_limits, |size| {
            debug!("Probing decoder arena of {} bytes", size);
            DecodeSession::<D>::open(Arc::clone(&allocator), size, Arc::clone(&payload)).map_err(
                |e| match e {
                    OpenError::OutOfMemory => ProbeError::Insufficient,
                    OpenError::Fatal(reason) => ProbeError::Fatal(reason),
                },
            )
        });

        let (arena_size, session) = match probed {
            Ok(found) => found,
            Err(CapacityError::Exhausted { ceiling_bytes }) => {
                warn!("Payload rejected: no arena up to {} bytes suffices", ceiling_bytes);
                return Err(DecodeError::ArenaExhausted { ceiling_bytes });
            }
            Err(CapacityError::Fatal { error, .. }) => {
                warn!("Payload rejected: {}", error);
                return Err(DecodeError::InvalidPayload(error));
            }
        };

        let stream_info = session.stream_info();
        let length = session.total_length_seconds();
        drop(session);

        if stream_info.sample_rate == 0 || !length.is_finite() || length < 0.0 {
            return Err(DecodeError::InvalidPayload(format!(
                "decoder reported sample_rate={} length={}",
                stream_info.sample_rate, length
            )));
        }

        self.payload = Some(payload);
        self.channel_count = stream_info.channel_count;
        self.sample_rate = stream_info.sample_rate;
        self.length = length;
        self.decode_arena_size = arena_size;

        // Loop points set against a previous payload may lie past the new end
        let loop_end_unset = self.loop_end == 0.0;
        self.loop_begin = self.loop_begin.min(length);
        self.loop_end = if loop_end_unset {
            length
        } else {
            self.loop_end.max(self.loop_begin).min(length)
        };
        self.update_loop_frames();

        info!(
            "Ingested {} byte payload: {} ch @ {} Hz, {:.3}s, decoder arena {} bytes",
            data.len(),
            self.channel_count,
            self.sample_rate,
            self.length,
            self.decode_arena_size
        );
        Ok(())
    }

    /// Create a playback cursor with its own arena and decoder handle.
    ///
    /// # Errors
    /// [`DecodeError::InitFailed`] when no payload is set or the decoder
    /// cannot be opened; no resources are left allocated in that case.
    pub fn create_playback(self: &Arc<Self>) -> Result<PlaybackCursor<D>, DecodeError> {
        PlaybackCursor::new(Arc::clone(self))
    }
}

impl<D> StreamDescriptor<D> {
    /// Compressed payload bytes (empty when none is set)
    pub fn get_payload(&self) -> &[u8] {
        self.payload.as_deref().unwrap_or(&[])
    }

    /// True once a payload has been ingested
    pub fn has_payload(&self) -> bool {
        self.payload.is_some()
    }

    pub fn set_loop(&mut self, enabled: bool) {
        self.loop_enabled = enabled;
    }

    pub fn has_loop(&self) -> bool {
        self.loop_enabled
    }

    /// Set the loop start, clamped to `[0, length]`.
    ///
    /// Moving the start past the current loop end drags the end along.
    pub fn set_loop_begin(&mut self, seconds: f64) {
        self.loop_begin = seconds.max(0.0).min(self.length);
        if self.loop_end < self.loop_begin {
            self.loop_end = self.loop_begin;
        }
        self.update_loop_frames();
    }

    pub fn get_loop_begin(&self) -> f64 {
        self.loop_begin
    }

    /// Set the loop end, clamped to `[loop_begin, length]`
    pub fn set_loop_end(&mut self, seconds: f64) {
        self.loop_end = seconds.max(self.loop_begin).min(self.length);
        self.update_loop_frames();
    }

    pub fn get_loop_end(&self) -> f64 {
        self.loop_end
    }

    pub fn loop_begin_frames(&self) -> u64 {
        self.loop_begin_frames
    }

    pub fn loop_end_frames(&self) -> u64 {
        self.loop_end_frames
    }

    /// Current loop properties, for persistence
    pub fn loop_settings(&self) -> LoopSettings {
        LoopSettings {
            enabled: self.loop_enabled,
            loop_begin: self.loop_begin,
            loop_end: self.loop_end,
        }
    }

    /// Apply persisted loop properties. A `loop_end` of 0 means end of stream.
    pub fn apply_loop_settings(&mut self, settings: &LoopSettings) {
        self.set_loop(settings.enabled);
        self.set_loop_begin(settings.loop_begin);
        if settings.loop_end == 0.0 {
            self.set_loop_end(self.length);
        } else {
            self.set_loop_end(settings.loop_end);
        }
    }

    /// Total stream length in seconds
    pub fn get_length_seconds(&self) -> f64 {
        self.length
    }

    pub fn channel_count(&self) -> u16 {
        self.channel_count
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Arena size in bytes discovered at ingest (0 before any payload)
    pub fn decode_arena_size(&self) -> usize {
        self.decode_arena_size
    }

    pub(crate) fn allocator(&self) -> Arc<dyn ArenaAllocator> {
        Arc::clone(&self.allocator)
    }

    pub(crate) fn payload(&self) -> Option<Arc<[u8]>> {
        self.payload.clone()
    }

    fn update_loop_frames(&mut self) {
        self.loop_begin_frames = seconds_to_frames(self.loop_begin, self.sample_rate);
        self.loop_end_frames = seconds_to_frames(self.loop_end, self.sample_rate);
    }
}

impl<D: FrameDecoder> Default for StreamDescriptor<D> {
    fn default() -> Self {
        Self::new(Arc::new(HeapAllocator))
    }
}

// Manual impl: cloning never needs `D: Clone`
impl<D> Clone for StreamDescriptor<D> {
    fn clone(&self) -> Self {
        Self {
            allocator: Arc::clone(&self.allocator),
            probe_limits: self.probe_limits,
            payload: self.payload.clone(),
            channel_count: self.channel_count,
            sample_rate: self.sample_rate,
            length: self.length,
            loop_enabled: self.loop_enabled,
            loop_begin: self.loop_begin,
            loop_begin_frames: self.loop_begin_frames,
            loop_end: self.loop_end,
            loop_end_frames: self.loop_end_frames,
            decode_arena_size: self.decode_arena_size,
            _decoder: PhantomData,
        }
    }
}

impl<D> fmt::Debug for StreamDescriptor<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamDescriptor")
            .field("payload_bytes", &self.get_payload().len())
            .field("channel_count", &self.channel_count)
            .field("sample_rate", &self.sample_rate)
            .field("length", &self.length)
            .field("loop_enabled", &self.loop_enabled)
            .field("loop_begin", &self.loop_begin)
            .field("loop_end", &self.loop_end)
            .field("decode_arena_size", &self.decode_arena_size)
            .finish()
    }
}
