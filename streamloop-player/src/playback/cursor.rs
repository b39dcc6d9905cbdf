//! Playback cursor: one playback session over a stream descriptor
//!
//! A cursor owns a [`DecodeSession`] (decoder handle + arena sized by the
//! descriptor's probe) and the play state: active flag, frames mixed, loop
//! count. Any number of cursors can play the same descriptor at once; they
//! share nothing mutable.
//!
//! # Mixing
//!
//! [`PlaybackCursor::mix`] is called from the host's audio callback and always
//! fills the whole output slice:
//! - End of stream with looping on: seek to `loop_begin` and keep filling the
//!   same buffer from there
//! - End of stream with looping off: zero-fill the rest and go inactive
//! - Loop end crossed mid-buffer: finish the buffer, then seek to
//!   `loop_begin` plus the overshoot so the next call resumes in phase
//!
//! Mixing never allocates; the arena was sized and allocated when the cursor
//! was created. Calls on one cursor must not overlap.

use crate::audio::codec::{DecodeSession, FrameDecoder};
use crate::audio::symphonia_codec::SymphoniaDecoder;
use crate::audio::types::{upmix_mono, AudioFrame};
use crate::error::DecodeError;
use crate::playback::stream::StreamDescriptor;
use std::sync::Arc;
use streamloop_common::time::{frames_to_seconds, seconds_to_frames};
use tracing::{debug, warn};

/// One playback session with its own decoder and arena
pub struct PlaybackCursor<D: FrameDecoder = SymphoniaDecoder> {
    stream: Arc<StreamDescriptor<D>>,
    session: DecodeSession<D>,

    active: bool,

    /// Decoder position in frames since the last start/seek
    frames_mixed: u64,

    loop_count: u32,
}

impl<D: FrameDecoder> PlaybackCursor<D> {
    /// Open a decoder for `stream` in an arena of the descriptor's probed size.
    ///
    /// # Errors
    /// [`DecodeError::InitFailed`] when the descriptor has no payload or the
    /// decoder cannot open it. The arena is already released by then.
    pub fn new(stream: Arc<StreamDescriptor<D>>) -> Result<Self, DecodeError> {
        let payload = stream
            .payload()
            .ok_or_else(|| DecodeError::InitFailed("no payload has been set".to_string()))?;

        let session = DecodeSession::open(stream.allocator(), stream.decode_arena_size(), payload)
            .map_err(|e| {
                warn!("Playback cursor could not open decoder: {}", e);
                DecodeError::InitFailed(e.to_string())
            })?;

        Ok(Self {
            stream,
            session,
            active: false,
            frames_mixed: 0,
            loop_count: 0,
        })
    }

    /// Begin playback at `from_position` seconds
    pub fn start(&mut self, from_position: f64) {
        self.active = true;
        self.loop_count = 0;
        self.seek(from_position);
    }

    /// Stop playback. The decoder and arena stay allocated for a later `start`.
    pub fn stop(&mut self) {
        self.active = false;
    }

    /// Reposition to `position` seconds. Ignored while inactive.
    ///
    /// Positions at or past the end of the stream wrap to the start.
    pub fn seek(&mut self, position: f64) {
        if !self.active {
            return;
        }

        let position = if position >= self.stream.get_length_seconds() {
            0.0
        } else {
            position
        };

        self.frames_mixed = seconds_to_frames(position, self.stream.sample_rate());
        if let Err(e) = self.session.seek(self.frames_mixed) {
            warn!("{}", e);
        }
    }

    /// Fill `output` with the next `output.len()` stereo frames.
    ///
    /// Always writes every frame of `output`. Afterwards [`is_active`] says
    /// whether playback continues; a non-looping stream that ran out has its
    /// tail zero-filled and stops.
    ///
    /// # Panics
    /// Panics when the cursor is not active. Hosts must check [`is_active`]
    /// before mixing.
    ///
    /// [`is_active`]: PlaybackCursor::is_active
    pub fn mix(&mut self, output: &mut [AudioFrame]) {
        assert!(self.active, "mix called on an inactive playback cursor");

        let frame_count = output.len();
        let mono = self.stream.channel_count() == 1;
        let mut written = 0;
        let mut just_looped = false;

        while written < frame_count && self.active {
            let target = &mut output[written..];
            let produced = self.session.decode(target);

            if mono && produced > 0 {
                upmix_mono(&mut target[..produced]);
            }

            written += produced;
            self.frames_mixed += produced as u64;

            if written < frame_count {
                // End of stream
                if self.stream.has_loop() && !(just_looped && produced == 0) {
                    self.seek(self.stream.get_loop_begin());
                    self.loop_count += 1;
                    just_looped = true;
                } else {
                    if just_looped {
                        warn!("Loop restart produced no audio, stopping playback");
                    }
                    output[written..].fill(AudioFrame::zero());
                    self.active = false;
                }
            } else if self.stream.has_loop()
                && self.frames_mixed >= self.stream.loop_end_frames()
            {
                // Crossed loop_end inside this buffer. Resume past loop_begin by
                // the frames already mixed beyond loop_end.
                let excess = self.frames_mixed - self.stream.loop_end_frames();
                let resume_at = self.stream.get_loop_begin()
                    + frames_to_seconds(excess, self.stream.sample_rate());
                debug!("Loop end reached, {} frames over, resuming at {:.6}s", excess, resume_at);
                self.seek(resume_at);
                self.loop_count += 1;
            }
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Same as [`PlaybackCursor::is_active`]
    pub fn is_playing(&self) -> bool {
        self.active
    }

    /// Loop iterations since the last `start`
    pub fn get_loop_count(&self) -> u32 {
        self.loop_count
    }

    /// Decoder position in seconds
    pub fn get_playback_position(&self) -> f64 {
        frames_to_seconds(self.frames_mixed, self.stream.sample_rate())
    }

    /// Decoder position in frames
    pub fn frames_mixed(&self) -> u64 {
        self.frames_mixed
    }

    /// Stream length in seconds
    pub fn get_length(&self) -> f64 {
        self.stream.get_length_seconds()
    }

    pub fn get_stream_sampling_rate(&self) -> u32 {
        self.stream.sample_rate()
    }

    /// Size of this cursor's decoder arena in bytes
    pub fn arena_size(&self) -> usize {
        self.session.arena_size()
    }

    /// The descriptor this cursor plays
    pub fn stream(&self) -> &Arc<StreamDescriptor<D>> {
        &self.stream
    }
}
