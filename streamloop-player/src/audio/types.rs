//! Core audio data types
//!
//! Defines the stereo frame written to the host's output buffer and the stream
//! parameters a decoder reports after opening a payload.

/// AudioFrame represents a single stereo sample (one frame of audio).
///
/// The host's output buffer is a slice of frames; decoders write into it
/// directly and the mixing loop fills any tail with [`AudioFrame::zero`].
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AudioFrame {
    /// Left channel sample
    pub left: f32,

    /// Right channel sample
    pub right: f32,
}

impl AudioFrame {
    /// Create a silent frame (0.0, 0.0)
    pub fn zero() -> Self {
        AudioFrame { left: 0.0, right: 0.0 }
    }

    /// Create a frame from mono sample (duplicate to both channels)
    pub fn from_mono(sample: f32) -> Self {
        AudioFrame { left: sample, right: sample }
    }

    /// Create a frame from left and right samples
    pub fn from_stereo(left: f32, right: f32) -> Self {
        AudioFrame { left, right }
    }

    /// True when both channels are exactly zero
    pub fn is_silent(&self) -> bool {
        self.left == 0.0 && self.right == 0.0
    }
}

/// Copy the left channel into the right channel for every frame.
///
/// Decoders fill only `left` for single-channel streams; this turns that span
/// into a proper stereo signal.
pub fn upmix_mono(frames: &mut [AudioFrame]) {
    for frame in frames {
        frame.right = frame.left;
    }
}

/// Stream parameters reported by a decoder once a payload is open
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamInfo {
    /// Channels in the source stream (1=mono, 2=stereo; codecs may report more)
    pub channel_count: u16,

    /// Native sample rate in Hz
    pub sample_rate: u32,
}
