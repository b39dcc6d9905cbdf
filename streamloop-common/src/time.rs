//! Frame and second conversions
//!
//! Every conversion takes the stream's sample rate as the single source of
//! truth. Seconds are `f64`, frame positions are `u64`.
//!
//! Seconds → frames rounds to the nearest frame instead of truncating, so a
//! loop point stored in seconds maps back onto the same frame every time it is
//! converted. Negative and NaN inputs clamp to frame 0.
//!
//! # Examples
//!
//! ```
//! use streamloop_common::time::{frames_to_seconds, seconds_to_frames};
//!
//! assert_eq!(seconds_to_frames(1.5, 1000), 1500);
//! assert_eq!(seconds_to_frames(0.0004, 1000), 0);
//! assert_eq!(seconds_to_frames(0.0005, 1000), 1);
//! assert_eq!(frames_to_seconds(22_050, 22_050), 1.0);
//! ```

/// Convert a position in seconds to a frame index at `sample_rate`.
pub fn seconds_to_frames(seconds: f64, sample_rate: u32) -> u64 {
    let frames = seconds * sample_rate as f64;
    if frames.is_nan() || frames <= 0.0 {
        return 0;
    }
    frames.round() as u64
}

/// Convert a frame index at `sample_rate` to seconds.
///
/// Returns 0.0 for a zero sample rate rather than dividing by zero.
pub fn frames_to_seconds(frames: u64, sample_rate: u32) -> f64 {
    if sample_rate == 0 {
        return 0.0;
    }
    frames as f64 / sample_rate as f64
}
