//! Playback engine: stream descriptors, arena sizing, and playback cursors

pub mod capacity;
pub mod cursor;
pub mod stream;
