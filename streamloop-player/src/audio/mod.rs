//! Audio primitives: frames, decoder arenas, and the frame-decoder seam

pub mod arena;
pub mod codec;
pub mod symphonia_codec;
pub mod types;
