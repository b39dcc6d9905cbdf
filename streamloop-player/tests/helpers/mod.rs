//! Test helpers for playback engine tests
//!
//! Provides a synthetic frame decoder and an instrumented arena allocator so
//! the stream descriptor and playback cursor can be tested without real
//! compressed audio.
//!
//! # Test payload layout (little-endian)
//!
//! ```text
//! 0..4    magic "SLTC"
//! 4..6    channel count (u16)
//! 6..10   sample rate (u32)
//! 10..18  total frames (u64)
//! 18..22  arena bytes the decoder needs (u32)
//! ```
//!
//! Decoded frame `i` carries `left = i`, and `right = -i` for multi-channel
//! streams. Mono streams leave `right` untouched, as the decoder contract
//! allows.

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use streamloop_player::audio::codec::{FrameDecoder, OpenError, SeekError};
use streamloop_player::audio::types::StreamInfo;
use streamloop_player::{Arena, ArenaAllocator, AudioFrame, StreamDescriptor};

const MAGIC: &[u8; 4] = b"SLTC";
const HEADER_LEN: usize = 22;

thread_local! {
    static PROBED_SIZES: RefCell<Vec<usize>> = RefCell::new(Vec::new());
    static SEEKS: RefCell<Vec<u64>> = RefCell::new(Vec::new());
    static DECODE_CALLS: Cell<usize> = Cell::new(0);
    static CLOSES: Cell<usize> = Cell::new(0);
    static FAIL_NEXT_OPEN: Cell<bool> = Cell::new(false);
}

/// Build a test payload header
pub fn test_payload(channels: u16, sample_rate: u32, total_frames: u64, arena_bytes: u32) -> Vec<u8> {
    let mut payload = Vec::with_capacity(HEADER_LEN);
    payload.extend_from_slice(MAGIC);
    payload.extend_from_slice(&channels.to_le_bytes());
    payload.extend_from_slice(&sample_rate.to_le_bytes());
    payload.extend_from_slice(&total_frames.to_le_bytes());
    payload.extend_from_slice(&arena_bytes.to_le_bytes());
    payload
}

/// Arena sizes the test decoder was opened with on this thread
pub fn probed_sizes() -> Vec<usize> {
    PROBED_SIZES.with(|p| p.borrow().clone())
}

/// Frames the test decoder was asked to seek to on this thread
pub fn seeks() -> Vec<u64> {
    SEEKS.with(|s| s.borrow().clone())
}

pub fn decode_calls() -> usize {
    DECODE_CALLS.with(|c| c.get())
}

pub fn closes() -> usize {
    CLOSES.with(|c| c.get())
}

/// Make the next successful-looking open on this thread fail fatally
pub fn fail_next_open() {
    FAIL_NEXT_OPEN.with(|f| f.set(true));
}

/// Clear all per-thread counters
pub fn reset_counters() {
    PROBED_SIZES.with(|p| p.borrow_mut().clear());
    SEEKS.with(|s| s.borrow_mut().clear());
    DECODE_CALLS.with(|c| c.set(0));
    CLOSES.with(|c| c.set(0));
    FAIL_NEXT_OPEN.with(|f| f.set(false));
}

/// Synthetic decoder driven by a [`test_payload`] header
#[derive(Debug)]
pub struct TestCodec {
    info: StreamInfo,
    total_frames: u64,
    position: u64,
}

impl FrameDecoder for TestCodec {
    fn open(payload: Arc<[u8]>, arena: &mut Arena) -> Result<Self, OpenError> {
        PROBED_SIZES.with(|p| p.borrow_mut().push(arena.size_bytes()));

        if payload.len() < HEADER_LEN || &payload[0..4] != MAGIC {
            return Err(OpenError::Fatal("bad magic".to_string()));
        }

        let channel_count = u16::from_le_bytes([payload[4], payload[5]]);
        let sample_rate = u32::from_le_bytes(payload[6..10].try_into().unwrap());
        let total_frames = u64::from_le_bytes(payload[10..18].try_into().unwrap());
        let arena_bytes = u32::from_le_bytes(payload[18..22].try_into().unwrap()) as usize;

        if channel_count == 0 || sample_rate == 0 {
            return Err(OpenError::Fatal("bad stream parameters".to_string()));
        }
        if arena.size_bytes() < arena_bytes {
            return Err(OpenError::OutOfMemory);
        }
        if FAIL_NEXT_OPEN.with(|f| f.replace(false)) {
            return Err(OpenError::Fatal("injected open failure".to_string()));
        }

        Ok(Self {
            info: StreamInfo {
                channel_count,
                sample_rate,
            },
            total_frames,
            position: 0,
        })
    }

    fn stream_info(&self) -> StreamInfo {
        self.info
    }

    fn total_length_seconds(&self) -> f64 {
        self.total_frames as f64 / self.info.sample_rate as f64
    }

    fn decode_frames(&mut self, _arena: &mut Arena, out: &mut [AudioFrame]) -> usize {
        DECODE_CALLS.with(|c| c.set(c.get() + 1));

        let remaining = self.total_frames.saturating_sub(self.position);
        let produced = (out.len() as u64).min(remaining) as usize;

        for (i, frame) in out[..produced].iter_mut().enumerate() {
            let index = (self.position + i as u64) as f32;
            frame.left = index;
            if self.info.channel_count > 1 {
                frame.right = -index;
            }
        }

        self.position += produced as u64;
        produced
    }

    fn seek_to_frame(&mut self, _arena: &mut Arena, frame: u64) -> Result<(), SeekError> {
        SEEKS.with(|s| s.borrow_mut().push(frame));
        if frame > self.total_frames {
            return Err(SeekError {
                frame,
                reason: "past end of stream".to_string(),
            });
        }
        self.position = frame;
        Ok(())
    }

    fn close(&mut self, _arena: &mut Arena) {
        CLOSES.with(|c| c.set(c.get() + 1));
    }
}

/// Allocator that counts every arena handed out and returned
#[derive(Debug, Default)]
pub struct CountingAllocator {
    allocated: AtomicUsize,
    released: AtomicUsize,
    live_bytes: AtomicUsize,
}

impl CountingAllocator {
    pub fn allocated(&self) -> usize {
        self.allocated.load(Ordering::SeqCst)
    }

    pub fn released(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }

    pub fn live_bytes(&self) -> usize {
        self.live_bytes.load(Ordering::SeqCst)
    }

    /// Arenas currently held by someone
    pub fn outstanding(&self) -> usize {
        self.allocated() - self.released()
    }
}

impl ArenaAllocator for CountingAllocator {
    fn allocate(&self, size_bytes: usize) -> Arena {
        self.allocated.fetch_add(1, Ordering::SeqCst);
        self.live_bytes.fetch_add(size_bytes, Ordering::SeqCst);
        Arena::with_size(size_bytes)
    }

    fn release(&self, arena: Arena) {
        self.released.fetch_add(1, Ordering::SeqCst);
        self.live_bytes.fetch_sub(arena.size_bytes(), Ordering::SeqCst);
    }
}

/// Empty descriptor over the test codec with a counting allocator
pub fn test_descriptor() -> (Arc<CountingAllocator>, StreamDescriptor<TestCodec>) {
    reset_counters();
    let allocator = Arc::new(CountingAllocator::default());
    let stream = StreamDescriptor::new(allocator.clone() as Arc<dyn ArenaAllocator>);
    (allocator, stream)
}

/// Descriptor with an ingested test stream, loop settings at their defaults
pub fn ingested(
    channels: u16,
    sample_rate: u32,
    total_frames: u64,
) -> (Arc<CountingAllocator>, StreamDescriptor<TestCodec>) {
    let (allocator, mut stream) = test_descriptor();
    stream
        .set_payload(&test_payload(channels, sample_rate, total_frames, 3000))
        .expect("test payload should ingest");
    (allocator, stream)
}

/// Frame index encoded in a decoded test frame
pub fn frame_index(frame: &AudioFrame) -> u64 {
    frame.left as u64
}

/// Output buffer pre-filled with a value the mixer must overwrite
pub fn poisoned_buffer(frames: usize) -> Vec<AudioFrame> {
    vec![AudioFrame::from_stereo(-7.0, 99.0); frames]
}
