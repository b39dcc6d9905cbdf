//! Decoder arenas and the allocator capability that provides them
//!
//! An [`Arena`] is a fixed-size block handed to a decoder for its working
//! storage. Its size is decided once per payload by the stream descriptor's
//! capacity probe and never grows afterwards, so a playback cursor never
//! allocates on the audio thread.
//!
//! Arenas come from an [`ArenaAllocator`] injected at construction time. The
//! host engine can supply its own (pooled, pre-reserved, instrumented); the
//! default [`HeapAllocator`] uses the global heap.

use std::fmt;

/// Bytes per arena storage word (one f32 sample)
pub const SAMPLE_BYTES: usize = std::mem::size_of::<f32>();

/// Fixed-size decoder working memory.
///
/// Storage is kept as f32 sample words since decoders stage decoded PCM in it.
/// The reported size is the byte size that was requested; a trailing remainder
/// smaller than one word is not addressable.
pub struct Arena {
    samples: Box<[f32]>,
    size_bytes: usize,
}

impl Arena {
    /// Allocate a zeroed arena of `size_bytes` from the global heap
    pub fn with_size(size_bytes: usize) -> Self {
        Self {
            samples: vec![0.0; size_bytes / SAMPLE_BYTES].into_boxed_slice(),
            size_bytes,
        }
    }

    /// Size this arena was allocated with, in bytes
    pub fn size_bytes(&self) -> usize {
        self.size_bytes
    }

    /// Number of f32 samples the arena can hold
    pub fn capacity_samples(&self) -> usize {
        self.samples.len()
    }

    /// Read access to the arena storage
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    /// Write access to the arena storage
    pub fn samples_mut(&mut self) -> &mut [f32] {
        &mut self.samples
    }
}

impl fmt::Debug for Arena {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Arena")
            .field("size_bytes", &self.size_bytes)
            .finish()
    }
}

/// Source of decoder arenas.
///
/// Every arena handed out by `allocate` comes back through `release` exactly
/// once, when the decoder bound to it is torn down.
pub trait ArenaAllocator: Send + Sync + fmt::Debug {
    /// Provide an arena of at least `size_bytes`
    fn allocate(&self, size_bytes: usize) -> Arena;

    /// Take back an arena previously returned by `allocate`
    fn release(&self, arena: Arena) {
        drop(arena);
    }
}

/// Allocator backed by the global heap
#[derive(Debug, Default, Clone, Copy)]
pub struct HeapAllocator;

impl ArenaAllocator for HeapAllocator {
    fn allocate(&self, size_bytes: usize) -> Arena {
        Arena::with_size(size_bytes)
    }
}
