//! Minimal working-memory discovery
//!
//! How much scratch memory a decoder needs depends on tables inside the
//! stream (codebook sizes, block sizes) that are unknown until a parse is
//! attempted. [`find_minimal_capacity`] answers that by trying an
//! initialization at growing sizes until one succeeds.
//!
//! **Algorithm:**
//! 1. Start with `size = initial_bytes`
//! 2. Attempt initialization at `size`
//! 3. Insufficient memory: double `size` and retry
//! 4. Any other failure: stop, report it
//! 5. Give up once the next size would pass `ceiling_bytes`
//!
//! With a power-of-two `initial_bytes`, the returned size is the smallest power
//! of two at or above the initializer's real requirement. The search does not
//! care what is being sized: arena bytes, pool slots and heap reservations all
//! fit.

use serde::Deserialize;
use tracing::debug;

/// First probe size in bytes
pub const INITIAL_PROBE_BYTES: usize = 1024;

/// Largest probe size in bytes (1 MiB)
pub const MAX_PROBE_BYTES: usize = 1 << 20;

/// Bounds for the capacity search
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ProbeLimits {
    /// First size tried
    pub initial_bytes: usize,

    /// Largest size tried
    pub ceiling_bytes: usize,
}

impl Default for ProbeLimits {
    fn default() -> Self {
        Self {
            initial_bytes: INITIAL_PROBE_BYTES,
            ceiling_bytes: MAX_PROBE_BYTES,
        }
    }
}

impl ProbeLimits {
    /// Check that both bounds are powers of two and correctly ordered
    pub fn validate(&self) -> Result<(), String> {
        if !self.initial_bytes.is_power_of_two() {
            return Err(format!(
                "probe initial_bytes {} is not a power of two",
                self.initial_bytes
            ));
        }
        if !self.ceiling_bytes.is_power_of_two() {
            return Err(format!(
                "probe ceiling_bytes {} is not a power of two",
                self.ceiling_bytes
            ));
        }
        if self.initial_bytes > self.ceiling_bytes {
            return Err(format!(
                "probe initial_bytes {} exceeds ceiling_bytes {}",
                self.initial_bytes, self.ceiling_bytes
            ));
        }
        Ok(())
    }
}

/// Outcome of one failed initialization attempt
#[derive(Debug, Clone, PartialEq)]
pub enum ProbeError<E> {
    /// Not enough memory at this size; a larger size may work
    Insufficient,

    /// Permanent failure; a larger size cannot help
    Fatal(E),
}

/// Why the search ended without a usable size
#[derive(Debug, Clone, PartialEq)]
pub enum CapacityError<E> {
    /// Every size up to the ceiling was insufficient
    Exhausted { ceiling_bytes: usize },

    /// An attempt failed permanently
    Fatal { size_bytes: usize, error: E },
}

/// Find the smallest size at which `try_init` succeeds.
///
/// Sizes tried are `initial_bytes`, doubling each time, up to and including
/// `ceiling_bytes`. Returns the winning size together with whatever `try_init`
/// produced at that size.
///
/// # Arguments
/// - `limits`: First size and ceiling
/// - `try_init`: Attempts initialization at a given size
///
/// # Examples
///
/// ```
/// use streamloop_player::playback::capacity::{find_minimal_capacity, ProbeError, ProbeLimits};
///
/// let needed = 5000;
/// let (size, handle) = find_minimal_capacity::<_, (), _>(ProbeLimits::default(), |size| {
///     if size >= needed { Ok(size * 10) } else { Err(ProbeError::Insufficient) }
/// })
/// .unwrap();
/// assert_eq!(size, 8192);
/// assert_eq!(handle, 81920);
/// ```
pub fn find_minimal_capacity<T, E, F>(
    limits: ProbeLimits,
    mut try_init: F,
) -> Result<(usize, T), CapacityError<E>>
where
    F: FnMut(usize) -> Result<T, ProbeError<E>>,
{
    let ceiling_bytes = limits.ceiling_bytes;
    let mut size = limits.initial_bytes.max(1);

    if size > ceiling_bytes {
        return Err(CapacityError::Exhausted { ceiling_bytes });
    }

    loop {
        match try_init(size) {
            Ok(handle) => return Ok((size, handle)),
            Err(ProbeError::Fatal(error)) => {
                return Err(CapacityError::Fatal {
                    size_bytes: size,
                    error,
                })
            }
            Err(ProbeError::Insufficient) => {
                debug!("Probe at {} bytes insufficient", size);
                match size.checked_mul(2) {
                    Some(next) if next <= ceiling_bytes => size = next,
                    _ => return Err(CapacityError::Exhausted { ceiling_bytes }),
                }
            }
        }
    }
}
