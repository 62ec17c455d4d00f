//! Envelope id allocation shared by every session.

use zedex_core::ConcurrentCounter;

/// Hands out outbound envelope ids: unique and increasing within one
/// process, restarting from 1 after a restart.
///
/// The wire field is 32 bits wide; after 2^32 allocations ids wrap, and 0
/// (which reads as "no id" on the wire) is skipped.
#[derive(Debug, Default)]
pub struct IdAllocator {
    counter: ConcurrentCounter,
}

impl IdAllocator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the next envelope id. Never returns 0.
    #[allow(clippy::cast_possible_truncation)]
    pub fn next_id(&self) -> u32 {
        loop {
            let id = self.counter.increment() as u32;
            if id != 0 {
                return id;
            }
        }
    }

    /// Number of ids allocated so far.
    #[must_use]
    pub fn allocated(&self) -> u64 {
        self.counter.value()
    }
}
