//! Nullable clock: deterministic block height and time for testing.

use lsm_types::Timestamp;
use std::cell::Cell;

/// Expected seconds between blocks.
pub const BLOCK_TIME_SECS: u64 = 6;

/// A deterministic block clock.
///
/// Height and time only advance when you tell them to.
pub struct NullClock {
    height: Cell<u64>,
    current: Cell<u64>,
}

impl NullClock {
    pub fn new(initial_height: u64, initial_secs: u64) -> Self {
        Self {
            height: Cell::new(initial_height),
            current: Cell::new(initial_secs),
        }
    }

    pub fn height(&self) -> u64 {
        self.height.get()
    }

    /// Get the current block time.
    pub fn now(&self) -> Timestamp {
        Timestamp::new(self.current.get())
    }

    /// Advance one block.
    pub fn next_block(&self) {
        self.height.set(self.height.get() + 1);
        self.advance(BLOCK_TIME_SECS);
    }

    /// Advance time by a number of seconds without producing a block.
    pub fn advance(&self, secs: u64) {
        self.current.set(self.current.get() + secs);
    }

    /// Set the time to a specific value.
    pub fn set(&self, secs: u64) {
        self.current.set(secs);
    }
}
