//! Anti-replay counter value.
//!
//! The counter travels as 8 big-endian bytes both on the wire and in the
//! storage medium. Incrementing wraps within the 8-byte width.

use std::fmt;

use crate::types::COUNTER_SIZE;

/// Monotonic replay counter embedded in every frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ReplayCounter([u8; COUNTER_SIZE]);

impl ReplayCounter {
    /// Value written to a freshly bootstrapped store.
    pub const INITIAL: Self = Self([0, 0, 0, 0, 0, 0, 0, 1]);

    /// Creates a counter from its big-endian byte representation.
    pub const fn from_bytes(bytes: [u8; COUNTER_SIZE]) -> Self {
        Self(bytes)
    }

    /// Creates a counter from an integer value.
    pub const fn from_value(value: u64) -> Self {
        Self(value.to_be_bytes())
    }

    /// Returns the big-endian byte representation.
    pub const fn to_bytes(self) -> [u8; COUNTER_SIZE] {
        self.0
    }

    /// Returns the counter as an integer.
    pub const fn value(self) -> u64 {
        u64::from_be_bytes(self.0)
    }

    /// Returns the next counter value.
    pub fn increment(self) -> Self {
        Self(increment_counter(self.0))
    }
}

impl Default for ReplayCounter {
    fn default() -> Self {
        Self::INITIAL
    }
}

impl fmt::Display for ReplayCounter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

/// Increments a big-endian counter with carry from the last byte.
///
/// `FF FF FF FF FF FF FF FF` wraps to all zeroes.
pub fn increment_counter(counter: [u8; COUNTER_SIZE]) -> [u8; COUNTER_SIZE] {
    let mut next = counter;
    for byte in next.iter_mut().rev() {
        *byte = byte.wrapping_add(1);
        if *byte != 0 {
            break;
        }
    }
    next
}
