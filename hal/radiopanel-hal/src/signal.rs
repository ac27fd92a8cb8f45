//! Interrupt-to-loop event signaling
//!
//! A [`SignalFlag`] is a one-bit event cell: an interrupt handler sets it,
//! the main loop reads and clears it in one atomic step. Several events
//! between two polls collapse into a single observation, so a flag says
//! "at least once", never "how many".

use portable_atomic::{AtomicBool, Ordering};

/// Single-producer, single-consumer event flag
///
/// Meant to live in a `static` owned by the driver whose interrupt sets it.
#[derive(Debug)]
pub struct SignalFlag(AtomicBool);

impl SignalFlag {
    /// Create a cleared flag
    pub const fn new() -> Self {
        Self(AtomicBool::new(false))
    }

    /// Record an event (interrupt context)
    #[inline]
    pub fn set(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// Consume the event (loop context)
    ///
    /// Returns `true` if at least one event occurred since the last call.
    #[inline]
    pub fn test_and_clear(&self) -> bool {
        self.0.swap(false, Ordering::AcqRel)
    }

    /// Discard any stale event before starting a new operation
    #[inline]
    pub fn clear(&self) {
        self.0.store(false, Ordering::Release);
    }

    /// Observe the flag without consuming it
    #[inline]
    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

impl Default for SignalFlag {
    fn default() -> Self {
        Self::new()
    }
}
