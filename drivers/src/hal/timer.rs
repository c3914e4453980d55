//! Timer event Hardware Abstraction Layer.
//!
//! An event source is one hardware event generator (a compare channel, a
//! capture channel, an overflow) with a latching flag bit and an interrupt
//! mask bit. Sources move through
//!
//! ```text
//! Idle --arm--> Armed --event observed--> Fired --clear--> Armed
//! ```
//!
//! The device is passed to every call rather than owned by the source, so
//! several sources can share one register block.

use super::wait::{Backoff, Ticks};

/// Lifecycle of an event source.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SourceState {
    /// Not configured yet.
    Idle,
    /// Waiting for the next event.
    Armed,
    /// An event was observed and not yet cleared.
    Fired,
}

/// How the foreground learns about an event.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Delivery {
    /// The mask bit is clear; the flag is polled.
    Polled,
    /// The mask bit is set; a handler runs on each event.
    Interrupt,
}

/// Hardware event generator.
pub trait EventSource<D: ?Sized> {
    /// Error type for source operations.
    type Error: core::fmt::Debug;

    /// Clear any stale flag, then enable the interrupt.
    ///
    /// # Arguments
    ///
    /// - `dev`: Device owning the flag and mask registers
    ///
    /// # Errors
    ///
    /// Returns an error if the source cannot be configured on `dev`.
    fn arm(&mut self, dev: &mut D) -> Result<(), Self::Error>;

    /// Clear any stale flag and leave the interrupt disabled.
    fn arm_polled(&mut self, dev: &mut D) -> Result<(), Self::Error>;

    /// Check for an event without blocking.
    ///
    /// Returns `true` at most once per hardware event: the flag is
    /// consumed as part of the check. A capture source latches its data
    /// register before the flag goes.
    ///
    /// # Errors
    ///
    /// Returns an error if the device refuses the flag access.
    fn poll_fired(&mut self, dev: &mut D) -> Result<bool, Self::Error>;

    /// Busy-poll until an event is observed or `timeout` elapses.
    ///
    /// # Arguments
    ///
    /// - `dev`: Device the flag is read from
    /// - `timeout`: Budget in counter ticks, measured on the device clock
    /// - `backoff`: Idle policy between two reads of the flag
    ///
    /// # Errors
    ///
    /// Returns a timeout error if no event arrives within `timeout`, or
    /// whatever [`Self::poll_fired`] fails with.
    fn wait_fired(
        &mut self,
        dev: &mut D,
        timeout: Ticks,
        backoff: &mut dyn Backoff,
    ) -> Result<(), Self::Error>;

    /// Clear the flag and return to `Armed`. Idempotent.
    fn clear(&mut self, dev: &mut D) -> Result<(), Self::Error>;

    /// Disable the interrupt, leaving the flag alone.
    fn disarm(&mut self, dev: &mut D) -> Result<(), Self::Error>;

    /// Current lifecycle state.
    fn state(&self) -> SourceState;
}

/// Extension trait for sources that can be triggered by software.
pub trait ForcedEvent<D: ?Sized>: EventSource<D> {
    /// Synthesize one event without waiting for the hardware condition.
    ///
    /// # Errors
    ///
    /// Returns an error if the source has no force bit, or if its channel
    /// is currently routed to a function that ignores the force.
    fn force(&mut self, dev: &mut D) -> Result<(), Self::Error>;
}

/// Extension trait for sources with an associated data register.
pub trait LatchedEvent<D: ?Sized>: EventSource<D> {
    /// Value of the data register read together with the last observed
    /// flag, before the flag was cleared.
    fn latched(&self) -> Option<u16>;
}
