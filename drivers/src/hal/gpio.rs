//! Parallel port Hardware Abstraction Layer.
//!
//! Byte-wide ports with optional per-bit direction control.

/// Pin logic level.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PinLevel {
    /// Logic low.
    Low,
    /// Logic high.
    High,
}

impl From<bool> for PinLevel {
    fn from(value: bool) -> Self {
        if value {
            PinLevel::High
        } else {
            PinLevel::Low
        }
    }
}

impl From<PinLevel> for bool {
    fn from(level: PinLevel) -> bool {
        matches!(level, PinLevel::High)
    }
}

/// An 8-bit parallel port.
///
/// The device is passed in per call, like event sources.
pub trait ParallelPort<D: ?Sized> {
    /// Error type for port operations.
    type Error: core::fmt::Debug;

    /// Read the levels seen on the pins.
    fn read(&self, dev: &mut D) -> Result<u8, Self::Error>;

    /// Write the output latch.
    ///
    /// Bits configured as inputs are latched but do not reach the pins.
    ///
    /// # Errors
    ///
    /// Returns an error if the port has no output latch.
    fn write(&self, dev: &mut D, value: u8) -> Result<(), Self::Error>;

    /// Configure which bits are outputs (1) and inputs (0).
    ///
    /// # Arguments
    ///
    /// - `dev`: Device holding the direction register
    /// - `outputs`: One bit per pin, set for an output
    ///
    /// # Errors
    ///
    /// Returns an error if `outputs` asks for a direction the port cannot
    /// take, such as an output on a hard-wired input pin.
    fn set_direction(&self, dev: &mut D, outputs: u8) -> Result<(), Self::Error>;

    /// Clear then set bits of the output latch.
    ///
    /// A read-modify-write; hold an interrupt guard when a handler writes
    /// the same port.
    fn modify(&self, dev: &mut D, clear: u8, set: u8) -> Result<(), Self::Error>;

    /// Level of one pin.
    fn level(&self, dev: &mut D, bit: u8) -> Result<PinLevel, Self::Error> {
        Ok(PinLevel::from(self.read(dev)? & (1 << bit) != 0))
    }

    fn set_bits(&self, dev: &mut D, mask: u8) -> Result<(), Self::Error> {
        self.modify(dev, 0, mask)
    }

    fn clear_bits(&self, dev: &mut D, mask: u8) -> Result<(), Self::Error> {
        self.modify(dev, mask, 0)
    }

    /// Invert the output latch bits in `mask`.
    ///
    /// # Errors
    ///
    /// Same as [`Self::write`].
    fn toggle(&self, dev: &mut D, mask: u8) -> Result<(), Self::Error>;
}
