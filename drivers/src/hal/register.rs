//! Register Surface Hardware Abstraction Layer.
//!
//! Typed handles for the three kinds of peripheral register and the bus
//! trait every device backend implements. Registers are identified by
//! their offset from the register block base.
//!
//! Flag registers are write-one-to-clear: writing 1 to a bit clears that
//! latch and writing 0 leaves it alone. [`FlagReg`] therefore has no
//! read-modify-write path; a stray `flags | x` write would clear every
//! other pending flag in the register.

/// Plain 8-bit control or data register.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct Reg8(pub u16);

/// 16-bit register pair, high byte at the lower address.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct Reg16(pub u16);

/// 8-bit write-one-to-clear flag register.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct FlagReg(pub u16);

impl Reg8 {
    pub const fn offset(self) -> u16 {
        self.0
    }
}

impl Reg16 {
    pub const fn offset(self) -> u16 {
        self.0
    }

    /// High byte register.
    pub const fn high(self) -> Reg8 {
        Reg8(self.0)
    }

    /// Low byte register.
    pub const fn low(self) -> Reg8 {
        Reg8(self.0 + 1)
    }
}

impl FlagReg {
    pub const fn offset(self) -> u16 {
        self.0
    }
}

/// Access to a block of memory-mapped peripheral registers.
///
/// Every call is one device access: no caching, no buffering, no
/// reordering. Reads take `&mut self` because some reads have side
/// effects on the device (and on a simulated device, advance time).
///
/// The trait is object safe so interrupt handlers can be handed a
/// `&mut dyn RegisterBus`.
pub trait RegisterBus {
    /// Read an 8-bit register.
    fn read8(&mut self, reg: Reg8) -> u8;

    /// Write an 8-bit register.
    fn write8(&mut self, reg: Reg8, value: u8);

    /// Read a 16-bit register pair.
    fn read16(&mut self, reg: Reg16) -> u16;

    /// Write a 16-bit register pair.
    fn write16(&mut self, reg: Reg16, value: u16);

    /// Read the current latches of a flag register.
    fn read_flags(&mut self, reg: FlagReg) -> u8;

    /// Clear the latches selected by `mask`.
    fn clear_flags(&mut self, reg: FlagReg, mask: u8);

    /// Read-modify-write: clear the `clear` bits, then set the `set` bits.
    ///
    /// Not atomic with respect to interrupts. Callers that share the
    /// register with a handler must hold an interrupt guard.
    fn modify8(&mut self, reg: Reg8, clear: u8, set: u8) {
        let value = self.read8(reg);
        self.write8(reg, (value & !clear) | set);
    }
}

impl<B: RegisterBus + ?Sized> RegisterBus for &mut B {
    fn read8(&mut self, reg: Reg8) -> u8 {
        (**self).read8(reg)
    }

    fn write8(&mut self, reg: Reg8, value: u8) {
        (**self).write8(reg, value)
    }

    fn read16(&mut self, reg: Reg16) -> u16 {
        (**self).read16(reg)
    }

    fn write16(&mut self, reg: Reg16, value: u16) {
        (**self).write16(reg, value)
    }

    fn read_flags(&mut self, reg: FlagReg) -> u8 {
        (**self).read_flags(reg)
    }

    fn clear_flags(&mut self, reg: FlagReg, mask: u8) {
        (**self).clear_flags(reg, mask)
    }

    fn modify8(&mut self, reg: Reg8, clear: u8, set: u8) {
        (**self).modify8(reg, clear, set)
    }
}
