//! Interrupt vectors and the BUFFALO secondary jump table.
//!
//! The ROM vector for each source points at a three-byte RAM entry
//! (`JMP ext`). Installing a handler means writing its address into the
//! entry's operand cell, one byte past the opcode.

use core::fmt;

/// First entry of the secondary jump table.
pub const JUMP_TABLE: u16 = 0x00C4;

/// `JMP` extended opcode placed at each jump entry.
pub const JMP_OPCODE: u8 = 0x7E;

/// Interrupt vectors, in jump-table order.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Vector {
    Sci = 0,
    Spi = 1,
    PulseEdge = 2,
    PulseOverflow = 3,
    TimerOverflow = 4,
    /// Shared by OC5 and IC4.
    Oc5Ic4 = 5,
    Oc4 = 6,
    Oc3 = 7,
    Oc2 = 8,
    Oc1 = 9,
    Ic3 = 10,
    Ic2 = 11,
    Ic1 = 12,
    RealTime = 13,
    Irq = 14,
    Xirq = 15,
}

/// Number of vectors in [`Vector`].
pub const VECTOR_COUNT: usize = 16;

impl Vector {
    pub const ALL: [Vector; VECTOR_COUNT] = [
        Vector::Sci,
        Vector::Spi,
        Vector::PulseEdge,
        Vector::PulseOverflow,
        Vector::TimerOverflow,
        Vector::Oc5Ic4,
        Vector::Oc4,
        Vector::Oc3,
        Vector::Oc2,
        Vector::Oc1,
        Vector::Ic3,
        Vector::Ic2,
        Vector::Ic1,
        Vector::RealTime,
        Vector::Irq,
        Vector::Xirq,
    ];

    pub const fn index(self) -> usize {
        self as usize
    }

    /// Address of the ROM vector word.
    pub const fn rom_address(self) -> u16 {
        0xFFD6 + 2 * self as u16
    }

    /// Address of the RAM jump entry the ROM vector points at.
    pub const fn jump_entry(self) -> u16 {
        JUMP_TABLE + 3 * self as u16
    }

    /// Fixed hardware priority among timer interrupts, 0 is highest.
    pub const fn priority(self) -> u8 {
        match self {
            Vector::Xirq => 0,
            Vector::Irq => 1,
            Vector::RealTime => 2,
            Vector::Ic1 => 3,
            Vector::Ic2 => 4,
            Vector::Ic3 => 5,
            Vector::Oc1 => 6,
            Vector::Oc2 => 7,
            Vector::Oc3 => 8,
            Vector::Oc4 => 9,
            Vector::Oc5Ic4 => 10,
            Vector::TimerOverflow => 11,
            Vector::PulseOverflow => 12,
            Vector::PulseEdge => 13,
            Vector::Spi => 14,
            Vector::Sci => 15,
        }
    }
}

/// Location of the indirection cell for one vector.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct VectorSlot {
    pub vector: Vector,
    /// RAM jump entry (holds the `JMP` opcode).
    pub jump: u16,
    /// Operand cell receiving the handler address.
    pub cell: u16,
}

impl VectorSlot {
    pub const fn of(vector: Vector) -> Self {
        let jump = vector.jump_entry();
        Self {
            vector,
            jump,
            cell: jump + 1,
        }
    }
}

/// Vector installation errors.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum VectorError {
    /// The vector already has a handler. Slots are written once.
    Occupied(Vector),
}

impl fmt::Display for VectorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VectorError::Occupied(v) => write!(f, "vector {:?} already installed", v),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn addresses_match_buffalo_layout() {
        assert_eq!(Vector::Oc1.rom_address(), 0xFFE8);
        assert_eq!(Vector::PulseOverflow.rom_address(), 0xFFDC);
        assert_eq!(Vector::RealTime.rom_address(), 0xFFF0);
        assert_eq!(Vector::Oc1.jump_entry(), JUMP_TABLE + 27);
        assert_eq!(VectorSlot::of(Vector::Ic1).cell, JUMP_TABLE + 37);
    }

    #[test]
    fn all_is_in_index_order() {
        for (i, v) in Vector::ALL.iter().enumerate() {
            assert_eq!(v.index(), i);
        }
    }
}
