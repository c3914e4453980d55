//! 68HC11 parallel ports A to E.

use core::fmt;

use super::regs::{self, Pactl, PortA};
use crate::hal::gpio::ParallelPort;
use crate::hal::register::{Reg8, RegisterBus};

/// On-chip parallel ports.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Port {
    /// Timer port. PA0..2 inputs, PA4..6 outputs, PA3 and PA7 per PACTL.
    A,
    /// Output only.
    B,
    /// Bidirectional, DDRC.
    C,
    /// Six bits, DDRD.
    D,
    /// Input only.
    E,
}

/// Port A pins whose direction cannot change.
const PORTA_FIXED: u8 = 0x77;
/// Port A pins that are always outputs.
const PORTA_OUTPUTS: u8 = PortA::PA6.bits() | PortA::PA5.bits() | PortA::PA4.bits();
const PORTD_MASK: u8 = 0x3F;

impl Port {
    pub const fn data_reg(self) -> Reg8 {
        match self {
            Port::A => regs::PORTA,
            Port::B => regs::PORTB,
            Port::C => regs::PORTC,
            Port::D => regs::PORTD,
            Port::E => regs::PORTE,
        }
    }

    /// Bits implemented by the port.
    pub const fn width_mask(self) -> u8 {
        match self {
            Port::D => PORTD_MASK,
            _ => 0xFF,
        }
    }
}

/// Port errors.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PortError {
    /// Writes to an input-only port.
    InputOnly(Port),
    /// The requested direction differs from a hard-wired one.
    FixedDirection(Port),
}

impl fmt::Display for PortError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PortError::InputOnly(p) => write!(f, "port {:?} is input only", p),
            PortError::FixedDirection(p) => write!(f, "port {:?} direction is fixed", p),
        }
    }
}

impl<D: RegisterBus + ?Sized> ParallelPort<D> for Port {
    type Error = PortError;

    fn read(&self, dev: &mut D) -> Result<u8, Self::Error> {
        Ok(dev.read8(self.data_reg()) & self.width_mask())
    }

    fn write(&self, dev: &mut D, value: u8) -> Result<(), Self::Error> {
        if *self == Port::E {
            return Err(PortError::InputOnly(*self));
        }
        dev.write8(self.data_reg(), value & self.width_mask());
        Ok(())
    }

    fn set_direction(&self, dev: &mut D, outputs: u8) -> Result<(), Self::Error> {
        match self {
            Port::A => {
                if (outputs ^ PORTA_OUTPUTS) & PORTA_FIXED != 0 {
                    return Err(PortError::FixedDirection(*self));
                }
                let mut set = Pactl::empty();
                set.set(Pactl::DDRA7, outputs & PortA::PA7.bits() != 0);
                set.set(Pactl::DDRA3, outputs & PortA::PA3.bits() != 0);
                dev.modify8(
                    regs::PACTL,
                    (Pactl::DDRA7 | Pactl::DDRA3).bits(),
                    set.bits(),
                );
            }
            Port::B if outputs == 0xFF => {}
            Port::E if outputs == 0x00 => {}
            Port::B | Port::E => return Err(PortError::FixedDirection(*self)),
            Port::C => dev.write8(regs::DDRC, outputs),
            Port::D => {
                if outputs & !PORTD_MASK != 0 {
                    return Err(PortError::FixedDirection(*self));
                }
                dev.write8(regs::DDRD, outputs);
            }
        }
        Ok(())
    }

    fn modify(&self, dev: &mut D, clear: u8, set: u8) -> Result<(), Self::Error> {
        if *self == Port::E {
            return Err(PortError::InputOnly(*self));
        }
        let value = dev.read8(self.data_reg());
        dev.write8(self.data_reg(), ((value & !clear) | set) & self.width_mask());
        Ok(())
    }

    fn toggle(&self, dev: &mut D, mask: u8) -> Result<(), Self::Error> {
        if *self == Port::E {
            return Err(PortError::InputOnly(*self));
        }
        let value = dev.read8(self.data_reg());
        dev.write8(self.data_reg(), (value ^ mask) & self.width_mask());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hal::register::{FlagReg, Reg16};

    /// Plain register file with no side effects.
    struct Regs([u8; regs::BLOCK_LEN]);

    impl RegisterBus for Regs {
        fn read8(&mut self, reg: Reg8) -> u8 {
            self.0[reg.offset() as usize]
        }

        fn write8(&mut self, reg: Reg8, value: u8) {
            self.0[reg.offset() as usize] = value;
        }

        fn read16(&mut self, reg: Reg16) -> u16 {
            u16::from_be_bytes([self.read8(reg.high()), self.read8(reg.low())])
        }

        fn write16(&mut self, reg: Reg16, value: u16) {
            let [hi, lo] = value.to_be_bytes();
            self.write8(reg.high(), hi);
            self.write8(reg.low(), lo);
        }

        fn read_flags(&mut self, reg: FlagReg) -> u8 {
            self.0[reg.offset() as usize]
        }

        fn clear_flags(&mut self, reg: FlagReg, mask: u8) {
            self.0[reg.offset() as usize] &= !mask;
        }
    }

    #[test]
    fn port_a_direction_goes_through_pactl() {
        let mut bank = Regs([0; regs::BLOCK_LEN]);
        bank.0[regs::PACTL.offset() as usize] = Pactl::PAEN.bits();

        Port::A.set_direction(&mut bank, 0xF8).unwrap();
        assert_eq!(
            bank.0[regs::PACTL.offset() as usize],
            (Pactl::PAEN | Pactl::DDRA7 | Pactl::DDRA3).bits()
        );
        assert_eq!(
            Port::A.set_direction(&mut bank, 0xFF),
            Err(PortError::FixedDirection(Port::A))
        );
    }

    #[test]
    fn port_e_rejects_writes() {
        let mut bank = Regs([0; regs::BLOCK_LEN]);
        assert_eq!(Port::E.write(&mut bank, 1), Err(PortError::InputOnly(Port::E)));
        assert_eq!(Port::E.toggle(&mut bank, 1), Err(PortError::InputOnly(Port::E)));
        assert!(Port::E.set_direction(&mut bank, 0).is_ok());
    }

    #[test]
    fn toggle_and_bits_edit_the_latch() {
        let mut bank = Regs([0; regs::BLOCK_LEN]);
        Port::B.write(&mut bank, 0x0F).unwrap();
        Port::B.toggle(&mut bank, 0xFF).unwrap();
        assert_eq!(Port::B.read(&mut bank), Ok(0xF0));
        Port::D.set_bits(&mut bank, 0xFF).unwrap();
        assert_eq!(Port::D.read(&mut bank), Ok(0x3F));
        Port::D.clear_bits(&mut bank, 0x01).unwrap();
        assert_eq!(Port::D.level(&mut bank, 0), Ok(crate::hal::gpio::PinLevel::Low));
    }
}
