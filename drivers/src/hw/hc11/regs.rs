//! 68HC11 register block: offsets and bit layouts.
//!
//! Offsets are relative to [`REG_BASE`].

use bitflags::bitflags;

use crate::hal::register::{FlagReg, Reg8, Reg16};

/// Register block base after reset.
pub const REG_BASE: usize = 0x1000;

/// Size of the register block in bytes.
pub const BLOCK_LEN: usize = 0x40;

pub const PORTA: Reg8 = Reg8(0x00);
pub const PIOC: Reg8 = Reg8(0x02);
pub const PORTC: Reg8 = Reg8(0x03);
pub const PORTB: Reg8 = Reg8(0x04);
pub const DDRC: Reg8 = Reg8(0x07);
pub const PORTD: Reg8 = Reg8(0x08);
pub const DDRD: Reg8 = Reg8(0x09);
pub const PORTE: Reg8 = Reg8(0x0A);
pub const CFORC: Reg8 = Reg8(0x0B);
pub const OC1M: Reg8 = Reg8(0x0C);
pub const OC1D: Reg8 = Reg8(0x0D);
pub const TCNT: Reg16 = Reg16(0x0E);
pub const TIC1: Reg16 = Reg16(0x10);
pub const TIC2: Reg16 = Reg16(0x12);
pub const TIC3: Reg16 = Reg16(0x14);
pub const TOC1: Reg16 = Reg16(0x16);
pub const TOC2: Reg16 = Reg16(0x18);
pub const TOC3: Reg16 = Reg16(0x1A);
pub const TOC4: Reg16 = Reg16(0x1C);
pub const TOC5: Reg16 = Reg16(0x1E);
/// Same address as TOC5; PACTL I4/O5 selects the function.
pub const TIC4: Reg16 = Reg16(0x1E);
pub const TCTL1: Reg8 = Reg8(0x20);
pub const TCTL2: Reg8 = Reg8(0x21);
pub const TMSK1: Reg8 = Reg8(0x22);
pub const TFLG1: FlagReg = FlagReg(0x23);
pub const TMSK2: Reg8 = Reg8(0x24);
pub const TFLG2: FlagReg = FlagReg(0x25);
pub const PACTL: Reg8 = Reg8(0x26);
pub const PACNT: Reg8 = Reg8(0x27);

bitflags! {
    /// TFLG1 / TMSK1 layout.
    #[derive(Debug, Copy, Clone, PartialEq, Eq)]
    pub struct Timer1: u8 {
        const OC1 = 0x80;
        const OC2 = 0x40;
        const OC3 = 0x20;
        const OC4 = 0x10;
        /// OC5 or IC4, per PACTL I4/O5.
        const I4O5 = 0x08;
        const IC1 = 0x04;
        const IC2 = 0x02;
        const IC3 = 0x01;
    }

    /// TFLG2 / TMSK2 layout.
    #[derive(Debug, Copy, Clone, PartialEq, Eq)]
    pub struct Timer2: u8 {
        const TO = 0x80;
        const RTI = 0x40;
        const PAOV = 0x20;
        const PAI = 0x10;
        /// Prescaler select, TMSK2 only.
        const PR1 = 0x02;
        const PR0 = 0x01;
    }

    #[derive(Debug, Copy, Clone, PartialEq, Eq)]
    pub struct Pactl: u8 {
        const DDRA7 = 0x80;
        const PAEN = 0x40;
        const PAMOD = 0x20;
        const PEDGE = 0x10;
        const DDRA3 = 0x08;
        const I4O5 = 0x04;
        const RTR1 = 0x02;
        const RTR0 = 0x01;
    }

    #[derive(Debug, Copy, Clone, PartialEq, Eq)]
    pub struct Cforc: u8 {
        const FOC1 = 0x80;
        const FOC2 = 0x40;
        const FOC3 = 0x20;
        const FOC4 = 0x10;
        const FOC5 = 0x08;
    }

    /// Port A pins.
    #[derive(Debug, Copy, Clone, PartialEq, Eq)]
    pub struct PortA: u8 {
        const PA7 = 0x80;
        const PA6 = 0x40;
        const PA5 = 0x20;
        const PA4 = 0x10;
        const PA3 = 0x08;
        const PA2 = 0x04;
        const PA1 = 0x02;
        const PA0 = 0x01;
    }
}

/// Prescale factors selected by TMSK2 PR1:PR0.
pub const PRESCALES: [u32; 4] = [1, 4, 8, 16];

/// RTI periods in E-cycles selected by PACTL RTR1:RTR0.
pub const RTI_PERIODS: [u32; 4] = [8192, 16384, 32768, 65536];

/// TCTL1 action for output compares 2..5.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum OcAction {
    Disconnected,
    Toggle,
    Clear,
    Set,
}

impl OcAction {
    pub const fn from_bits(bits: u8) -> Self {
        match bits & 0b11 {
            0b00 => OcAction::Disconnected,
            0b01 => OcAction::Toggle,
            0b10 => OcAction::Clear,
            _ => OcAction::Set,
        }
    }

    pub const fn bits(self) -> u8 {
        match self {
            OcAction::Disconnected => 0b00,
            OcAction::Toggle => 0b01,
            OcAction::Clear => 0b10,
            OcAction::Set => 0b11,
        }
    }

    /// Apply the action to the current pin level.
    pub const fn apply(self, high: bool) -> bool {
        match self {
            OcAction::Disconnected => high,
            OcAction::Toggle => !high,
            OcAction::Clear => false,
            OcAction::Set => true,
        }
    }
}

/// TCTL2 edge selection for input captures 1..4.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Edge {
    Off,
    Rising,
    Falling,
    Any,
}

impl Edge {
    pub const fn from_bits(bits: u8) -> Self {
        match bits & 0b11 {
            0b00 => Edge::Off,
            0b01 => Edge::Rising,
            0b10 => Edge::Falling,
            _ => Edge::Any,
        }
    }

    pub const fn bits(self) -> u8 {
        match self {
            Edge::Off => 0b00,
            Edge::Rising => 0b01,
            Edge::Falling => 0b10,
            Edge::Any => 0b11,
        }
    }

    /// Whether a transition to `rising` (true) or falling qualifies.
    pub const fn accepts(self, rising: bool) -> bool {
        match self {
            Edge::Off => false,
            Edge::Rising => rising,
            Edge::Falling => !rising,
            Edge::Any => true,
        }
    }
}

/// Bit position of the OMx/OLx pair in TCTL1, for OC2..OC5.
pub const fn tctl1_shift(oc: u8) -> u32 {
    ((5 - oc) * 2) as u32
}

/// Bit position of the EDGxB/EDGxA pair in TCTL2, for IC1..IC4.
pub const fn tctl2_shift(ic: u8) -> u32 {
    match ic {
        4 => 6,
        1 => 4,
        2 => 2,
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tctl_fields_line_up_with_datasheet() {
        assert_eq!(OcAction::Toggle.bits() << tctl1_shift(2), 0x40);
        assert_eq!(OcAction::Set.bits() << tctl1_shift(5), 0x03);
        assert_eq!(Edge::Any.bits() << tctl2_shift(4), 0xC0);
        assert_eq!(Edge::Rising.bits() << tctl2_shift(1), 0x10);
        assert_eq!(Edge::Falling.bits() << tctl2_shift(3), 0x02);
    }

    #[test]
    fn actions_round_trip_through_bits() {
        for action in [OcAction::Disconnected, OcAction::Toggle, OcAction::Clear, OcAction::Set] {
            assert_eq!(OcAction::from_bits(action.bits()), action);
        }
        assert!(OcAction::Toggle.apply(false));
        assert!(!OcAction::Clear.apply(true));
    }
}
