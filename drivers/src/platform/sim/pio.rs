//! Parallel ports, output-compare pin control and the pulse accumulator.

use super::Hardware;
use super::stimulus::{Pin, Transition};
use crate::hal::gpio::PinLevel;
use crate::hw::hc11::Port;
use crate::hw::hc11::regs::{OcAction, Pactl, PortA, Timer2, tctl1_shift};

/// Gated-mode accumulation rate, in E-cycles per count.
const GATE_DIVIDER: u32 = 64;

/// A recorded change of an output pin.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct PinEdge {
    pub cycle: u64,
    pub port: Port,
    pub bit: u8,
    pub level: PinLevel,
}

/// Port A pin driven by output compare `oc`.
const fn oc_pin(oc: u8) -> u8 {
    1 << (8 - oc)
}

impl Hardware {
    fn pactl_has(&self, flags: Pactl) -> bool {
        Pactl::from_bits_truncate(self.pactl).contains(flags)
    }

    pub(super) fn read_port_a(&self) -> u8 {
        let mut value = (self.pai & 0x07) | (self.pao & 0x70);
        value |= if self.pactl_has(Pactl::DDRA7) {
            self.pao & 0x80
        } else {
            self.pai & 0x80
        };

        let pa3_driven = self.pactl_has(Pactl::DDRA3)
            || (!self.ic4_selected()
                && (OcAction::from_bits(self.tctl1) != OcAction::Disconnected
                    || self.oc1m & PortA::PA3.bits() != 0));
        value |= if pa3_driven {
            self.pao & 0x08
        } else {
            self.pai & 0x08
        };
        value
    }

    /// Recompute the levels driven on PA3..PA7.
    ///
    /// Pins under compare control keep their compare-driven level; the
    /// rest follow the last software write.
    pub(super) fn update_pao(&mut self) {
        let mut mask = self.oc1m;
        for oc in 2..=5u8 {
            if OcAction::from_bits(self.tctl1 >> tctl1_shift(oc)) != OcAction::Disconnected {
                mask |= oc_pin(oc);
            }
        }
        if !self.pactl_has(Pactl::DDRA7) {
            mask &= !PortA::PA7.bits();
        }
        if self.ic4_selected() {
            mask &= !PortA::PA3.bits();
        }
        self.drive_pao(((self.pao & mask) | (self.paw & !mask)) & 0xF8);
    }

    fn drive_pao(&mut self, level: u8) {
        let old = self.pao;
        self.pao = level;
        self.record(Port::A, old, level, 0xF8);
    }

    /// Pin action of a compare match on `oc`.
    pub(super) fn compare_output(&mut self, oc: u8) {
        if oc == 1 {
            let mut level = self.pao;
            for pin in [PortA::PA7, PortA::PA6, PortA::PA5, PortA::PA4, PortA::PA3] {
                let bit = pin.bits();
                if self.oc1m & bit == 0 {
                    continue;
                }
                if (pin == PortA::PA7 && !self.pactl_has(Pactl::DDRA7))
                    || (pin == PortA::PA3 && self.ic4_selected())
                {
                    continue;
                }
                level = (level & !bit) | (self.oc1d & bit);
            }
            self.drive_pao(level);
            return;
        }
        if oc == 5 && self.ic4_selected() {
            return;
        }
        let pin = oc_pin(oc);
        let action = OcAction::from_bits(self.tctl1 >> tctl1_shift(oc));
        let high = action.apply(self.pao & pin != 0);
        self.drive_pao(if high { self.pao | pin } else { self.pao & !pin });
    }

    pub(super) fn write_port_b(&mut self, value: u8) {
        let old = self.portb;
        self.portb = value;
        self.record(Port::B, old, value, 0xFF);
    }

    pub(super) fn read_port_c(&self) -> u8 {
        (self.pci & !self.ddrc) | (self.pcw & self.ddrc)
    }

    pub(super) fn write_port_c(&mut self, latch: u8, ddrc: u8) {
        let old = self.pcw & self.ddrc;
        self.pcw = latch;
        self.ddrc = ddrc;
        self.record(Port::C, old, latch & ddrc, ddrc);
    }

    pub(super) fn read_port_d(&self) -> u8 {
        ((self.pdi & !self.ddrd) | (self.pdw & self.ddrd)) & 0x3F
    }

    pub(super) fn write_port_d(&mut self, latch: u8, ddrd: u8) {
        let old = self.pdw & self.ddrd;
        self.pdw = latch & 0x3F;
        self.ddrd = ddrd & 0x3F;
        self.record(Port::D, old, self.pdw & self.ddrd, self.ddrd);
    }

    fn record(&mut self, port: Port, old: u8, new: u8, outputs: u8) {
        let diff = (old ^ new) & outputs;
        for bit in 0..8u8 {
            if diff & (1 << bit) != 0 {
                self.edges.push(PinEdge {
                    cycle: self.cycle,
                    port,
                    bit,
                    level: PinLevel::from(new & (1 << bit) != 0),
                });
            }
        }
    }

    /// Drive an input pin from the stimulus.
    pub(super) fn apply(&mut self, t: Transition) {
        let high = bool::from(t.level);
        let mask = t.pin.mask();
        let set = |latch: u8| if high { latch | mask } else { latch & !mask };
        match t.pin {
            Pin::A(bit) => {
                let old = self.pai;
                self.pai = set(old);
                if old != self.pai {
                    self.port_a_edge(bit, high);
                }
            }
            Pin::C(_) => self.pci = set(self.pci),
            Pin::D(_) => self.pdi = set(self.pdi),
            Pin::E(_) => self.pei = set(self.pei),
        }
    }

    fn port_a_edge(&mut self, bit: u8, rising: bool) {
        match bit {
            0 => self.input_edge(3, rising),
            1 => self.input_edge(2, rising),
            2 => self.input_edge(1, rising),
            3 => self.input_edge(4, rising),
            7 => {
                let pactl = Pactl::from_bits_truncate(self.pactl);
                let counting = pactl & (Pactl::DDRA7 | Pactl::PAEN | Pactl::PAMOD) == Pactl::PAEN;
                if counting && rising == pactl.contains(Pactl::PEDGE) {
                    self.set_tflg2(Timer2::PAI);
                    self.count_pulse();
                }
            }
            _ => {}
        }
    }

    fn count_pulse(&mut self) {
        self.pacnt = self.pacnt.wrapping_add(1);
        if self.pacnt == 0 {
            self.set_tflg2(Timer2::PAOV);
        }
    }

    /// Gated time accumulation: one count every 64 E-cycles while PAI
    /// is at the level selected by PEDGE. No PAIF in this mode.
    pub(super) fn tick_gate(&mut self) {
        let pactl = Pactl::from_bits_truncate(self.pactl);
        if !pactl.contains(Pactl::PAEN) || pactl & (Pactl::PAMOD | Pactl::DDRA7) != Pactl::PAMOD {
            return;
        }
        let pa7_high = self.pai & PortA::PA7.bits() != 0;
        if pa7_high == pactl.contains(Pactl::PEDGE) {
            return;
        }
        self.gate_count += 1;
        if self.gate_count >= GATE_DIVIDER {
            self.gate_count = 0;
            self.count_pulse();
        }
    }
}
