//! Free-running counter, compares, captures, RTI and the timer flags.

use super::Hardware;
use crate::hw::hc11::regs::{self, Cforc, Edge, Pactl, PRESCALES, RTI_PERIODS, Timer1, Timer2, tctl2_shift};
use crate::hw::hc11::{SourceId, Vector};

const PR_MASK: u8 = Timer2::PR1.bits() | Timer2::PR0.bits();
const RTR_MASK: u8 = Pactl::RTR1.bits() | Pactl::RTR0.bits();
/// Flags that live in TFLG2.
const TFLG2_MASK: u8 = 0xF0;

impl Hardware {
    pub(super) fn ic4_selected(&self) -> bool {
        self.pactl & Pactl::I4O5.bits() != 0
    }

    /// One E-cycle of the counter chain.
    pub(super) fn tick_timer(&mut self) {
        self.prescale_count += 1;
        if self.prescale_count >= PRESCALES[usize::from(self.tmsk2 & PR_MASK)] {
            self.prescale_count = 0;
            self.tcnt = self.tcnt.wrapping_add(1);
            if self.tcnt == 0 {
                self.tflg2 |= Timer2::TO.bits();
            }
            for oc in 1..=5u8 {
                if self.toc[usize::from(oc - 1)] == self.tcnt {
                    self.output_compare(oc);
                }
            }
        }

        // RTI runs off the E clock, ahead of the prescaler
        self.rti_count += 1;
        if self.rti_count >= RTI_PERIODS[usize::from(self.pactl & RTR_MASK)] {
            self.rti_count = 0;
            self.tflg2 |= Timer2::RTI.bits();
        }
    }

    fn output_compare(&mut self, oc: u8) {
        match oc {
            1 => self.tflg1 |= Timer1::OC1.bits(),
            2 => self.tflg1 |= Timer1::OC2.bits(),
            3 => self.tflg1 |= Timer1::OC3.bits(),
            4 => self.tflg1 |= Timer1::OC4.bits(),
            _ => self.oc5f = true,
        }
        self.compare_output(oc);
    }

    /// CFORC write: act as if each selected compare matched now.
    pub(super) fn force_compares(&mut self, value: u8) {
        let forced = Cforc::from_bits_truncate(value);
        for (oc, bit) in [
            (1, Cforc::FOC1),
            (2, Cforc::FOC2),
            (3, Cforc::FOC3),
            (4, Cforc::FOC4),
            (5, Cforc::FOC5),
        ] {
            if !forced.contains(bit) || (oc == 5 && self.ic4_selected()) {
                continue;
            }
            log::trace!("OC{} forced at cycle {}", oc, self.cycle);
            self.output_compare(oc);
        }
    }

    /// Latch the counter into TICx if the edge qualifies.
    pub(super) fn input_edge(&mut self, ic: u8, rising: bool) {
        if ic == 4 && !self.ic4_selected() {
            return;
        }
        let edge = Edge::from_bits(self.tctl2 >> tctl2_shift(ic));
        if !edge.accepts(rising) {
            return;
        }
        self.tic[usize::from(ic - 1)] = self.tcnt;
        match ic {
            1 => self.tflg1 |= Timer1::IC1.bits(),
            2 => self.tflg1 |= Timer1::IC2.bits(),
            3 => self.tflg1 |= Timer1::IC3.bits(),
            _ => self.ic4f = true,
        }
    }

    /// TFLG1 as software sees it. Bit 3 is OC5F or IC4F per PACTL I4/O5.
    pub(super) fn tflg1(&self) -> u8 {
        let shared = if self.ic4_selected() { self.ic4f } else { self.oc5f };
        let bit3 = if shared { Timer1::I4O5.bits() } else { 0 };
        (self.tflg1 & !Timer1::I4O5.bits()) | bit3
    }

    pub(super) fn clear_tflg1(&mut self, mask: u8) {
        self.tflg1 &= !(mask & !Timer1::I4O5.bits());
        if mask & Timer1::I4O5.bits() != 0 {
            if self.ic4_selected() {
                self.ic4f = false;
            } else {
                self.oc5f = false;
            }
        }
    }

    pub(super) fn set_tflg2(&mut self, flags: Timer2) {
        self.tflg2 |= flags.bits() & TFLG2_MASK;
    }

    /// Highest-priority interrupt with both flag and mask set.
    pub fn pending(&self) -> Option<Vector> {
        let tflg1 = self.tflg1() & self.tmsk1;
        let tflg2 = self.tflg2 & self.tmsk2 & TFLG2_MASK;
        SourceId::ALL
            .iter()
            .filter(|id| {
                let flags = if id.flag_reg() == regs::TFLG1 { tflg1 } else { tflg2 };
                flags & id.bit() != 0
            })
            .map(|id| id.vector())
            .min_by_key(|v| v.priority())
    }
}
