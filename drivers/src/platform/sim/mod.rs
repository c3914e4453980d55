//! Cycle-stepped 68HC11 timer and parallel I/O simulator.
//!
//! [`Hardware`] is the register block. Every register access costs
//! [`SimConfig::access_cycles`] E-cycles, and simulated time only moves
//! through accesses or [`SimDevice::run`], so a busy-wait on TCNT makes
//! progress the way it does on the part.
//!
//! [`SimDevice`] adds the CPU side: the CCR I bit, the vector table and
//! interrupt dispatch. After each access made by the foreground it takes
//! at most one pending interrupt, highest priority first. Accesses made
//! from inside a handler go straight to the [`Hardware`] and never
//! dispatch.

mod pio;
mod stimulus;
mod timer;

use alloc::vec::Vec;
use core::mem;

use common::sync::IrqControl;

pub use pio::PinEdge;
pub use stimulus::{Pin, Stimulus, StimulusError, Transition};

use crate::hal::interrupt::{Handler, IsrFrame, VectorTable};
use crate::hal::register::{FlagReg, Reg8, Reg16, RegisterBus};
use crate::hw::hc11::regs::{self, BLOCK_LEN};
use crate::hw::hc11::{VECTOR_COUNT, Vector, VectorError};

/// Timing parameters, in E-cycles.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct SimConfig {
    /// Cost of one register access.
    pub access_cycles: u32,
    /// Cost of stacking registers and fetching the vector.
    pub entry_cycles: u32,
    /// Cost of the return-from-interrupt.
    pub exit_cycles: u32,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            access_cycles: 4,
            entry_cycles: 14,
            exit_cycles: 12,
        }
    }
}

/// Flag registers seen as plain offsets.
const TFLG1: Reg8 = Reg8(regs::TFLG1.offset());
const TFLG2: Reg8 = Reg8(regs::TFLG2.offset());

/// Simulated register block and pins.
#[derive(Debug, Clone)]
pub struct Hardware {
    config: SimConfig,
    cycle: u64,

    // free-running counter and RTI
    prescale_count: u32,
    tcnt: u16,
    rti_count: u32,
    toc: [u16; 5],
    tic: [u16; 4],
    tflg1: u8,
    oc5f: bool,
    ic4f: bool,
    tflg2: u8,
    tmsk1: u8,
    tmsk2: u8,
    tctl1: u8,
    tctl2: u8,
    pactl: u8,
    oc1m: u8,
    oc1d: u8,

    // pulse accumulator
    pacnt: u8,
    gate_count: u32,

    // ports: inputs driven by the stimulus, software-written latches and
    // the levels actually driven
    pai: u8,
    paw: u8,
    pao: u8,
    portb: u8,
    pci: u8,
    pcw: u8,
    ddrc: u8,
    pdi: u8,
    pdw: u8,
    ddrd: u8,
    pei: u8,
    pioc: u8,

    /// Registers with no modelled behaviour.
    spare: [u8; BLOCK_LEN],
    stimulus: Stimulus,
    edges: Vec<PinEdge>,
}

impl Hardware {
    /// Register block in its reset state.
    pub fn new(config: SimConfig) -> Self {
        Self {
            config,
            cycle: 0,
            prescale_count: 0,
            tcnt: 0,
            rti_count: 0,
            toc: [0xFFFF; 5],
            tic: [0; 4],
            tflg1: 0,
            oc5f: false,
            ic4f: false,
            tflg2: 0,
            tmsk1: 0,
            tmsk2: 0,
            tctl1: 0,
            tctl2: 0,
            pactl: 0,
            oc1m: 0,
            oc1d: 0,
            pacnt: 0,
            gate_count: 0,
            pai: 0,
            paw: 0,
            pao: 0,
            portb: 0,
            pci: 0,
            pcw: 0,
            ddrc: 0,
            pdi: 0,
            pdw: 0,
            ddrd: 0,
            pei: 0,
            pioc: 0,
            spare: [0; BLOCK_LEN],
            stimulus: Stimulus::new(),
            edges: Vec::new(),
        }
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// E-cycles since reset.
    pub fn cycle(&self) -> u64 {
        self.cycle
    }

    /// Free-running counter, without the cost of an access.
    pub fn counter(&self) -> u16 {
        self.tcnt
    }

    /// Levels currently driven on PA3..PA7.
    pub fn port_a_outputs(&self) -> u8 {
        self.pao & 0xF8
    }

    /// Replace the pending input transitions.
    pub fn set_stimulus(&mut self, stimulus: Stimulus) {
        self.stimulus = stimulus;
    }

    /// Output pin changes recorded since reset or the last take.
    pub fn edges(&self) -> &[PinEdge] {
        &self.edges
    }

    pub fn take_edges(&mut self) -> Vec<PinEdge> {
        mem::take(&mut self.edges)
    }

    /// Let `cycles` E-cycles pass.
    pub fn advance(&mut self, cycles: u32) {
        for _ in 0..cycles {
            self.cycle += 1;
            self.tick_timer();
            while let Some(t) = self.stimulus.next_due(self.cycle) {
                self.apply(t);
            }
            self.tick_gate();
        }
    }

    fn access(&mut self) {
        self.advance(self.config.access_cycles);
    }

    fn load(&self, offset: u16) -> u8 {
        if (regs::TCNT.offset()..=regs::TOC5.offset() + 1).contains(&offset) {
            let [hi, lo] = self.load16(offset & !1).to_be_bytes();
            return if offset & 1 == 0 { hi } else { lo };
        }
        match Reg8(offset) {
            regs::PORTA => self.read_port_a(),
            regs::PIOC => self.pioc,
            regs::PORTC => self.read_port_c(),
            regs::PORTB => self.portb,
            regs::DDRC => self.ddrc,
            regs::PORTD => self.read_port_d(),
            regs::DDRD => self.ddrd,
            regs::PORTE => self.pei,
            regs::CFORC => 0,
            regs::OC1M => self.oc1m,
            regs::OC1D => self.oc1d,
            regs::TCTL1 => self.tctl1,
            regs::TCTL2 => self.tctl2,
            regs::TMSK1 => self.tmsk1,
            TFLG1 => self.tflg1(),
            regs::TMSK2 => self.tmsk2,
            TFLG2 => self.tflg2,
            regs::PACTL => self.pactl,
            regs::PACNT => self.pacnt,
            _ => self.spare.get(usize::from(offset)).copied().unwrap_or(0),
        }
    }

    fn store(&mut self, offset: u16, value: u8) {
        if (regs::TCNT.offset()..=regs::TOC5.offset() + 1).contains(&offset) {
            let base = offset & !1;
            let [hi, lo] = self.load16(base).to_be_bytes();
            let word = if offset & 1 == 0 {
                u16::from_be_bytes([value, lo])
            } else {
                u16::from_be_bytes([hi, value])
            };
            self.store16(base, word);
            return;
        }
        match Reg8(offset) {
            regs::PORTA => {
                self.paw = value;
                self.update_pao();
            }
            regs::PIOC => self.pioc = value,
            regs::PORTC => self.write_port_c(value, self.ddrc),
            regs::PORTB => self.write_port_b(value),
            regs::DDRC => self.write_port_c(self.pcw, value),
            regs::PORTD => self.write_port_d(value, self.ddrd),
            regs::DDRD => self.write_port_d(self.pdw, value),
            regs::PORTE => {}
            regs::CFORC => self.force_compares(value),
            regs::OC1M => {
                self.oc1m = value & 0xF8;
                self.update_pao();
            }
            regs::OC1D => self.oc1d = value & 0xF8,
            regs::TCTL1 => {
                self.tctl1 = value;
                self.update_pao();
            }
            regs::TCTL2 => self.tctl2 = value,
            regs::TMSK1 => self.tmsk1 = value,
            TFLG1 => self.clear_tflg1(value),
            regs::TMSK2 => self.tmsk2 = value,
            TFLG2 => self.tflg2 &= !value,
            regs::PACTL => {
                self.pactl = value;
                self.update_pao();
            }
            regs::PACNT => self.pacnt = value,
            _ => {
                if let Some(cell) = self.spare.get_mut(usize::from(offset)) {
                    *cell = value;
                }
            }
        }
    }

    fn load16(&self, offset: u16) -> u16 {
        match Reg16(offset) {
            regs::TCNT => self.tcnt,
            regs::TIC1 => self.tic[0],
            regs::TIC2 => self.tic[1],
            regs::TIC3 => self.tic[2],
            regs::TOC1 => self.toc[0],
            regs::TOC2 => self.toc[1],
            regs::TOC3 => self.toc[2],
            regs::TOC4 => self.toc[3],
            regs::TOC5 if self.ic4_selected() => self.tic[3],
            regs::TOC5 => self.toc[4],
            _ => u16::from_be_bytes([self.load(offset), self.load(offset + 1)]),
        }
    }

    fn store16(&mut self, offset: u16, value: u16) {
        match Reg16(offset) {
            // counter and captures are read-only
            regs::TCNT | regs::TIC1 | regs::TIC2 | regs::TIC3 => {}
            regs::TOC1 => self.toc[0] = value,
            regs::TOC2 => self.toc[1] = value,
            regs::TOC3 => self.toc[2] = value,
            regs::TOC4 => self.toc[3] = value,
            regs::TOC5 => self.toc[4] = value,
            _ => {
                let [hi, lo] = value.to_be_bytes();
                self.store(offset, hi);
                self.store(offset + 1, lo);
            }
        }
    }
}

impl RegisterBus for Hardware {
    fn read8(&mut self, reg: Reg8) -> u8 {
        self.access();
        self.load(reg.offset())
    }

    fn write8(&mut self, reg: Reg8, value: u8) {
        self.access();
        self.store(reg.offset(), value);
    }

    fn read16(&mut self, reg: Reg16) -> u16 {
        self.access();
        self.load16(reg.offset())
    }

    fn write16(&mut self, reg: Reg16, value: u16) {
        self.access();
        self.store16(reg.offset(), value);
    }

    fn read_flags(&mut self, reg: FlagReg) -> u8 {
        self.access();
        self.load(reg.offset())
    }

    fn clear_flags(&mut self, reg: FlagReg, mask: u8) {
        self.access();
        self.store(reg.offset(), mask);
    }
}

/// Simulated part: register block plus CPU interrupt logic.
pub struct SimDevice {
    hw: Hardware,
    handlers: [Option<Handler>; VECTOR_COUNT],
    /// CCR I bit. Set out of reset.
    masked: bool,
    unhandled: Option<Vector>,
    taken: [u32; VECTOR_COUNT],
}

impl Default for SimDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl SimDevice {
    pub fn new() -> Self {
        Self::with_config(SimConfig::default())
    }

    pub fn with_config(config: SimConfig) -> Self {
        Self {
            hw: Hardware::new(config),
            handlers: core::array::from_fn(|_| None),
            masked: true,
            unhandled: None,
            taken: [0; VECTOR_COUNT],
        }
    }

    pub fn with_stimulus(mut self, stimulus: Stimulus) -> Self {
        self.hw.set_stimulus(stimulus);
        self
    }

    pub fn hardware(&self) -> &Hardware {
        &self.hw
    }

    /// Number of times the handler for `vector` has run.
    pub fn taken(&self, vector: Vector) -> u32 {
        self.taken[vector.index()]
    }

    /// Let time pass with no foreground accesses, taking interrupts as
    /// they become pending.
    pub fn run(&mut self, cycles: u32) {
        let step = self.hw.config.access_cycles.max(1);
        let mut left = cycles;
        while left > 0 {
            let n = step.min(left);
            self.hw.advance(n);
            self.service();
            left -= n;
        }
    }

    fn service(&mut self) {
        if self.masked || self.unhandled.is_some() {
            return;
        }
        if let Some(vector) = self.hw.pending() {
            self.dispatch(vector);
        }
    }

    fn dispatch(&mut self, vector: Vector) {
        let Some(mut handler) = self.handlers[vector.index()].take() else {
            log::warn!("unhandled interrupt {:?}, dispatching stopped", vector);
            self.unhandled = Some(vector);
            return;
        };

        self.masked = true;
        self.hw.advance(self.hw.config.entry_cycles);
        log::trace!("taking {:?} at cycle {}", vector, self.hw.cycle);
        handler(&mut IsrFrame::new(&mut self.hw));
        self.hw.advance(self.hw.config.exit_cycles);
        self.handlers[vector.index()] = Some(handler);
        self.taken[vector.index()] += 1;
        self.masked = false;
    }
}

impl RegisterBus for SimDevice {
    fn read8(&mut self, reg: Reg8) -> u8 {
        let value = self.hw.read8(reg);
        self.service();
        value
    }

    fn write8(&mut self, reg: Reg8, value: u8) {
        self.hw.write8(reg, value);
        self.service();
    }

    fn read16(&mut self, reg: Reg16) -> u16 {
        let value = self.hw.read16(reg);
        self.service();
        value
    }

    fn write16(&mut self, reg: Reg16, value: u16) {
        self.hw.write16(reg, value);
        self.service();
    }

    fn read_flags(&mut self, reg: FlagReg) -> u8 {
        let value = self.hw.read_flags(reg);
        self.service();
        value
    }

    fn clear_flags(&mut self, reg: FlagReg, mask: u8) {
        self.hw.clear_flags(reg, mask);
        self.service();
    }
}

impl IrqControl for SimDevice {
    /// Whether the gate was open.
    type State = bool;

    fn disable(&mut self) -> bool {
        let was_open = !self.masked;
        self.masked = true;
        was_open
    }

    fn restore(&mut self, was_open: bool) {
        if was_open {
            self.masked = false;
            self.service();
        }
    }

    fn enable(&mut self) {
        self.masked = false;
        self.service();
    }

    fn enabled(&self) -> bool {
        !self.masked
    }
}

impl VectorTable for SimDevice {
    type Vector = Vector;
    type Error = VectorError;

    unsafe fn bind(&mut self, vector: Vector, handler: Handler) -> Result<(), VectorError> {
        let slot = &mut self.handlers[vector.index()];
        if slot.is_some() {
            return Err(VectorError::Occupied(vector));
        }
        *slot = Some(handler);
        Ok(())
    }

    fn is_bound(&self, vector: Vector) -> bool {
        self.handlers[vector.index()].is_some()
    }

    fn unhandled(&self) -> Option<Vector> {
        self.unhandled
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hal::gpio::PinLevel;
    use crate::hal::interrupt::install;
    use crate::hw::hc11::regs::{OcAction, Pactl, Timer1, Timer2, tctl1_shift};
    use crate::hw::hc11::{Port, Rearm, SourceId};
    use common::sync::{IrqGuard, Overflow, channel};

    #[test]
    fn counter_follows_prescaler() {
        let mut hw = Hardware::new(SimConfig::default());
        let a = hw.read16(regs::TCNT);
        let b = hw.read16(regs::TCNT);
        assert_eq!(b.wrapping_sub(a), 4);

        hw.write8(regs::TMSK2, (Timer2::PR1 | Timer2::PR0).bits());
        let start = hw.counter();
        hw.advance(160);
        assert_eq!(hw.counter().wrapping_sub(start), 10);
    }

    #[test]
    fn compare_registers_reset_high() {
        let mut hw = Hardware::new(SimConfig::default());
        assert_eq!(hw.read16(regs::TOC3), 0xFFFF);
        hw.write8(regs::TOC3.low(), 0x12);
        assert_eq!(hw.read16(regs::TOC3), 0xFF12);
    }

    #[test]
    fn flags_clear_only_where_one_is_written() {
        let mut hw = Hardware::new(SimConfig::default());
        hw.advance(65536);
        let flags = hw.read_flags(regs::TFLG2);
        assert_eq!(flags & Timer2::TO.bits(), Timer2::TO.bits());
        assert_eq!(flags & Timer2::RTI.bits(), Timer2::RTI.bits());

        hw.clear_flags(regs::TFLG2, Timer2::TO.bits());
        let flags = hw.read_flags(regs::TFLG2);
        assert_eq!(flags & Timer2::TO.bits(), 0);
        assert_ne!(flags & Timer2::RTI.bits(), 0);
    }

    #[test]
    fn compare_toggles_its_pin_once() {
        let mut hw = Hardware::new(SimConfig::default());
        hw.write8(regs::TCTL1, OcAction::Toggle.bits() << tctl1_shift(2));
        hw.write16(regs::TOC2, 2004);
        hw.clear_flags(regs::TFLG1, Timer1::OC2.bits());
        hw.advance(3000);

        assert_eq!(
            hw.edges(),
            [PinEdge {
                cycle: 2004,
                port: Port::A,
                bit: 6,
                level: PinLevel::High,
            }]
        );
        assert_ne!(hw.read_flags(regs::TFLG1) & Timer1::OC2.bits(), 0);

        assert_eq!(hw.take_edges().len(), 1);
        hw.advance(3000);
        assert!(hw.edges().is_empty());
    }

    #[test]
    fn force_applies_action_and_latches_flag() {
        let mut hw = Hardware::new(SimConfig::default());
        hw.write8(regs::PACTL, Pactl::DDRA3.bits());
        hw.write8(regs::TCTL1, OcAction::Set.bits() << tctl1_shift(5));
        hw.write8(regs::CFORC, 0x08);
        assert_eq!(hw.port_a_outputs(), 0x08);
        assert_eq!(hw.read_flags(regs::TFLG1), Timer1::I4O5.bits());
    }

    #[test]
    fn capture_latches_counter_on_selected_edge() {
        let stimulus = Stimulus::new()
            .at(100, Pin::A(2), PinLevel::High)
            .and_then(|s| s.at(150, Pin::A(2), PinLevel::Low))
            .unwrap();
        let mut hw = Hardware::new(SimConfig::default());
        hw.set_stimulus(stimulus);
        hw.write8(regs::TCTL2, 0x10);
        hw.advance(200);

        assert_eq!(hw.read16(regs::TIC1), 100);
        assert_ne!(hw.read_flags(regs::TFLG1) & Timer1::IC1.bits(), 0);
    }

    #[test]
    fn pulse_accumulator_rolls_over_on_sixth_edge() {
        let mut hw = Hardware::new(SimConfig::default());
        hw.set_stimulus(Stimulus::new().square_wave(Pin::A(7), 100, 50, 12).unwrap());
        hw.write8(regs::PACNT, 250);
        hw.write8(regs::PACTL, (Pactl::PAEN | Pactl::PEDGE).bits());

        hw.advance(550 - hw.cycle() as u32);
        assert_eq!(hw.read_flags(regs::TFLG2) & Timer2::PAOV.bits(), 0);
        assert_eq!(hw.read8(regs::PACNT), 255);

        hw.advance(650 - hw.cycle() as u32);
        assert_ne!(hw.read_flags(regs::TFLG2) & Timer2::PAOV.bits(), 0);
        assert_eq!(hw.read8(regs::PACNT), 0);
    }

    #[test]
    fn gated_mode_counts_every_64_cycles() {
        let mut hw = Hardware::new(SimConfig::default());
        hw.set_stimulus(Stimulus::new().at(0, Pin::A(7), PinLevel::High).unwrap());
        hw.write8(regs::PACTL, (Pactl::PAEN | Pactl::PAMOD).bits());
        hw.advance(640);
        let count = hw.read8(regs::PACNT);
        assert!((10..=11).contains(&count), "count {count}");
        assert_eq!(hw.read_flags(regs::TFLG2) & Timer2::PAI.bits(), 0);
    }

    #[test]
    fn handler_runs_once_per_event_with_gate_open() {
        let mut dev = SimDevice::new();
        let (mut tx, mut rx) = channel::<u16>(Overflow::Overwrite);
        {
            let mut cs = IrqGuard::new(&mut dev);
            install(&mut cs, Vector::RealTime, move |frame| {
                SourceId::RealTime
                    .acknowledge(frame, Rearm::Repeat)
                    .publish_data(&mut tx);
            })
            .unwrap();
            cs.write8(regs::TMSK2, Timer2::RTI.bits());
        }

        dev.run(9000);
        assert_eq!(dev.taken(Vector::RealTime), 0, "gate is closed out of reset");

        dev.enable();
        assert_eq!(dev.taken(Vector::RealTime), 1);
        assert!(rx.take().is_some());
        dev.run(1000);
        assert_eq!(dev.taken(Vector::RealTime), 1);
    }

    #[test]
    fn unhandled_interrupt_stops_dispatch() {
        let mut dev = SimDevice::new();
        dev.write8(regs::TMSK2, Timer2::RTI.bits());
        dev.enable();
        dev.run(9000);
        assert_eq!(dev.unhandled(), Some(Vector::RealTime));
    }

    #[test]
    fn second_install_is_rejected() {
        let mut dev = SimDevice::new();
        let mut cs = IrqGuard::new(&mut dev);
        install(&mut cs, Vector::Oc2, |_| {}).unwrap();
        assert_eq!(
            install(&mut cs, Vector::Oc2, |_| {}),
            Err(VectorError::Occupied(Vector::Oc2))
        );
        assert!(cs.is_bound(Vector::Oc2));
    }
}
