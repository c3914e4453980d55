//! Pulse accumulator demos.
//!
//! PA7 is an input counting rising edges into PACNT. PAIF latches on every
//! counted edge, PAOVF when PACNT wraps from 0xFF to 0x00.

use core::fmt::Write;

use common::sync::{IrqControl, IrqGuard, Overflow, channel};
use drivers::hal::interrupt::install;
use drivers::hal::register::RegisterBus;
use drivers::hal::timer::EventSource;
use drivers::hw::hc11::regs::{self, Pactl, Timer2};
use drivers::hw::hc11::{Rearm, Source, SourceId};

use crate::{DemoConfig, DemoError, Target, await_fired, receive};

fn count_rising_edges<D: Target + ?Sized>(dev: &mut D, preload: u8) {
    dev.modify8(regs::PACTL, Pactl::DDRA7.bits(), 0);
    dev.write8(regs::PACNT, preload);
    dev.modify8(regs::PACTL, Pactl::PAMOD.bits(), (Pactl::PAEN | Pactl::PEDGE).bits());
}

/// Preload PACNT so it overflows after `256 - preload` edges, take the
/// overflow interrupt once, then poll PAIF until PACNT reaches 4.
pub fn overflow_after<D, W>(dev: &mut D, out: &mut W, cfg: &DemoConfig, preload: u8) -> Result<(), DemoError>
where
    D: Target + ?Sized,
    W: Write + ?Sized,
{
    let mut paov = Source::new(SourceId::PulseOverflow);
    let mut pai = Source::new(SourceId::PulseEdge);
    let (mut tx, mut rx) = channel::<(u16, u8)>(Overflow::DropNew);

    {
        let mut cs = IrqGuard::new(dev);
        install(&mut cs, SourceId::PulseOverflow.vector(), move |frame| {
            let at = frame.bus().read16(regs::TCNT);
            let ack = SourceId::PulseOverflow.acknowledge(frame, Rearm::OneShot);
            frame.bus().clear_flags(regs::TFLG2, Timer2::PAI.bits());
            let count = ack.data() as u8;
            ack.publish(&mut tx, (at, count));
        })?;
    }

    count_rising_edges(dev, preload);
    paov.arm(dev)?;
    dev.enable();
    let (at, count) = receive(dev, &mut rx, cfg)?;
    writeln!(out, "PACNT overflow at {:04X}, PACNT {:02X}", at, count)?;

    pai.arm_polled(dev)?;
    while dev.read8(regs::PACNT) < 4 {
        let count = await_fired(dev, &mut pai, cfg)?;
        writeln!(out, "PA7 edge, PACNT {:02X}", count)?;
    }
    dev.disable();
    Ok(())
}

/// Take one pulse-edge interrupt.
pub fn edge_interrupt<D, W>(dev: &mut D, out: &mut W, cfg: &DemoConfig) -> Result<(), DemoError>
where
    D: Target + ?Sized,
    W: Write + ?Sized,
{
    let mut pai = Source::new(SourceId::PulseEdge);
    let (mut tx, mut rx) = channel::<(u16, u8)>(Overflow::DropNew);

    {
        let mut cs = IrqGuard::new(dev);
        install(&mut cs, SourceId::PulseEdge.vector(), move |frame| {
            let at = frame.bus().read16(regs::TCNT);
            let ack = SourceId::PulseEdge.acknowledge(frame, Rearm::OneShot);
            let count = ack.data() as u8;
            ack.publish(&mut tx, (at, count));
        })?;
    }

    count_rising_edges(dev, 0);
    pai.arm(dev)?;
    dev.enable();
    let (at, count) = receive(dev, &mut rx, cfg)?;
    dev.disable();
    writeln!(out, "PA7 edge interrupt at {:04X}, PACNT {:02X}", at, count)?;
    Ok(())
}
