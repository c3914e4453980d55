//! Output compare demos.
//!
//! OC1 drives any of PA3..PA7 at once through OC1M/OC1D; OC2..OC5 each
//! drive one pin through their TCTL1 action.

use core::fmt::Write;

use common::sync::{IrqControl, IrqGuard, Overflow, channel};
use drivers::hal::gpio::ParallelPort;
use drivers::hal::interrupt::install;
use drivers::hal::register::RegisterBus;
use drivers::hal::timer::{EventSource, ForcedEvent};
use drivers::hw::hc11::regs::{self, OcAction, Pactl, PortA, tctl1_shift};
use drivers::hw::hc11::{Port, Rearm, Source, SourceId, Vector};

use crate::{DemoConfig, DemoError, Target, await_fired, receive};

/// Push the compare target one interval on and wait for the match.
fn next_match<D>(dev: &mut D, oc: &mut Source, cfg: &DemoConfig) -> Result<u16, DemoError>
where
    D: Target + ?Sized,
{
    oc.compare_next(dev, cfg.interval)?;
    oc.clear(dev)?;
    await_fired(dev, oc, cfg)
}

fn set_action<D: Target + ?Sized>(dev: &mut D, oc: u8, action: OcAction) {
    let shift = tctl1_shift(oc);
    dev.modify8(regs::TCTL1, 0b11 << shift, action.bits() << shift);
}

/// OC2 polled three times, toggling PA6 in software after each match.
pub fn toggle<D, W>(dev: &mut D, out: &mut W, cfg: &DemoConfig) -> Result<(), DemoError>
where
    D: Target + ?Sized,
    W: Write + ?Sized,
{
    let mut oc2 = Source::new(SourceId::Oc2);
    oc2.arm_polled(dev)?;
    for _ in 0..3 {
        oc2.compare_in(dev, cfg.interval)?;
        oc2.clear(dev)?;
        let at = await_fired(dev, &mut oc2, cfg)?;
        Port::A.toggle(dev, PortA::PA6.bits())?;
        writeln!(out, "OC2 match at {:04X}, PORTA {:02X}", at, Port::A.read(dev)?)?;
    }
    Ok(())
}

/// OC1 walking a one through PA3..PA7.
///
/// Polled matches shift ones in from PA3, handler matches shift them back
/// out, and a final forced compare raises PA3 and PA7 together.
pub fn toc1<D, W>(dev: &mut D, out: &mut W, cfg: &DemoConfig) -> Result<(), DemoError>
where
    D: Target + ?Sized,
    W: Write + ?Sized,
{
    let mut oc1 = Source::new(SourceId::Oc1);
    let (mut tx, mut rx) = channel::<u8>(Overflow::Overwrite);
    let interval = cfg.interval;

    {
        let mut cs = IrqGuard::new(dev);
        install(&mut cs, Vector::Oc1, move |frame| {
            let ack = SourceId::Oc1.acknowledge(frame, Rearm::Repeat);
            let bus = frame.bus();
            let data = bus.read8(regs::OC1D) >> 1;
            bus.write8(regs::OC1D, data);
            SourceId::Oc1.advance_compare(bus, interval);
            let data = bus.read8(regs::OC1D);
            ack.publish(&mut tx, data);
        })?;
    }

    Port::A.write(dev, 0)?;
    dev.write8(regs::PACTL, (Pactl::DDRA3 | Pactl::DDRA7).bits());
    dev.write8(regs::OC1M, 0xF8);
    dev.write8(regs::OC1D, 0);
    oc1.arm_polled(dev)?;
    oc1.compare_in(dev, 0)?;

    for _ in 0..5 {
        let data = dev.read8(regs::OC1D);
        dev.write8(regs::OC1D, (data << 1) | PortA::PA3.bits());
        let at = next_match(dev, &mut oc1, cfg)?;
        writeln!(out, "OC1 match at {:04X}, PORTA {:02X}", at, Port::A.read(dev)?)?;
    }

    oc1.compare_next(dev, interval)?;
    oc1.arm(dev)?;
    dev.enable();
    for _ in 0..5 {
        let data = receive(dev, &mut rx, cfg)?;
        writeln!(out, "OC1 interrupt, OC1D {:02X}", data)?;
    }
    oc1.disarm(dev)?;
    dev.disable();

    dev.write8(regs::OC1D, (PortA::PA3 | PortA::PA7).bits());
    oc1.force(dev)?;
    oc1.clear(dev)?;
    writeln!(out, "OC1 forced, PORTA {:02X}", Port::A.read(dev)?)?;
    Ok(())
}

/// OC5 on PA3 through every pin-control path.
///
/// Software edges after polled matches, the set and clear actions, two
/// toggles, a handler toggling the pin itself, then two forced toggles.
pub fn toc5<D, W>(dev: &mut D, out: &mut W, cfg: &DemoConfig) -> Result<(), DemoError>
where
    D: Target + ?Sized,
    W: Write + ?Sized,
{
    let mut oc5 = Source::new(SourceId::Oc5);
    let (mut tx, mut rx) = channel::<u8>(Overflow::DropNew);
    let interval = cfg.interval;

    // OC5 rather than IC4, PA3 an output
    dev.write8(regs::PACTL, Pactl::DDRA3.bits());
    {
        let mut cs = IrqGuard::new(dev);
        install(&mut cs, Vector::Oc5Ic4, move |frame| {
            let ack = SourceId::Oc5.acknowledge(frame, Rearm::Repeat);
            let bus = frame.bus();
            let level = bus.read8(regs::PORTA) ^ PortA::PA3.bits();
            bus.write8(regs::PORTA, level);
            SourceId::Oc5.advance_compare(bus, interval);
            let level = bus.read8(regs::PORTA);
            ack.publish(&mut tx, level);
        })?;
    }

    Port::A.write(dev, 0)?;
    oc5.arm_polled(dev)?;
    oc5.compare_in(dev, 0)?;
    next_match(dev, &mut oc5, cfg)?;
    Port::A.set_bits(dev, PortA::PA3.bits())?;
    writeln!(out, "OC5 software set, PORTA {:02X}", Port::A.read(dev)?)?;
    next_match(dev, &mut oc5, cfg)?;
    Port::A.clear_bits(dev, PortA::PA3.bits())?;
    writeln!(out, "OC5 software clear, PORTA {:02X}", Port::A.read(dev)?)?;

    for action in [OcAction::Set, OcAction::Clear, OcAction::Toggle, OcAction::Toggle] {
        oc5.compare_next(dev, interval)?;
        oc5.clear(dev)?;
        set_action(dev, 5, action);
        let at = await_fired(dev, &mut oc5, cfg)?;
        writeln!(out, "OC5 {:?} at {:04X}, PORTA {:02X}", action, at, Port::A.read(dev)?)?;
    }

    set_action(dev, 5, OcAction::Disconnected);
    oc5.compare_next(dev, interval)?;
    oc5.arm(dev)?;
    dev.enable();
    for _ in 0..2 {
        let level = receive(dev, &mut rx, cfg)?;
        writeln!(out, "OC5 interrupt, PORTA {:02X}", level)?;
    }
    dev.disable();
    oc5.disarm(dev)?;

    set_action(dev, 5, OcAction::Toggle);
    oc5.clear(dev)?;
    for _ in 0..2 {
        oc5.force(dev)?;
        let seen = oc5.poll_fired(dev)?;
        writeln!(out, "OC5 forced, flag {}, PORTA {:02X}", seen, Port::A.read(dev)?)?;
    }
    set_action(dev, 5, OcAction::Disconnected);
    Ok(())
}
