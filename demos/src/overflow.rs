//! Timer overflow and real-time interrupt demos.
//!
//! Both sources live in TFLG2/TMSK2 and have no data register of their
//! own; the counter value read on acknowledge stands in for it.

use core::fmt::Write;

use common::sync::{IrqControl, IrqGuard, Overflow, channel};
use drivers::hal::gpio::ParallelPort;
use drivers::hal::interrupt::install;
use drivers::hal::register::RegisterBus;
use drivers::hal::timer::EventSource;
use drivers::hw::hc11::regs::{self, PortA};
use drivers::hw::hc11::{Port, Rearm, Source, SourceId};

use crate::{DemoConfig, DemoError, Target, await_fired, receive};

pub fn timer_overflow<D, W>(dev: &mut D, out: &mut W, cfg: &DemoConfig) -> Result<(), DemoError>
where
    D: Target + ?Sized,
    W: Write + ?Sized,
{
    toggle_on(dev, out, cfg, SourceId::TimerOverflow)
}

pub fn real_time<D, W>(dev: &mut D, out: &mut W, cfg: &DemoConfig) -> Result<(), DemoError>
where
    D: Target + ?Sized,
    W: Write + ?Sized,
{
    toggle_on(dev, out, cfg, SourceId::RealTime)
}

/// Toggle PA6 once on a polled event, then once more from a one-shot
/// handler.
fn toggle_on<D, W>(dev: &mut D, out: &mut W, cfg: &DemoConfig, id: SourceId) -> Result<(), DemoError>
where
    D: Target + ?Sized,
    W: Write + ?Sized,
{
    let mut src = Source::new(id);
    let (mut tx, mut rx) = channel::<(u16, u8)>(Overflow::DropNew);

    {
        let mut cs = IrqGuard::new(dev);
        install(&mut cs, id.vector(), move |frame| {
            let ack = id.acknowledge(frame, Rearm::OneShot);
            let bus = frame.bus();
            let level = bus.read8(regs::PORTA) ^ PortA::PA6.bits();
            bus.write8(regs::PORTA, level);
            let level = bus.read8(regs::PORTA);
            let at = ack.data();
            ack.publish(&mut tx, (at, level));
        })?;
    }

    Port::A.write(dev, 0)?;
    src.arm_polled(dev)?;
    let at = await_fired(dev, &mut src, cfg)?;
    Port::A.toggle(dev, PortA::PA6.bits())?;
    writeln!(out, "{:?} polled at {:04X}, PORTA {:02X}", id, at, Port::A.read(dev)?)?;

    src.arm(dev)?;
    dev.enable();
    let (at, level) = receive(dev, &mut rx, cfg)?;
    dev.disable();
    writeln!(out, "{:?} interrupt at {:04X}, PORTA {:02X}", id, at, level)?;
    Ok(())
}
