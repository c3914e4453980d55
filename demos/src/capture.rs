//! Input capture demos.

use core::fmt::Write;

use common::sync::{IrqControl, IrqGuard, Overflow, event_slot};
use drivers::hal::interrupt::install;
use drivers::hal::register::RegisterBus;
use drivers::hal::timer::EventSource;
use drivers::hw::hc11::regs::{self, Edge, Pactl, tctl2_shift};
use drivers::hw::hc11::{Rearm, Source, SourceId};

use crate::{DemoConfig, DemoError, Target, await_fired, receive};

/// One of the four capture channels.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Channel {
    Ic1,
    Ic2,
    Ic3,
    /// Shares PA3 and the OC5 vector; selected by PACTL I4/O5.
    Ic4,
}

impl Channel {
    pub const ALL: [Channel; 4] = [Channel::Ic1, Channel::Ic2, Channel::Ic3, Channel::Ic4];

    pub const fn number(self) -> u8 {
        match self {
            Channel::Ic1 => 1,
            Channel::Ic2 => 2,
            Channel::Ic3 => 3,
            Channel::Ic4 => 4,
        }
    }

    pub const fn source(self) -> SourceId {
        match self {
            Channel::Ic1 => SourceId::Ic1,
            Channel::Ic2 => SourceId::Ic2,
            Channel::Ic3 => SourceId::Ic3,
            Channel::Ic4 => SourceId::Ic4,
        }
    }

    /// Port A bit the channel listens on.
    pub const fn pin(self) -> u8 {
        match self {
            Channel::Ic1 => 2,
            Channel::Ic2 => 1,
            Channel::Ic3 => 0,
            Channel::Ic4 => 3,
        }
    }
}

/// Capture both edges on `channel`: two by polling, two by interrupt.
pub fn capture<D, W>(dev: &mut D, out: &mut W, cfg: &DemoConfig, channel: Channel) -> Result<(), DemoError>
where
    D: Target + ?Sized,
    W: Write + ?Sized,
{
    let id = channel.source();
    let n = channel.number();
    let mut ic = Source::new(id);
    let (mut tx, mut rx) = event_slot::channel::<u16>(Overflow::DropNew);

    {
        let mut cs = IrqGuard::new(dev);
        install(&mut cs, id.vector(), move |frame| {
            id.acknowledge(frame, Rearm::Repeat).publish_data(&mut tx);
        })?;
    }

    if channel == Channel::Ic4 {
        dev.modify8(regs::PACTL, Pactl::DDRA3.bits(), Pactl::I4O5.bits());
    }
    let shift = tctl2_shift(n);
    dev.modify8(regs::TCTL2, 0b11 << shift, Edge::Any.bits() << shift);

    ic.arm_polled(dev)?;
    for _ in 0..2 {
        let at = await_fired(dev, &mut ic, cfg)?;
        writeln!(out, "IC{} captured {:04X}", n, at)?;
    }

    ic.arm(dev)?;
    dev.enable();
    for _ in 0..2 {
        let at = receive(dev, &mut rx, cfg)?;
        writeln!(out, "IC{} interrupt, TIC{} {:04X}", n, n, at)?;
    }
    dev.disable();
    ic.disarm(dev)?;
    Ok(())
}
