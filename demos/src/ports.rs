//! Parallel port demos.

use core::fmt::Write;

use drivers::hal::gpio::ParallelPort;
use drivers::hal::register::RegisterBus;
use drivers::hal::wait::{Deadline, Ticks};
use drivers::hw::hc11::Port;
use drivers::hw::hc11::regs;

use crate::{DemoError, Target};

/// PA3..PA7, the pins port A can drive.
const PA_OUTPUTS: u8 = 0xF8;

/// Pins `walk` drives on `port`.
const fn walk_pins(port: Port) -> u8 {
    match port {
        Port::A => PA_OUTPUTS,
        _ => port.width_mask(),
    }
}

/// Walk a one up through every output pin of `port`, then a zero.
///
/// Port E has no output latch and fails with the port's error.
pub fn walk<D, W>(dev: &mut D, out: &mut W, port: Port) -> Result<(), DemoError>
where
    D: Target + ?Sized,
    W: Write + ?Sized,
{
    let pins = walk_pins(port);
    port.set_direction(dev, pins)?;
    port.write(dev, 0)?;
    let bits = (0..8).map(|bit| 1u8 << bit).filter(|mask| pins & mask != 0);
    for mask in bits.clone() {
        port.set_bits(dev, mask)?;
        writeln!(out, "PORT{:?} {:02X}", port, port.read(dev)?)?;
    }
    for mask in bits {
        port.clear_bits(dev, mask)?;
        writeln!(out, "PORT{:?} {:02X}", port, port.read(dev)?)?;
    }
    Ok(())
}

/// Report every change seen on `port` for `window` ticks.
///
/// Ports C, D and E are switched to inputs first. Returns the number of
/// changes.
pub fn monitor<D, W>(dev: &mut D, out: &mut W, port: Port, window: Ticks) -> Result<u32, DemoError>
where
    D: Target + ?Sized,
    W: Write + ?Sized,
{
    if matches!(port, Port::C | Port::D | Port::E) {
        port.set_direction(dev, 0)?;
    }
    let mut last = port.read(dev)?;
    writeln!(out, "Port {:?} starts at {:02X}", port, last)?;

    let mut changes = 0;
    let mut deadline = Deadline::start(dev.read16(regs::TCNT), window);
    while !deadline.expired() {
        let now = port.read(dev)?;
        if now != last {
            writeln!(out, "Port {:?} is now {:02X}", port, now)?;
            last = now;
            changes += 1;
        }
        deadline.observe(dev.read16(regs::TCNT));
    }
    Ok(changes)
}

/// Copy PA0..PA2 onto PA4..PA6 for `window` ticks.
pub fn mirror<D, W>(dev: &mut D, out: &mut W, window: Ticks) -> Result<(), DemoError>
where
    D: Target + ?Sized,
    W: Write + ?Sized,
{
    Port::A.set_direction(dev, PA_OUTPUTS)?;
    let mut deadline = Deadline::start(dev.read16(regs::TCNT), window);
    let mut shown = None;
    while !deadline.expired() {
        let inputs = Port::A.read(dev)? & 0x07;
        Port::A.modify(dev, 0x70, inputs << 4)?;
        if shown != Some(inputs) {
            writeln!(out, "PORTA {:02X}", Port::A.read(dev)?)?;
            shown = Some(inputs);
        }
        deadline.observe(dev.read16(regs::TCNT));
    }
    Ok(())
}

#[cfg(all(test, feature = "sim"))]
mod tests {
    use super::*;
    use drivers::hw::hc11::PortError;
    use drivers::platform::sim::SimDevice;

    #[test]
    fn port_a_walk_skips_its_input_pins() {
        let mut dev = SimDevice::new();
        let mut out = String::new();
        walk(&mut dev, &mut out, Port::A).unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 10);
        assert_eq!(lines[0], "PORTA 08");
        assert_eq!(lines[4], "PORTA F8");
        assert_eq!(lines[9], "PORTA 00");
    }

    #[test]
    fn port_d_walk_stops_at_six_bits() {
        let mut dev = SimDevice::new();
        let mut out = String::new();
        walk(&mut dev, &mut out, Port::D).unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 12);
        assert_eq!(lines[5], "PORTD 3F");

        dev.write8(regs::PORTD, 0xFF);
        assert_eq!(dev.read8(regs::PORTD), 0x3F);
        assert_eq!(Port::D.read(&mut dev), Ok(0x3F));
    }

    #[test]
    fn port_e_cannot_be_walked() {
        let mut dev = SimDevice::new();
        let mut out = String::new();
        assert_eq!(
            walk(&mut dev, &mut out, Port::E),
            Err(DemoError::Port(PortError::InputOnly(Port::E)))
        );
        assert!(out.is_empty());
    }
}
