//! Demo sequencer: phase scripts over the timer event core.
//!
//! Each demo drives one peripheral through the same protocol: configure
//! it, verify events by polling, install a handler inside a closed gate,
//! verify events by interrupt, and where the hardware allows, force one.
//! Observations go to any [`core::fmt::Write`] as newline-terminated
//! lines.
//!
//! Demos are generic over the device, so the same script runs on the
//! simulator (see `runner`) and on a board.

#![cfg_attr(not(test), no_std)]

pub mod capture;
mod error;
pub mod output_compare;
pub mod overflow;
pub mod ports;
pub mod pulse;

cfg_if::cfg_if! {
    if #[cfg(feature = "sim")] {
        pub mod runner;
    }
}

pub use error::DemoError;

use common::sync::Consumer;
use drivers::hal::Device;
use drivers::hal::interrupt::VectorTable;
use drivers::hal::register::RegisterBus;
use drivers::hal::timer::EventSource;
use drivers::hal::wait::{self, Exponential, Ticks};
use drivers::hw::hc11::regs;
use drivers::hw::hc11::{Source, Vector, VectorError};

/// What a demo needs from the device: the event core plus the HC11
/// vector numbering.
pub trait Target: Device + VectorTable<Vector = Vector, Error = VectorError> {}

impl<T> Target for T where T: Device + VectorTable<Vector = Vector, Error = VectorError> + ?Sized {}

/// Demo parameters.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct DemoConfig {
    /// Output compare spacing, in counter ticks.
    pub interval: u16,
    /// Budget of every wait. Long enough for one counter overflow.
    pub timeout: Ticks,
    /// Largest backoff shift between two polls.
    pub max_backoff_shift: u32,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            interval: 2000,
            timeout: Ticks(0x2_0000),
            max_backoff_shift: 4,
        }
    }
}

impl DemoConfig {
    pub fn backoff(&self) -> Exponential {
        Exponential::new(self.max_backoff_shift)
    }
}

/// Wait for the handler feeding `rx` to publish.
pub(crate) fn receive<D, T>(dev: &mut D, rx: &mut Consumer<T>, cfg: &DemoConfig) -> Result<T, DemoError>
where
    D: Target + ?Sized,
{
    let mut backoff = cfg.backoff();
    wait::until(
        dev,
        cfg.timeout,
        &mut backoff,
        |d| d.read16(regs::TCNT),
        |_| rx.take(),
    )
    .map_err(|err| stalled(&*dev, err.into()))
}

/// Wait for a polled source and return the data latched with its flag.
pub(crate) fn await_fired<D>(dev: &mut D, src: &mut Source, cfg: &DemoConfig) -> Result<u16, DemoError>
where
    D: Target + ?Sized,
{
    let mut backoff = cfg.backoff();
    src.wait_fired(dev, cfg.timeout, &mut backoff)
        .map_err(|err| stalled(&*dev, err.into()))?;
    Ok(src.latched().unwrap_or_default())
}

/// A timeout behind which the device stopped dispatching is reported as
/// the stop.
fn stalled<D: Target + ?Sized>(dev: &D, err: DemoError) -> DemoError {
    match dev.unhandled() {
        Some(vector) => DemoError::Stopped(vector),
        None => err,
    }
}
