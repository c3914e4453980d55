//! 68HC11 Timer Driver Subsystem
//!
//! This crate provides a layered architecture for the timer event core:
//!
//! # Module Organization
//!
//! - [`hal`]: Platform-independent trait definitions
//! - [`hw`]: Register map, vectors, event sources and ports of the part
//! - [`platform`]: Device backends (simulator, memory-mapped)
//! - [`console`]: Diagnostic text sink and `log` backend
//!
//! # Design Principles
//!
//! 1. **Injected device**: every operation takes the device as an argument
//! 2. **Typed registers**: flag registers cannot be read-modify-written
//! 3. **Gated installs**: handlers are bound only inside a closed interrupt gate
//! 4. **Bounded waits**: every wait carries a timeout in counter ticks
//!
//! # Usage Example
//!
//! ```no_run
//! use drivers::hal::timer::EventSource;
//! use drivers::hal::wait::{Spin, Ticks};
//! use drivers::hw::hc11::{Source, SourceId};
//! use drivers::platform::sim::SimDevice;
//!
//! let mut dev = SimDevice::new();
//! let mut rti = Source::new(SourceId::RealTime);
//! rti.arm_polled(&mut dev).unwrap();
//! rti.wait_fired(&mut dev, Ticks(20_000), &mut Spin).unwrap();
//! ```

#![cfg_attr(not(test), no_std)]

extern crate alloc;

pub mod console;
pub mod hal;
pub mod hw;
pub mod platform;

// Re-export commonly used types
pub use hal::Device;
pub use hal::gpio::{ParallelPort, PinLevel};
pub use hal::interrupt::{IsrFrame, VectorTable, install};
pub use hal::register::RegisterBus;
pub use hal::timer::{EventSource, ForcedEvent, LatchedEvent, SourceState};
pub use hal::wait::{Backoff, Ticks, WaitError};
