//! Hardware Abstraction Layer (HAL) - Platform-Independent Traits
//!
//! # Available Interfaces
//!
//! - [`register`]: typed register handles and the register bus
//! - [`timer`]: event sources (flag + mask + data register)
//! - [`interrupt`]: vector table and handler frames
//! - [`wait`]: bounded busy-waits and backoff strategies
//! - [`gpio`]: parallel ports

pub mod gpio;
pub mod interrupt;
pub mod register;
pub mod timer;
pub mod wait;

use common::sync::IrqControl;

/// Everything the event core needs from a device backend.
pub trait Device: register::RegisterBus + IrqControl + interrupt::VectorTable {}

impl<T> Device for T where T: register::RegisterBus + IrqControl + interrupt::VectorTable + ?Sized {}
