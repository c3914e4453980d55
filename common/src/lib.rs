//! Synchronisation primitives shared by the driver and demo crates.
//!
//! Everything here assumes one foreground context and at most one
//! non-reentrant interrupt context on a single core.

#![cfg_attr(not(test), no_std)]

extern crate alloc;

pub mod sync;
