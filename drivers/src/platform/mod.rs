//! Device backends.
//!
//! Each backend implements [`Device`](crate::hal::Device) for the 68HC11
//! register block:
//!
//! - `sim`: a cycle-stepped simulator of the timer and parallel I/O,
//!   used by the host demo runner and by the tests
//! - `mmio`: volatile accesses to the real register block at `0x1000`
//!   and a RAM jump table for the monitor's pseudo-vectors
//!
//! ```rust,ignore
//! use drivers::platform::sim::SimDevice;
//!
//! let mut dev = SimDevice::new();
//! dev.run(10_000);
//! ```

// Backend selection based on Cargo features. The mmio backend only
// touches memory through raw addresses, so host tests build it too.
cfg_if::cfg_if! {
    if #[cfg(not(any(feature = "sim", feature = "mmio")))] {
        compile_error!(
            "No backend selected!\n\
            Use: cargo build --features sim\n\
            Or:  cargo build --features mmio"
        );
    }
}

#[cfg(any(feature = "mmio", test))]
pub mod mmio;
#[cfg(feature = "sim")]
pub mod sim;
