//! Interrupt vector Hardware Abstraction Layer.
//!
//! Handlers are bound to vector slots while the interrupt gate is closed.
//! The only safe way to bind one is [`install`], which demands a live
//! [`IrqGuard`] as proof that the gate is closed.

use alloc::boxed::Box;

use common::sync::{IrqControl, IrqGuard};

use super::register::RegisterBus;

/// Execution context handed to an interrupt handler.
///
/// Handlers run with interrupts masked and are never re-entered. Register
/// accesses made through the frame do not dispatch further interrupts.
pub struct IsrFrame<'a> {
    bus: &'a mut dyn RegisterBus,
}

impl<'a> IsrFrame<'a> {
    pub fn new(bus: &'a mut dyn RegisterBus) -> Self {
        Self { bus }
    }

    /// Register access from inside the handler.
    pub fn bus(&mut self) -> &mut dyn RegisterBus {
        &mut *self.bus
    }
}

/// Interrupt handler.
///
/// Shared state reaches the foreground through whatever the closure
/// captured, typically the producer half of an event slot.
pub type Handler = Box<dyn FnMut(&mut IsrFrame<'_>) + Send>;

/// A table mapping interrupt vectors to handlers.
pub trait VectorTable {
    /// Platform-specific vector identifier.
    type Vector: Copy + core::fmt::Debug;

    /// Error type for binding.
    type Error: core::fmt::Debug;

    /// Point `vector` at `handler`.
    ///
    /// # Errors
    ///
    /// Fails if the vector already has a handler; slots are written once.
    ///
    /// # Safety
    ///
    /// Interrupts must be globally disabled. The hardware fetches the slot
    /// on interrupt entry and may jump through a half-written cell.
    unsafe fn bind(&mut self, vector: Self::Vector, handler: Handler) -> Result<(), Self::Error>;

    /// Whether `vector` has a handler.
    fn is_bound(&self, vector: Self::Vector) -> bool;

    /// First vector that was taken with no handler bound, if any.
    ///
    /// Backends stop dispatching once this happens, like the monitor's
    /// default vector does.
    fn unhandled(&self) -> Option<Self::Vector> {
        None
    }
}

/// Bind `handler` to `vector` inside a closed interrupt gate.
///
/// # Arguments
///
/// - `cs`: Guard over the device; its lifetime is the closed gate
/// - `vector`: Slot to fill
/// - `handler`: Runs on every entry through `vector`, with interrupts masked
///
/// # Errors
///
/// Returns the table's error if `vector` is already bound.
pub fn install<D, F>(
    cs: &mut IrqGuard<'_, D>,
    vector: D::Vector,
    handler: F,
) -> Result<(), D::Error>
where
    D: VectorTable + IrqControl + ?Sized,
    F: FnMut(&mut IsrFrame<'_>) + Send + 'static,
{
    log::debug!("installing handler for {:?}", vector);
    // SAFETY: the guard keeps interrupts disabled for its whole lifetime
    unsafe { cs.bind(vector, Box::new(handler)) }
}
