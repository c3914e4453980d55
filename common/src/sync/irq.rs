use core::fmt::Debug;

/// Global interrupt masking interface (the interrupt gate).
///
/// Implemented by each device backend: the simulator keeps a software
/// copy of the CCR I bit, a real target executes `sei`/`cli`.
pub trait IrqControl {
    /// Saved interrupt state
    type State: Copy + Debug;

    /// Disable interrupts and return the previous state.
    fn disable(&mut self) -> Self::State;

    /// Restore interrupts to a previous state.
    fn restore(&mut self, state: Self::State);

    /// Unconditionally open the gate.
    fn enable(&mut self);

    /// Whether interrupts are currently accepted.
    fn enabled(&self) -> bool;
}
