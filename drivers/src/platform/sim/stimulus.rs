//! Scheduled input pin transitions.
//!
//! A stimulus is a list of `(cycle, pin, level)` transitions applied to
//! the simulated input pins as simulated time reaches each cycle.

use alloc::collections::VecDeque;
use core::fmt;

use crate::hal::gpio::PinLevel;

/// An externally driven input pin.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Pin {
    /// PA0..PA3 and PA7.
    A(u8),
    C(u8),
    /// PD0..PD5.
    D(u8),
    E(u8),
}

impl Pin {
    /// Whether the pin can be driven from outside.
    pub const fn is_input(self) -> bool {
        match self {
            Pin::A(bit) => bit <= 3 || bit == 7,
            Pin::C(bit) | Pin::E(bit) => bit <= 7,
            Pin::D(bit) => bit <= 5,
        }
    }

    pub const fn mask(self) -> u8 {
        match self {
            Pin::A(bit) | Pin::C(bit) | Pin::D(bit) | Pin::E(bit) => 1 << (bit & 7),
        }
    }
}

/// One input transition.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Transition {
    /// E-cycle at which the level changes.
    pub cycle: u64,
    pub pin: Pin,
    pub level: PinLevel,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum StimulusError {
    /// The pin is an output or does not exist.
    NotInput(Pin),
}

impl fmt::Display for StimulusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StimulusError::NotInput(pin) => write!(f, "{:?} cannot be driven", pin),
        }
    }
}

/// Pending transitions, ordered by cycle.
#[derive(Debug, Default, Clone)]
pub struct Stimulus {
    pending: VecDeque<Transition>,
}

impl Stimulus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule one transition. Transitions on the same cycle apply in
    /// insertion order.
    pub fn push(&mut self, t: Transition) -> Result<(), StimulusError> {
        if !t.pin.is_input() {
            return Err(StimulusError::NotInput(t.pin));
        }
        let at = self
            .pending
            .iter()
            .position(|p| p.cycle > t.cycle)
            .unwrap_or(self.pending.len());
        self.pending.insert(at, t);
        Ok(())
    }

    /// Builder form of [`Stimulus::push`].
    pub fn at(mut self, cycle: u64, pin: Pin, level: PinLevel) -> Result<Self, StimulusError> {
        self.push(Transition { cycle, pin, level })?;
        Ok(self)
    }

    /// Schedule `edges` alternating transitions, `half_period` cycles apart,
    /// starting with a rising edge at `start`.
    pub fn square_wave(
        mut self,
        pin: Pin,
        start: u64,
        half_period: u64,
        edges: usize,
    ) -> Result<Self, StimulusError> {
        let mut cycle = start;
        for n in 0..edges {
            self.push(Transition {
                cycle,
                pin,
                level: PinLevel::from(n % 2 == 0),
            })?;
            cycle += half_period;
        }
        Ok(self)
    }

    /// Remove the next transition if it is due by `cycle`.
    pub fn next_due(&mut self, cycle: u64) -> Option<Transition> {
        match self.pending.front() {
            Some(t) if t.cycle <= cycle => self.pending.pop_front(),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
