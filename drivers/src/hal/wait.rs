//! Bounded busy-waiting.
//!
//! The only blocking primitive in the core. Every wait carries a timeout
//! measured in ticks of the free-running counter, plus a [`Backoff`]
//! strategy deciding what to do between polls.

use core::fmt;

/// A duration in counter ticks.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Ticks(pub u32);

/// Wait errors.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum WaitError {
    /// The condition did not hold within the budget.
    Timeout { waited: Ticks },
}

impl fmt::Display for WaitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WaitError::Timeout { waited } => write!(f, "timed out after {} ticks", waited.0),
        }
    }
}

/// What to do between two polls.
pub trait Backoff {
    fn pause(&mut self);

    /// Called before a new wait starts.
    fn reset(&mut self) {}
}

/// Poll back to back.
#[derive(Debug, Default, Copy, Clone)]
pub struct Spin;

impl Backoff for Spin {
    fn pause(&mut self) {
        core::hint::spin_loop();
    }
}

/// Double the number of idle spins after each miss, up to `2^max_shift`.
#[derive(Debug, Copy, Clone)]
pub struct Exponential {
    shift: u32,
    max_shift: u32,
}

impl Exponential {
    /// Largest accepted shift. A pause never exceeds 65536 spins.
    pub const MAX_SHIFT: u32 = 16;

    /// `max_shift` above [`Self::MAX_SHIFT`] is capped.
    pub const fn new(max_shift: u32) -> Self {
        Self {
            shift: 0,
            max_shift: if max_shift > Self::MAX_SHIFT {
                Self::MAX_SHIFT
            } else {
                max_shift
            },
        }
    }

    pub const fn max_shift(&self) -> u32 {
        self.max_shift
    }
}

impl Backoff for Exponential {
    fn pause(&mut self) {
        for _ in 0..(1u32 << self.shift) {
            core::hint::spin_loop();
        }
        if self.shift < self.max_shift {
            self.shift += 1;
        }
    }

    fn reset(&mut self) {
        self.shift = 0;
    }
}

/// Elapsed-time tracker over a wrapping 16-bit counter.
///
/// Accumulates `now - last` on every observation, so the budget may exceed
/// one counter period as long as consecutive observations are less than
/// 65536 ticks apart.
#[derive(Debug, Copy, Clone)]
pub struct Deadline {
    budget: Ticks,
    last: u16,
    elapsed: u32,
}

impl Deadline {
    pub fn start(now: u16, budget: Ticks) -> Self {
        Self {
            budget,
            last: now,
            elapsed: 0,
        }
    }

    /// Record a new counter reading.
    pub fn observe(&mut self, now: u16) {
        self.elapsed = self
            .elapsed
            .saturating_add(u32::from(now.wrapping_sub(self.last)));
        self.last = now;
    }

    pub fn elapsed(&self) -> Ticks {
        Ticks(self.elapsed)
    }

    pub fn expired(&self) -> bool {
        self.elapsed >= self.budget.0
    }
}

/// Poll `ready` until it yields a value or `budget` ticks elapse.
///
/// `now` reads the free-running counter; it is called once per iteration.
pub fn until<C, R, B>(
    ctx: &mut C,
    budget: Ticks,
    backoff: &mut B,
    mut now: impl FnMut(&mut C) -> u16,
    mut ready: impl FnMut(&mut C) -> Option<R>,
) -> Result<R, WaitError>
where
    C: ?Sized,
    B: Backoff + ?Sized,
{
    backoff.reset();
    let mut deadline = Deadline::start(now(ctx), budget);
    loop {
        if let Some(value) = ready(ctx) {
            return Ok(value);
        }
        deadline.observe(now(ctx));
        if deadline.expired() {
            return Err(WaitError::Timeout {
                waited: deadline.elapsed(),
            });
        }
        backoff.pause();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deadline_accumulates_across_wrap() {
        let mut d = Deadline::start(0xFF00, Ticks(0x200));
        d.observe(0xFFF0);
        d.observe(0x0010);
        assert_eq!(d.elapsed(), Ticks(0x110));
        assert!(!d.expired());
        d.observe(0x0100);
        assert!(d.expired());
    }

    #[test]
    fn until_returns_ready_value() {
        let mut clock = 0u16;
        let got = until(
            &mut clock,
            Ticks(100),
            &mut Spin,
            |c| {
                *c += 10;
                *c
            },
            |c| (*c >= 40).then_some(*c),
        );
        assert_eq!(got, Ok(40));
    }

    #[test]
    fn until_times_out() {
        let mut clock = 0u16;
        let got: Result<(), _> = until(
            &mut clock,
            Ticks(50),
            &mut Exponential::new(3),
            |c| {
                *c = c.wrapping_add(7);
                *c
            },
            |_| None,
        );
        match got {
            Err(WaitError::Timeout { waited }) => assert!(waited >= Ticks(50)),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn exponential_backoff_caps_large_shifts() {
        let mut backoff = Exponential::new(40);
        assert_eq!(backoff.max_shift(), Exponential::MAX_SHIFT);
        for _ in 0..40 {
            backoff.pause();
        }
        assert_eq!(backoff.shift, Exponential::MAX_SHIFT);
        backoff.reset();
        assert_eq!(backoff.shift, 0);
    }
}
