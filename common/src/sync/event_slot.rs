//! One-slot channel from an interrupt handler to the foreground loop.
//!
//! The producer half is moved into exactly one handler and cannot be
//! cloned; the consumer half stays with the foreground. The value is
//! written before the slot is marked full (`Release`) and the slot is
//! observed full before the value is read (`Acquire`), so everything the
//! handler did before posting is visible once `take` returns a value.
//!
//! Capacity is one. What happens to a post that finds the slot still full
//! is fixed per channel by [`Overflow`].

use alloc::sync::Arc;
use core::cell::UnsafeCell;
use core::sync::atomic::{AtomicU8, AtomicU32, Ordering};

const EMPTY: u8 = 0;
const WRITING: u8 = 1;
const FULL: u8 = 2;
const READING: u8 = 3;

/// Policy for a post that finds an unread value in the slot.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Overflow {
    /// The unread value is replaced by the new one.
    Overwrite,
    /// The unread value is kept and the new one is discarded.
    DropNew,
}

/// Outcome of [`Producer::post`].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Posted {
    /// The slot was empty.
    Stored,
    /// An unread value was overwritten.
    Replaced,
    /// The new value was discarded.
    Dropped,
}

struct Slot<T> {
    state: AtomicU8,
    value: UnsafeCell<Option<T>>,
    policy: Overflow,
    posted: AtomicU32,
    lost: AtomicU32,
}

// SAFETY: `value` is only touched by the side that moved `state` into
// WRITING or READING, and those transitions are exclusive.
unsafe impl<T: Send> Sync for Slot<T> {}
unsafe impl<T: Send> Send for Slot<T> {}

/// Create a channel with the given overflow policy.
pub fn channel<T: Send>(policy: Overflow) -> (Producer<T>, Consumer<T>) {
    let slot = Arc::new(Slot {
        state: AtomicU8::new(EMPTY),
        value: UnsafeCell::new(None),
        policy,
        posted: AtomicU32::new(0),
        lost: AtomicU32::new(0),
    });
    (
        Producer { slot: slot.clone() },
        Consumer { slot },
    )
}

/// Writing half, owned by the interrupt handler.
pub struct Producer<T> {
    slot: Arc<Slot<T>>,
}

impl<T> Producer<T> {
    /// Publish a value. Never blocks.
    ///
    /// A post that lands while the consumer is in the middle of `take`
    /// is dropped under either policy; the consumer is reading the
    /// previous value and the handler cannot wait for it.
    pub fn post(&mut self, value: T) -> Posted {
        let slot = &*self.slot;
        slot.posted.fetch_add(1, Ordering::Relaxed);

        let outcome = match slot
            .state
            .compare_exchange(EMPTY, WRITING, Ordering::Acquire, Ordering::Relaxed)
        {
            Ok(_) => Posted::Stored,
            Err(FULL) if slot.policy == Overflow::Overwrite => {
                match slot.state.compare_exchange(
                    FULL,
                    WRITING,
                    Ordering::Acquire,
                    Ordering::Relaxed,
                ) {
                    Ok(_) => Posted::Replaced,
                    Err(_) => Posted::Dropped,
                }
            }
            Err(_) => Posted::Dropped,
        };

        match outcome {
            Posted::Dropped => {
                slot.lost.fetch_add(1, Ordering::Relaxed);
            }
            Posted::Replaced => {
                slot.lost.fetch_add(1, Ordering::Relaxed);
                // SAFETY: state is WRITING, owned by us
                unsafe { *slot.value.get() = Some(value) };
                slot.state.store(FULL, Ordering::Release);
            }
            Posted::Stored => {
                // SAFETY: state is WRITING, owned by us
                unsafe { *slot.value.get() = Some(value) };
                slot.state.store(FULL, Ordering::Release);
            }
        }
        outcome
    }
}

/// Reading half, owned by the foreground.
pub struct Consumer<T> {
    slot: Arc<Slot<T>>,
}

impl<T> Consumer<T> {
    /// Take the pending value, if any. Never blocks.
    pub fn take(&mut self) -> Option<T> {
        let slot = &*self.slot;
        slot.state
            .compare_exchange(FULL, READING, Ordering::Acquire, Ordering::Relaxed)
            .ok()?;
        // SAFETY: state is READING, owned by us
        let value = unsafe { (*slot.value.get()).take() };
        slot.state.store(EMPTY, Ordering::Release);
        value
    }

    /// Whether a value is waiting.
    pub fn is_ready(&self) -> bool {
        self.slot.state.load(Ordering::Acquire) == FULL
    }

    /// Total number of posts, including overwritten and dropped ones.
    pub fn posted(&self) -> u32 {
        self.slot.posted.load(Ordering::Relaxed)
    }

    /// Number of values that never reached the consumer.
    pub fn lost(&self) -> u32 {
        self.slot.lost.load(Ordering::Relaxed)
    }

    pub fn policy(&self) -> Overflow {
        self.slot.policy
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_slot_yields_nothing() {
        let (_tx, mut rx) = channel::<u16>(Overflow::Overwrite);
        assert!(!rx.is_ready());
        assert_eq!(rx.take(), None);
        assert_eq!(rx.posted(), 0);
    }

    #[test]
    fn value_is_taken_once() {
        let (mut tx, mut rx) = channel(Overflow::DropNew);
        assert_eq!(tx.post(0x1234u16), Posted::Stored);
        assert!(rx.is_ready());
        assert_eq!(rx.take(), Some(0x1234));
        assert_eq!(rx.take(), None);
    }

    #[test]
    fn overwrite_keeps_latest() {
        let (mut tx, mut rx) = channel(Overflow::Overwrite);
        tx.post(1u8);
        assert_eq!(tx.post(2), Posted::Replaced);
        assert_eq!(rx.take(), Some(2));
        assert_eq!(rx.posted(), 2);
        assert_eq!(rx.lost(), 1);
    }

    #[test]
    fn drop_new_keeps_oldest() {
        let (mut tx, mut rx) = channel(Overflow::DropNew);
        tx.post(1u8);
        assert_eq!(tx.post(2), Posted::Dropped);
        assert_eq!(rx.take(), Some(1));
        assert_eq!(rx.lost(), 1);
    }

    #[test]
    fn producer_works_from_another_thread() {
        let (mut tx, mut rx) = channel(Overflow::DropNew);
        std::thread::spawn(move || {
            tx.post(7u32);
        })
        .join()
        .unwrap();
        assert_eq!(rx.take(), Some(7));
    }
}
