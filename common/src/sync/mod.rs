pub mod event_slot;
pub mod irq;
pub mod irq_guard;
pub mod spinlock;

pub use event_slot::{Consumer, Overflow, Posted, Producer, channel};
pub use irq::IrqControl;
pub use irq_guard::IrqGuard;
pub use spinlock::SpinLock;
