//! Motorola 68HC11 (A8/E9 family) timer and parallel I/O.

pub mod port;
pub mod regs;
pub mod source;
pub mod vectors;

pub use port::{Port, PortError};
pub use source::{Ack, Rearm, Source, SourceError, SourceId};
pub use vectors::{VECTOR_COUNT, Vector, VectorError, VectorSlot};
