//! Register-level definitions for supported parts.

pub mod hc11;
