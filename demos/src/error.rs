use core::fmt;

use drivers::hal::wait::{Ticks, WaitError};
use drivers::hw::hc11::{PortError, SourceError, Vector, VectorError};

/// Demo failures.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum DemoError {
    /// An expected event did not arrive.
    Timeout { waited: Ticks },
    Source(SourceError),
    Vector(VectorError),
    Port(PortError),
    /// The device took an interrupt with no handler and stopped.
    Stopped(Vector),
    #[cfg(feature = "sim")]
    Stimulus(drivers::platform::sim::StimulusError),
    /// The diagnostic sink refused a line.
    Output(fmt::Error),
}

impl From<WaitError> for DemoError {
    fn from(err: WaitError) -> Self {
        match err {
            WaitError::Timeout { waited } => DemoError::Timeout { waited },
        }
    }
}

impl From<SourceError> for DemoError {
    fn from(err: SourceError) -> Self {
        match err {
            SourceError::Timeout { waited } => DemoError::Timeout { waited },
            other => DemoError::Source(other),
        }
    }
}

impl From<VectorError> for DemoError {
    fn from(err: VectorError) -> Self {
        DemoError::Vector(err)
    }
}

impl From<PortError> for DemoError {
    fn from(err: PortError) -> Self {
        DemoError::Port(err)
    }
}

#[cfg(feature = "sim")]
impl From<drivers::platform::sim::StimulusError> for DemoError {
    fn from(err: drivers::platform::sim::StimulusError) -> Self {
        DemoError::Stimulus(err)
    }
}

impl From<fmt::Error> for DemoError {
    fn from(err: fmt::Error) -> Self {
        DemoError::Output(err)
    }
}

impl fmt::Display for DemoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DemoError::Timeout { waited } => write!(f, "no event after {} ticks", waited.0),
            DemoError::Source(err) => write!(f, "{}", err),
            DemoError::Vector(err) => write!(f, "{}", err),
            DemoError::Port(err) => write!(f, "{}", err),
            DemoError::Stopped(vector) => write!(f, "stopped on unhandled {:?} interrupt", vector),
            #[cfg(feature = "sim")]
            DemoError::Stimulus(err) => write!(f, "{}", err),
            DemoError::Output(_) => write!(f, "diagnostic output failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_timeouts_flatten_into_demo_timeouts() {
        let err = DemoError::from(SourceError::Timeout { waited: Ticks(9) });
        assert_eq!(err, DemoError::Timeout { waited: Ticks(9) });
        assert!(matches!(
            DemoError::from(SourceError::NotForceable(drivers::hw::hc11::SourceId::Ic1)),
            DemoError::Source(_)
        ));
    }
}
