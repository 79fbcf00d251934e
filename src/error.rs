use thiserror::Error;

use crate::{driver::DriverState, engine::EngineError, transducer::Pin};

/// An interface for error handling in ultrasonic-driver.
#[derive(Error, Debug, PartialEq)]
pub enum DriverError {
    /// Error when a transducer is assigned pins that are not in the device's pin table.
    #[error("Pin assignment {0} is not available on this device")]
    IllegalAssignment(String),
    /// Error when a pin (or pin pair) is used by more than one transducer.
    #[error("Pin assignment {0} has been used already")]
    DuplicateAssignment(String),
    /// Error when a pin collides with a pin reserved by the drive mode.
    #[error("Pin {0} is reserved by the drive mode")]
    ReservedPin(Pin),
    /// Error when the loop constants are inconsistent.
    #[error("Invalid loop configuration: {0}")]
    InvalidLoopConfig(&'static str),
    /// Error when the engine plays back at a different rate than configured.
    #[error("Sample rate {configured} does not match the engine's {engine} frames/s")]
    SampleRateMismatch {
        #[allow(missing_docs)]
        configured: u32,
        #[allow(missing_docs)]
        engine: u32,
    },
    /// Error when the delay function returns a negative or non-finite value.
    #[error("Delay function returned {delay}s for transducer {id}")]
    InvalidDelay {
        #[allow(missing_docs)]
        id: usize,
        #[allow(missing_docs)]
        delay: f64,
    },
    /// Error when an assembled pulse train does not span exactly one loop.
    #[error("Pulse train lasts {actual} frames, expected {expected}")]
    LoopLengthMismatch {
        #[allow(missing_docs)]
        expected: u32,
        #[allow(missing_docs)]
        actual: i64,
    },
    /// Error when a pulse segment would have negative duration.
    #[error("Segment {segment} of transducer {id} has negative duration")]
    NegativeSegment {
        #[allow(missing_docs)]
        id: usize,
        #[allow(missing_docs)]
        segment: usize,
    },
    /// Error when a schedule refers to a transducer that is not in the list.
    #[error("No transducer with id {0}")]
    UnknownTransducer(usize),
    /// Error when an operation is not valid in the current driver state.
    #[error("Operation `{operation}` is not valid in state {state:?}")]
    InvalidState {
        #[allow(missing_docs)]
        operation: &'static str,
        #[allow(missing_docs)]
        state: DriverState,
    },
    #[allow(missing_docs)]
    #[error("{0}")]
    Engine(#[from] EngineError),
}

impl DriverError {
    /// Whether the error was raised while validating the construction inputs.
    pub const fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::IllegalAssignment(_)
                | Self::DuplicateAssignment(_)
                | Self::ReservedPin(_)
                | Self::InvalidLoopConfig(_)
                | Self::SampleRateMismatch { .. }
        )
    }
}
