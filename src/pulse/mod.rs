mod differential;
mod shared_bus;

pub use differential::{DifferentialTrain, assemble_differential, sync_train};
pub use shared_bus::assemble_shared_bus;

use derive_more::{Debug, Deref};

use crate::error::DriverError;

/// A change of the output register followed by a wait.
///
/// `set` and `clear` are applied at the start of the pulse, then the register holds for
/// `duration` frames.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[debug("Pulse({set:#010x}, {clear:#010x}, {duration})")]
pub struct Pulse {
    /// Bits to drive high.
    pub set: u32,
    /// Bits to drive low.
    pub clear: u32,
    /// Frames to hold before the next pulse.
    pub duration: u32,
}

impl Pulse {
    #[allow(missing_docs)]
    pub const fn new(set: u32, clear: u32, duration: u32) -> Self {
        Self {
            set,
            clear,
            duration,
        }
    }

    /// A wait that leaves the register untouched.
    pub const fn idle(duration: u32) -> Self {
        Self::new(0, 0, duration)
    }
}

/// A sequence of pulses that spans exactly one loop.
#[derive(Clone, Debug, PartialEq, Eq, Deref)]
pub struct PulseTrain {
    #[deref]
    pulses: Vec<Pulse>,
}

impl PulseTrain {
    /// Wraps `pulses`, checking that they last exactly `loop_length` frames.
    pub fn new(pulses: Vec<Pulse>, loop_length: u32) -> Result<Self, DriverError> {
        let actual = pulses.iter().map(|p| p.duration as i64).sum::<i64>();
        if actual != loop_length as i64 {
            return Err(DriverError::LoopLengthMismatch {
                expected: loop_length,
                actual,
            });
        }
        Ok(Self { pulses })
    }

    /// Total duration in frames.
    pub fn duration(&self) -> u32 {
        self.pulses.iter().map(|p| p.duration).sum()
    }

    /// Consumes the train, returning its pulses.
    pub fn into_pulses(self) -> Vec<Pulse> {
        self.pulses
    }
}
