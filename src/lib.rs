#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(missing_docs)]

//! Driver for phased arrays of ultrasonic transducers wired to GPIO pins.
//!
//! Every transducer is switched on and off at its own offset within a short repeating loop, so
//! that the wavefronts meet in phase at a focal point. The offsets are merged into a single
//! gap-free pulse train that a waveform playback engine (the pigpio daemon, or the in-memory
//! [`EmulatedEngine`]) repeats at hardware speed.

mod config;
mod driver;
/// Waveform playback engines.
pub mod engine;
mod error;
/// Pulse trains and their assembly.
pub mod pulse;
mod registry;
mod schedule;
mod transducer;

pub use config::{DifferentialConfig, LoopConfig};
pub use driver::{Differential, DriveMode, DriverState, SharedBus, UltrasonicDriver};
#[cfg(feature = "pigpio")]
pub use engine::PigpioEngine;
pub use engine::{EmulatedEngine, EngineError, PlaybackEngine};
pub use error::DriverError;
pub use registry::TransducerRegistry;
pub use schedule::{Delay, FrameSchedule, Phase, SwitchEvent};
pub use transducer::{Pin, PinAssignment, PinPair, Transducer};

pub use autd3::core::geometry::Point3;

/// Pin tables of the default board.
pub mod pins {
    pub use crate::driver::{DRIVE_PAIRS, DRIVE_PINS, ENABLE_PIN};
}
