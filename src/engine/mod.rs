mod emulator;
#[cfg(feature = "pigpio")]
mod pigpio;
mod trace;

pub use emulator::{EmulatedEngine, EngineCall, Operation};
#[cfg(feature = "pigpio")]
pub use pigpio::PigpioEngine;
pub use trace::Trace;

use thiserror::Error;

use crate::{pulse::Pulse, transducer::Pin};

/// Handle of a waveform created by the playback engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct WaveId(pub u32);

/// Errors signalled by a playback engine.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// Error when communication with the engine fails.
    #[error("I/O error ({kind:?}): {message}")]
    Io {
        #[allow(missing_docs)]
        kind: std::io::ErrorKind,
        #[allow(missing_docs)]
        message: String,
    },
    /// Error when the engine rejects a command.
    #[error("Engine rejected {command} with {code} ({})", describe(.code))]
    Rejected {
        #[allow(missing_docs)]
        command: &'static str,
        #[allow(missing_docs)]
        code: i32,
    },
    /// Error when a waveform handle is unknown to the engine.
    #[error("Unknown waveform {0:?}")]
    UnknownWave(WaveId),
}

impl From<std::io::Error> for EngineError {
    fn from(e: std::io::Error) -> Self {
        Self::Io {
            kind: e.kind(),
            message: e.to_string(),
        }
    }
}

/// Symbolic name of a pigpio status code.
pub(crate) fn describe(code: &i32) -> &'static str {
    match *code {
        -2 => "PI_BAD_USER_GPIO",
        -3 => "PI_BAD_GPIO",
        -4 => "PI_BAD_MODE",
        -5 => "PI_BAD_LEVEL",
        -36 => "PI_TOO_MANY_PULSES",
        -41 => "PI_NOT_PERMITTED",
        -66 => "PI_BAD_WAVE_ID",
        -67 => "PI_TOO_MANY_CBS",
        -68 => "PI_TOO_MANY_OOL",
        -69 => "PI_EMPTY_WAVEFORM",
        -70 => "PI_NO_WAVEFORM_ID",
        _ => "unknown error",
    }
}

/// An engine that replays pulse sequences at hardware timing precision.
///
/// Every call blocks until the engine acknowledges it. Sequences appended between two
/// [`clear_waveforms`](Self::clear_waveforms) calls all start at frame zero and are combined
/// bitwise when a waveform is created from them.
pub trait PlaybackEngine {
    /// Frames per second the engine plays back at, if it is fixed.
    fn sample_rate(&self) -> Option<u32> {
        None
    }

    /// Configures `pin` as a digital output.
    fn set_output(&mut self, pin: Pin) -> Result<(), EngineError>;

    /// Drives `pin` to `high` directly.
    fn write(&mut self, pin: Pin, high: bool) -> Result<(), EngineError>;

    /// Discards every queued pulse and created waveform.
    fn clear_waveforms(&mut self) -> Result<(), EngineError>;

    /// Appends a pulse sequence to the queue.
    fn append_pulses(&mut self, pulses: &[Pulse]) -> Result<(), EngineError>;

    /// Creates a waveform from everything queued since the last creation.
    fn create_waveform(&mut self) -> Result<WaveId, EngineError>;

    /// Plays `wave` repeatedly until halted.
    fn send_repeat(&mut self, wave: WaveId) -> Result<(), EngineError>;

    /// Stops playback.
    fn halt(&mut self) -> Result<(), EngineError>;
}

impl<E: PlaybackEngine + ?Sized> PlaybackEngine for &mut E {
    fn sample_rate(&self) -> Option<u32> {
        (**self).sample_rate()
    }

    fn set_output(&mut self, pin: Pin) -> Result<(), EngineError> {
        (**self).set_output(pin)
    }

    fn write(&mut self, pin: Pin, high: bool) -> Result<(), EngineError> {
        (**self).write(pin, high)
    }

    fn clear_waveforms(&mut self) -> Result<(), EngineError> {
        (**self).clear_waveforms()
    }

    fn append_pulses(&mut self, pulses: &[Pulse]) -> Result<(), EngineError> {
        (**self).append_pulses(pulses)
    }

    fn create_waveform(&mut self) -> Result<WaveId, EngineError> {
        (**self).create_waveform()
    }

    fn send_repeat(&mut self, wave: WaveId) -> Result<(), EngineError> {
        (**self).send_repeat(wave)
    }

    fn halt(&mut self) -> Result<(), EngineError> {
        (**self).halt()
    }
}
