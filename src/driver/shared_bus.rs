use super::DriveMode;
use crate::{
    config::LoopConfig,
    engine::{EngineError, PlaybackEngine},
    error::DriverError,
    pulse::{PulseTrain, assemble_shared_bus},
    schedule::FrameSchedule,
    transducer::{Pin, Transducer},
};

/// Drive pins of the default board, in header order.
pub const DRIVE_PINS: [Pin; 16] = [
    Pin(17),
    Pin(27),
    Pin(22),
    Pin(5),
    Pin(6),
    Pin(13),
    Pin(19),
    Pin(26),
    Pin(18),
    Pin(23),
    Pin(24),
    Pin(25),
    Pin(12),
    Pin(16),
    Pin(20),
    Pin(21),
];

/// Enable pin of the default board ("TXD").
pub const ENABLE_PIN: Pin = Pin(14);

/// One pin per transducer on a common output register, gated by an enable line.
#[derive(Clone, Debug)]
pub struct SharedBus {
    drive_pins: Vec<Pin>,
    enable_pin: Pin,
}

impl Default for SharedBus {
    fn default() -> Self {
        Self::new(DRIVE_PINS, ENABLE_PIN)
    }
}

impl SharedBus {
    #[allow(missing_docs)]
    pub fn new(drive_pins: impl IntoIterator<Item = Pin>, enable_pin: Pin) -> Self {
        Self {
            drive_pins: drive_pins.into_iter().collect(),
            enable_pin,
        }
    }

    #[allow(missing_docs)]
    pub const fn enable_pin(&self) -> Pin {
        self.enable_pin
    }
}

impl DriveMode for SharedBus {
    type Assignment = Pin;

    fn legal_assignments(&self) -> &[Pin] {
        &self.drive_pins
    }

    fn auxiliary_pins(&self) -> Vec<Pin> {
        vec![self.enable_pin]
    }

    fn assemble(
        &self,
        config: &LoopConfig,
        transducers: &[Transducer<Pin>],
        schedules: &[FrameSchedule],
    ) -> Result<Vec<PulseTrain>, DriverError> {
        Ok(vec![assemble_shared_bus(
            transducers,
            schedules,
            config.loop_length(),
        )?])
    }

    fn enable(&self, engine: &mut dyn PlaybackEngine) -> Result<(), EngineError> {
        engine.write(self.enable_pin, true)
    }

    fn disable(&self, engine: &mut dyn PlaybackEngine) -> Result<(), EngineError> {
        engine.write(self.enable_pin, false)
    }
}
