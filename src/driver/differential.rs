use derive_more::Debug;
use tracing::trace;

use super::DriveMode;
use crate::{
    config::{DifferentialConfig, LoopConfig},
    error::DriverError,
    pulse::{PulseTrain, assemble_differential, sync_train},
    schedule::{FrameSchedule, Phase},
    transducer::{Pin, PinPair, Transducer},
};

/// Pin pairs of the default board.
pub const DRIVE_PAIRS: [PinPair; 8] = [
    PinPair::new(17, 27),
    PinPair::new(22, 5),
    PinPair::new(6, 13),
    PinPair::new(19, 26),
    PinPair::new(18, 23),
    PinPair::new(24, 25),
    PinPair::new(12, 16),
    PinPair::new(20, 21),
];

/// Each transducer driven by a pin pair in anti-phase, with a sync pin marking the loop start.
///
/// Every transducer gets its own pulse train. The playback engine combines them bitwise, so no
/// merge across transducers is needed.
#[derive(Debug)]
pub struct Differential {
    pairs: Vec<PinPair>,
    config: DifferentialConfig,
    #[debug(skip)]
    phase: Box<dyn Phase>,
}

impl Differential {
    /// Uses the default pin pairs and constants with the given phase model.
    pub fn new(phase: impl Phase + 'static) -> Self {
        Self {
            pairs: DRIVE_PAIRS.to_vec(),
            config: DifferentialConfig::default(),
            phase: Box::new(phase),
        }
    }

    #[allow(missing_docs)]
    pub fn with_pairs(mut self, pairs: impl IntoIterator<Item = PinPair>) -> Self {
        self.pairs = pairs.into_iter().collect();
        self
    }

    #[allow(missing_docs)]
    pub const fn with_config(mut self, config: DifferentialConfig) -> Self {
        self.config = config;
        self
    }

    #[allow(missing_docs)]
    pub const fn config(&self) -> &DifferentialConfig {
        &self.config
    }
}

impl DriveMode for Differential {
    type Assignment = PinPair;

    fn legal_assignments(&self) -> &[PinPair] {
        &self.pairs
    }

    fn auxiliary_pins(&self) -> Vec<Pin> {
        vec![self.config.sync_pin()]
    }

    fn validate(&self, config: &LoopConfig) -> Result<(), DriverError> {
        self.config.validate(config)
    }

    fn latency(&self) -> u32 {
        self.config.latency()
    }

    fn phase(&self, transducer: &Transducer<PinPair>) -> f64 {
        self.phase.phase(transducer)
    }

    fn assemble(
        &self,
        config: &LoopConfig,
        transducers: &[Transducer<PinPair>],
        schedules: &[FrameSchedule],
    ) -> Result<Vec<PulseTrain>, DriverError> {
        std::iter::once(sync_train(self.config.sync_pin(), config.loop_length()))
            .chain(transducers.iter().zip(schedules).map(
                |(tr, schedule)| -> Result<PulseTrain, DriverError> {
                    let train = assemble_differential(
                        tr.assignment(),
                        schedule,
                        config.loop_length(),
                        config.on_width(),
                        self.config.off_width(),
                    )?;
                    trace!(
                        id = tr.id(),
                        on = schedule.on_frame,
                        off = schedule.off_frame,
                        wrapped = train.wrapped,
                        "differential train"
                    );
                    Ok(train.train)
                },
            ))
            .collect()
    }
}
