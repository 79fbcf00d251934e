mod differential;
mod shared_bus;

pub use differential::{DRIVE_PAIRS, Differential};
pub use shared_bus::{DRIVE_PINS, ENABLE_PIN, SharedBus};

use autd3::core::geometry::Point3;
use tracing::{info, warn};

use crate::{
    config::LoopConfig,
    engine::{EngineError, PlaybackEngine, WaveId},
    error::DriverError,
    pulse::PulseTrain,
    registry::TransducerRegistry,
    schedule::{Delay, FrameSchedule, Scheduler},
    transducer::{Pin, PinAssignment, Transducer},
};

/// How transducers are wired and how their waveforms are built.
pub trait DriveMode: Send + Sync {
    /// Pin assignment of one transducer.
    type Assignment: PinAssignment;

    /// Every assignment the device offers.
    fn legal_assignments(&self) -> &[Self::Assignment];

    /// Pins driven by the mode itself rather than by a transducer.
    fn auxiliary_pins(&self) -> Vec<Pin>;

    /// Checks the mode's own constants against the loop constants.
    fn validate(&self, _config: &LoopConfig) -> Result<(), DriverError> {
        Ok(())
    }

    /// Frames added to every transducer's offset.
    fn latency(&self) -> u32 {
        0
    }

    /// Extra offset of `transducer` as a fraction of the loop.
    fn phase(&self, _transducer: &Transducer<Self::Assignment>) -> f64 {
        0.
    }

    /// Builds the pulse trains to submit, in submission order.
    fn assemble(
        &self,
        config: &LoopConfig,
        transducers: &[Transducer<Self::Assignment>],
        schedules: &[FrameSchedule],
    ) -> Result<Vec<PulseTrain>, DriverError>;

    /// Called once repeating playback has started.
    fn enable(&self, _engine: &mut dyn PlaybackEngine) -> Result<(), EngineError> {
        Ok(())
    }

    /// Called first when the driver stops.
    fn disable(&self, _engine: &mut dyn PlaybackEngine) -> Result<(), EngineError> {
        Ok(())
    }
}

/// Lifecycle of a driver.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DriverState {
    /// Pins have not been configured yet.
    Uninitialized,
    /// Pins are outputs and driven low, nothing is playing.
    Configured,
    /// A waveform is repeating.
    Streaming,
    /// Playback is halted and pins are driven low. Terminal.
    Stopped,
}

/// The single object driving all the transducer pins.
///
/// The driver owns its playback engine. Only one driver should operate a physical target at a
/// time, and calls must not be interleaved across threads.
pub struct UltrasonicDriver<E: PlaybackEngine, M: DriveMode> {
    engine: E,
    mode: M,
    registry: TransducerRegistry<M::Assignment>,
    config: LoopConfig,
    delay: Box<dyn Delay>,
    focus: Point3,
    state: DriverState,
    parallel_threshold: usize,
}

impl<E: PlaybackEngine, M: DriveMode> UltrasonicDriver<E, M> {
    /// Validates the transducers and configures every managed pin as a low output.
    pub fn new(
        mut engine: E,
        mode: M,
        transducers: impl IntoIterator<Item = Transducer<M::Assignment>>,
        delay: impl Delay + 'static,
        config: LoopConfig,
    ) -> Result<Self, DriverError> {
        config.validate()?;
        mode.validate(&config)?;
        if let Some(rate) = engine.sample_rate()
            && rate != config.sample_rate()
        {
            return Err(DriverError::SampleRateMismatch {
                configured: config.sample_rate(),
                engine: rate,
            });
        }
        let registry = TransducerRegistry::new(
            transducers,
            mode.legal_assignments(),
            &mode.auxiliary_pins(),
        )?;

        let mut driver = Self {
            engine,
            mode,
            registry,
            config,
            delay: Box::new(delay),
            focus: Point3::new(0., 0., 0.050),
            state: DriverState::Uninitialized,
            parallel_threshold: 4,
        };
        for pin in driver.managed_pins() {
            driver.engine.set_output(pin)?;
            driver.engine.write(pin, false)?;
        }
        driver.state = DriverState::Configured;
        info!(
            transducers = driver.registry.len(),
            carrier_hz = driver.config.carrier_frequency(),
            "driver configured"
        );
        Ok(driver)
    }

    /// Sets the number of transducers above which scheduling runs in parallel.
    pub fn with_parallel_threshold(mut self, parallel_threshold: usize) -> Self {
        self.parallel_threshold = parallel_threshold;
        self
    }

    #[allow(missing_docs)]
    pub const fn state(&self) -> DriverState {
        self.state
    }

    #[allow(missing_docs)]
    pub const fn config(&self) -> &LoopConfig {
        &self.config
    }

    #[allow(missing_docs)]
    pub fn transducers(&self) -> &[Transducer<M::Assignment>] {
        &self.registry
    }

    #[allow(missing_docs)]
    pub const fn engine(&self) -> &E {
        &self.engine
    }

    #[allow(missing_docs)]
    pub const fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    /// The point the array focuses on.
    pub const fn focus(&self) -> &Point3 {
        &self.focus
    }

    /// Moves the focal point. Takes effect on the next [`recalculate`](Self::recalculate).
    pub fn set_focus(&mut self, focus: Point3) {
        self.focus = focus;
    }

    /// Every pin the driver drives low when idle.
    pub fn managed_pins(&self) -> Vec<Pin> {
        self.registry
            .pins()
            .chain(self.mode.auxiliary_pins())
            .collect()
    }

    /// Computes the pulse trains for the current focus without submitting them.
    pub fn waveform(&self) -> Result<Vec<PulseTrain>, DriverError> {
        let scheduler = Scheduler {
            config: &self.config,
            delay: self.delay.as_ref(),
            latency: self.mode.latency(),
            parallel_threshold: self.parallel_threshold,
        };
        let mode = &self.mode;
        let schedules =
            scheduler.schedule_all(self.registry.as_slice(), &self.focus, |tr| mode.phase(tr))?;
        self.mode.assemble(&self.config, self.registry.as_slice(), &schedules)
    }

    /// Rebuilds the waveform for the current focus and starts repeating it.
    ///
    /// The whole waveform is computed before the engine is touched, so invalid input leaves the
    /// engine and the driver state as they were. Engine failures are not retried. After one the
    /// driver is back in [`DriverState::Configured`], since the engine no longer holds a known
    /// waveform, and the caller should [`stop`](Self::stop) it or recalculate again.
    pub fn recalculate(&mut self) -> Result<(), DriverError> {
        if !matches!(self.state, DriverState::Configured | DriverState::Streaming) {
            return Err(DriverError::InvalidState {
                operation: "recalculate",
                state: self.state,
            });
        }

        let trains = self.waveform()?;

        let wave = match self.submit(&trains) {
            Ok(wave) => wave,
            Err(e) => {
                self.state = DriverState::Configured;
                warn!(error = %e, "waveform submission failed");
                return Err(e.into());
            }
        };

        self.state = DriverState::Streaming;
        info!(
            focus = ?self.focus,
            trains = trains.len(),
            wave = wave.0,
            "streaming"
        );
        Ok(())
    }

    fn submit(&mut self, trains: &[PulseTrain]) -> Result<WaveId, EngineError> {
        self.engine.clear_waveforms()?;
        for train in trains {
            self.engine.append_pulses(train)?;
        }
        let wave = self.engine.create_waveform()?;
        self.engine.send_repeat(wave)?;
        self.mode.enable(&mut self.engine)?;
        Ok(wave)
    }

    /// Halts playback and drives every managed pin low.
    ///
    /// Every step is attempted even if an earlier one fails; the first failure is returned.
    pub fn stop(&mut self) -> Result<(), DriverError> {
        let disable = self.mode.disable(&mut self.engine);
        let halt = self.engine.halt();
        let idle = self
            .managed_pins()
            .into_iter()
            .map(|pin| self.engine.write(pin, false))
            .fold(Ok(()), Result::and);
        self.state = DriverState::Stopped;
        info!("stopped");
        disable.and(halt).and(idle).map_err(DriverError::from)
    }
}

impl<E: PlaybackEngine, M: DriveMode> Drop for UltrasonicDriver<E, M> {
    fn drop(&mut self) {
        if self.state != DriverState::Stopped
            && let Err(e) = self.stop()
        {
            warn!(error = %e, "failed to stop driver");
        }
    }
}
