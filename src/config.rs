use getset::CopyGetters;

use crate::{error::DriverError, transducer::Pin};

/// Loop constants shared by every transducer of a driver.
#[derive(Clone, Copy, Debug, PartialEq, Eq, CopyGetters)]
#[getset(get_copy = "pub")]
pub struct LoopConfig {
    /// Frames per second of the playback clock.
    sample_rate: u32,
    /// Frames in one repeating cycle.
    loop_length: u32,
    /// Frames a transducer is held high within one cycle.
    on_width: u32,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            sample_rate: 1_000_000,
            loop_length: 25,
            on_width: 12,
        }
    }
}

impl LoopConfig {
    #[allow(missing_docs)]
    pub const fn with_sample_rate(mut self, sample_rate: u32) -> Self {
        self.sample_rate = sample_rate;
        self
    }

    #[allow(missing_docs)]
    pub const fn with_loop_length(mut self, loop_length: u32) -> Self {
        self.loop_length = loop_length;
        self
    }

    #[allow(missing_docs)]
    pub const fn with_on_width(mut self, on_width: u32) -> Self {
        self.on_width = on_width;
        self
    }

    /// Frequency of the emitted carrier in Hz.
    pub fn carrier_frequency(&self) -> f64 {
        self.sample_rate as f64 / self.loop_length as f64
    }

    pub(crate) fn validate(&self) -> Result<(), DriverError> {
        if self.sample_rate == 0 {
            return Err(DriverError::InvalidLoopConfig("sample rate must be positive"));
        }
        if self.loop_length < 2 {
            return Err(DriverError::InvalidLoopConfig(
                "loop length must be at least 2 frames",
            ));
        }
        if self.on_width == 0 || self.on_width >= self.loop_length {
            return Err(DriverError::InvalidLoopConfig(
                "on width must lie strictly between 0 and the loop length",
            ));
        }
        Ok(())
    }
}

/// Extra constants of the differential drive.
#[derive(Clone, Copy, Debug, PartialEq, Eq, CopyGetters)]
#[getset(get_copy = "pub")]
pub struct DifferentialConfig {
    /// Frames the primary pin is held low when the high interval wraps the loop boundary.
    off_width: u32,
    /// Frames added to every transducer to compensate output latency.
    latency: u32,
    /// Pin pulsed high for one frame at the start of every loop.
    sync_pin: Pin,
}

impl Default for DifferentialConfig {
    fn default() -> Self {
        Self {
            off_width: 13,
            latency: 0,
            sync_pin: Pin(4),
        }
    }
}

impl DifferentialConfig {
    #[allow(missing_docs)]
    pub const fn with_off_width(mut self, off_width: u32) -> Self {
        self.off_width = off_width;
        self
    }

    #[allow(missing_docs)]
    pub const fn with_latency(mut self, latency: u32) -> Self {
        self.latency = latency;
        self
    }

    #[allow(missing_docs)]
    pub const fn with_sync_pin(mut self, sync_pin: Pin) -> Self {
        self.sync_pin = sync_pin;
        self
    }

    pub(crate) fn validate(&self, config: &LoopConfig) -> Result<(), DriverError> {
        if self.off_width == 0 {
            return Err(DriverError::InvalidLoopConfig("off width must be positive"));
        }
        if config.on_width() + self.off_width > config.loop_length() {
            return Err(DriverError::InvalidLoopConfig(
                "on width and off width must fit in one loop",
            ));
        }
        if self.sync_pin.mask() == 0 {
            return Err(DriverError::InvalidLoopConfig(
                "sync pin must be in the first bank",
            ));
        }
        Ok(())
    }
}
