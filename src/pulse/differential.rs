use super::{Pulse, PulseTrain};
use crate::{
    error::DriverError,
    schedule::FrameSchedule,
    transducer::{Pin, PinPair},
};

/// The three-segment waveform of one differentially driven transducer.
///
/// The complement pin is set in exactly the segments where the primary pin is cleared, and the
/// other way round. Empty segments are left out of `train`, since a set and a clear of the same
/// pin landing on one frame would be merged by the engine.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DifferentialTrain {
    /// `true` when the primary pin is high at the start and end of the loop.
    pub wrapped: bool,
    /// Durations of the three segments.
    pub segments: [u32; 3],
    #[allow(missing_docs)]
    pub train: PulseTrain,
}

fn segment(pair: PinPair, high: bool, duration: u32) -> Pulse {
    let (primary, complement) = (pair.primary.mask(), pair.complement.mask());
    if high {
        Pulse::new(primary, complement, duration)
    } else {
        Pulse::new(complement, primary, duration)
    }
}

/// Builds the anti-phase waveform of one transducer.
///
/// When the on-pulse fits inside the loop the primary pin is low, high for `on_width`, then low
/// again. When it crosses the loop boundary the primary pin is high, low for `off_width`, then
/// high again.
pub fn assemble_differential(
    pair: PinPair,
    schedule: &FrameSchedule,
    loop_length: u32,
    on_width: u32,
    off_width: u32,
) -> Result<DifferentialTrain, DriverError> {
    let on_pulse_time = schedule.on_frame as i64;
    let off_pulse_time = schedule.off_frame as i64;
    let loop_length_i = loop_length as i64;

    let wrapped = on_pulse_time >= off_pulse_time;
    let (first, width, starts_high) = if wrapped {
        (off_pulse_time, off_width as i64, true)
    } else {
        (on_pulse_time, on_width as i64, false)
    };
    let durations = [first, width, loop_length_i - (first + width)];

    let mut segments = [0; 3];
    for (i, duration) in durations.into_iter().enumerate() {
        segments[i] = u32::try_from(duration).map_err(|_| DriverError::NegativeSegment {
            id: schedule.id,
            segment: i,
        })?;
    }

    let pulses = segments
        .iter()
        .enumerate()
        .filter(|&(_, &duration)| duration > 0)
        .map(|(i, &duration)| {
            let high = if i == 1 { !starts_high } else { starts_high };
            segment(pair, high, duration)
        })
        .collect();

    Ok(DifferentialTrain {
        wrapped,
        segments,
        train: PulseTrain::new(pulses, loop_length)?,
    })
}

/// Builds the observation waveform: high for the first frame of the loop, low for the rest.
pub fn sync_train(pin: Pin, loop_length: u32) -> Result<PulseTrain, DriverError> {
    PulseTrain::new(
        vec![
            Pulse::new(pin.mask(), 0, 1),
            Pulse::new(0, pin.mask(), loop_length.saturating_sub(1)),
        ],
        loop_length,
    )
}
