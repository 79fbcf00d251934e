use itertools::Itertools;

use super::{Pulse, PulseTrain};
use crate::{
    error::DriverError,
    schedule::FrameSchedule,
    transducer::{Pin, Transducer},
};

/// Merges the switch events of every transducer into one pulse train on a common register.
///
/// Each event becomes a zero-duration set or clear pulse, and idle pulses fill the gaps so that
/// the train spans exactly `loop_length` frames.
pub fn assemble_shared_bus(
    transducers: &[Transducer<Pin>],
    schedules: &[FrameSchedule],
    loop_length: u32,
) -> Result<PulseTrain, DriverError> {
    let mut cursor = 0;
    let mut pulses = Vec::with_capacity(schedules.len() * 4 + 1);
    for event in schedules.iter().flat_map(FrameSchedule::events).sorted() {
        if event.frame >= loop_length {
            return Err(DriverError::LoopLengthMismatch {
                expected: loop_length,
                actual: event.frame as i64,
            });
        }
        if event.frame != cursor {
            pulses.push(Pulse::idle(event.frame - cursor));
            cursor = event.frame;
        }
        let mask = transducers
            .get(event.id)
            .ok_or(DriverError::UnknownTransducer(event.id))?
            .assignment()
            .mask();
        pulses.push(if event.on {
            Pulse::new(mask, 0, 0)
        } else {
            Pulse::new(0, mask, 0)
        });
    }
    pulses.push(Pulse::idle(loop_length - cursor));
    PulseTrain::new(pulses, loop_length)
}
