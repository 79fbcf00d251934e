use std::cmp::Ordering;

use autd3::core::geometry::Point3;
use rayon::prelude::*;

use crate::{
    config::LoopConfig,
    error::DriverError,
    transducer::{PinAssignment, PinPair, Transducer},
};

/// Time of flight from a transducer to the focal point.
pub trait Delay: Send + Sync {
    /// Returns the delay in seconds for a transducer at `location` focusing on `focus`.
    fn delay(&self, location: &Point3, focus: &Point3) -> f64;
}

impl<F> Delay for F
where
    F: Fn(&Point3, &Point3) -> f64 + Send + Sync,
{
    fn delay(&self, location: &Point3, focus: &Point3) -> f64 {
        self(location, focus)
    }
}

/// Sub-cycle phase offset of a differentially driven transducer.
pub trait Phase: Send + Sync {
    /// Returns the offset as a fraction of the loop length.
    fn phase(&self, transducer: &Transducer<PinPair>) -> f64;
}

impl<F> Phase for F
where
    F: Fn(&Transducer<PinPair>) -> f64 + Send + Sync,
{
    fn phase(&self, transducer: &Transducer<PinPair>) -> f64 {
        self(transducer)
    }
}

/// Switch-on and switch-off frames of one transducer, each wrapped into the loop.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameSchedule {
    #[allow(missing_docs)]
    pub id: usize,
    #[allow(missing_docs)]
    pub on_frame: u32,
    #[allow(missing_docs)]
    pub off_frame: u32,
}

impl FrameSchedule {
    /// Whether the high interval crosses the loop boundary.
    pub const fn wraps(&self) -> bool {
        self.off_frame <= self.on_frame
    }

    /// The two switch events of this schedule.
    pub const fn events(&self) -> [SwitchEvent; 2] {
        [
            SwitchEvent {
                id: self.id,
                on: true,
                frame: self.on_frame,
            },
            SwitchEvent {
                id: self.id,
                on: false,
                frame: self.off_frame,
            },
        ]
    }
}

/// A request to switch a transducer on or off at a frame of the loop.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SwitchEvent {
    /// Id of the transducer.
    pub id: usize,
    #[allow(missing_docs)]
    pub on: bool,
    /// Frame in `[0, loop_length)`.
    pub frame: u32,
}

impl Ord for SwitchEvent {
    fn cmp(&self, other: &Self) -> Ordering {
        self.frame
            .cmp(&other.frame)
            .then(self.id.cmp(&other.id))
            .then(self.on.cmp(&other.on))
    }
}

impl PartialOrd for SwitchEvent {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Converts transducer locations into frame offsets.
pub struct Scheduler<'a> {
    pub(crate) config: &'a LoopConfig,
    pub(crate) delay: &'a dyn Delay,
    pub(crate) latency: u32,
    pub(crate) parallel_threshold: usize,
}

impl Scheduler<'_> {
    /// Wraps an offset in whole frames into the loop.
    pub(crate) fn wrap(&self, frames: i64) -> u32 {
        frames.rem_euclid(self.config.loop_length() as i64) as u32
    }

    /// Schedules a transducer whose extra phase offset is `phase` loops.
    pub fn schedule<A: PinAssignment>(
        &self,
        transducer: &Transducer<A>,
        focus: &Point3,
        phase: f64,
    ) -> Result<FrameSchedule, DriverError> {
        let delay = self.delay.delay(transducer.location(), focus);
        if !delay.is_finite() || delay < 0. {
            return Err(DriverError::InvalidDelay {
                id: transducer.id(),
                delay,
            });
        }
        let frames = delay * self.config.sample_rate() as f64
            + phase * self.config.loop_length() as f64
            + self.latency as f64;
        // partial frames are dropped toward zero
        let frames = frames.trunc() as i64;
        Ok(FrameSchedule {
            id: transducer.id(),
            on_frame: self.wrap(frames),
            off_frame: self.wrap(frames + self.config.on_width() as i64),
        })
    }

    /// Schedules every transducer, in parallel when there are more than `parallel_threshold`.
    pub fn schedule_all<A: PinAssignment>(
        &self,
        transducers: &[Transducer<A>],
        focus: &Point3,
        phase: impl Fn(&Transducer<A>) -> f64 + Sync,
    ) -> Result<Vec<FrameSchedule>, DriverError> {
        if transducers.len() > self.parallel_threshold {
            transducers
                .par_iter()
                .map(|tr| self.schedule(tr, focus, phase(tr)))
                .collect()
        } else {
            transducers
                .iter()
                .map(|tr| self.schedule(tr, focus, phase(tr)))
                .collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transducer::Pin;

    fn step_delay(location: &Point3, _: &Point3) -> f64 {
        if location.x == 0. { 0. } else { 0.000007 }
    }

    fn scheduler<'a>(config: &'a LoopConfig, delay: &'a dyn Delay, latency: u32) -> Scheduler<'a> {
        Scheduler {
            config,
            delay,
            latency,
            parallel_threshold: 4,
        }
    }

    #[rstest::rstest]
    #[case(0, 12, 0.)]
    #[case(7, 19, 0.016)]
    #[test]
    fn test_schedule(#[case] on_frame: u32, #[case] off_frame: u32, #[case] x: f32) {
        let config = LoopConfig::default();
        let scheduler = scheduler(&config, &step_delay, 0);
        let tr = Transducer::new(Point3::new(x, 0., 0.), Pin(21));
        assert_eq!(
            Ok(FrameSchedule {
                id: 0,
                on_frame,
                off_frame
            }),
            scheduler.schedule(&tr, &Point3::new(0., 0., 0.05), 0.)
        );
    }

    #[rstest::rstest]
    #[case(20, 7, 20e-6, 0., 0)]
    #[case(0, 12, 25e-6, 0., 0)]
    #[case(5, 17, 0., 0.2, 0)]
    #[case(20, 7, 0., -0.2, 0)]
    #[case(3, 15, 1e-6, 0., 2)]
    #[case(7, 19, 7.6e-6, 0., 0)]
    #[case(24, 11, 24.9e-6, 0., 0)]
    #[case(22, 9, 0., -0.15, 0)]
    #[test]
    fn test_wrap(
        #[case] on_frame: u32,
        #[case] off_frame: u32,
        #[case] delay: f64,
        #[case] phase: f64,
        #[case] latency: u32,
    ) -> Result<(), DriverError> {
        let config = LoopConfig::default();
        let delay = move |_: &Point3, _: &Point3| delay;
        let scheduler = scheduler(&config, &delay, latency);
        let tr = Transducer::new(Point3::origin(), Pin(21));
        let schedule = scheduler.schedule(&tr, &Point3::origin(), phase)?;
        assert_eq!(on_frame, schedule.on_frame);
        assert_eq!(off_frame, schedule.off_frame);
        assert_eq!(off_frame < on_frame, schedule.wraps());
        Ok(())
    }

    #[rstest::rstest]
    #[case(-1e-6)]
    #[case(f64::NAN)]
    #[case(f64::INFINITY)]
    #[test]
    fn test_invalid_delay(#[case] delay: f64) {
        let config = LoopConfig::default();
        let delay = move |_: &Point3, _: &Point3| delay;
        let scheduler = scheduler(&config, &delay, 0);
        let tr = Transducer::new(Point3::origin(), Pin(21));
        assert!(matches!(
            scheduler.schedule(&tr, &Point3::origin(), 0.),
            Err(DriverError::InvalidDelay { id: 0, .. })
        ));
    }

    #[test]
    fn test_parallel_matches_sequential() -> Result<(), DriverError> {
        let config = LoopConfig::default();
        let delay = |location: &Point3, _: &Point3| location.x as f64 * 1e-3;
        let transducers = (0..16)
            .map(|i| {
                let mut tr = Transducer::new(Point3::new(i as f32, 0., 0.), Pin(i));
                tr.id = i as usize;
                tr
            })
            .collect::<Vec<_>>();
        let mut sequential = scheduler(&config, &delay, 0);
        sequential.parallel_threshold = usize::MAX;
        let parallel = scheduler(&config, &delay, 0);
        assert_eq!(
            sequential.schedule_all(&transducers, &Point3::origin(), |_| 0.)?,
            parallel.schedule_all(&transducers, &Point3::origin(), |_| 0.)?
        );
        Ok(())
    }

    #[test]
    fn test_event_order() {
        let event = |id, on, frame| SwitchEvent { id, on, frame };
        let mut events = [
            event(1, true, 3),
            event(0, false, 3),
            event(2, true, 0),
            event(0, true, 3),
        ];
        events.sort();
        assert_eq!(
            [(2, 0, true), (0, 3, false), (0, 3, true), (1, 3, true)],
            events.map(|e| (e.id, e.frame, e.on))
        );
    }
}
