#[cfg(feature = "polars")]
use polars::{
    frame::DataFrame,
    prelude::{Column, PolarsResult},
};

use crate::transducer::Pin;

/// Output register sampled at every frame of a played waveform.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Trace {
    loop_length: u32,
    frames: Vec<u32>,
}

impl Trace {
    pub(crate) const fn new(loop_length: u32, frames: Vec<u32>) -> Self {
        Self {
            loop_length,
            frames,
        }
    }

    /// Length of one repetition in frames.
    pub const fn loop_length(&self) -> u32 {
        self.loop_length
    }

    /// Register value at each frame.
    pub fn frames(&self) -> &[u32] {
        &self.frames
    }

    /// Number of rendered repetitions.
    pub fn cycles(&self) -> usize {
        self.frames.len() / self.loop_length as usize
    }

    /// Register values of the `n`-th repetition, or `None` if it was not rendered.
    pub fn cycle(&self, n: usize) -> Option<&[u32]> {
        let len = self.loop_length as usize;
        self.frames.get(n * len..(n + 1) * len)
    }

    /// Level of `pin` at each frame.
    pub fn levels(&self, pin: Pin) -> Vec<bool> {
        self.frames.iter().map(|r| r & pin.mask() != 0).collect()
    }

    /// Number of rising edges of `pin` in the `n`-th repetition, counting across the loop
    /// boundary.
    pub fn rising_edges(&self, pin: Pin, n: usize) -> Option<usize> {
        let cycle = self.cycle(n)?;
        let high = |r: &u32| r & pin.mask() != 0;
        Some(
            cycle
                .iter()
                .zip(cycle.iter().cycle().skip(cycle.len() - 1))
                .filter(|&(cur, prev)| high(cur) && !high(prev))
                .count(),
        )
    }

    /// Number of frames `pin` is high in the `n`-th repetition.
    pub fn high_frames(&self, pin: Pin, n: usize) -> Option<usize> {
        self.cycle(n)
            .map(|cycle| cycle.iter().filter(|&r| r & pin.mask() != 0).count())
    }

    #[cfg(feature = "polars")]
    /// Returns the level of each pin per frame.
    pub fn to_dataframe(&self, pins: &[Pin]) -> PolarsResult<DataFrame> {
        let frame = (0..self.frames.len() as u32).collect::<Vec<_>>();
        DataFrame::new(
            std::iter::once(Column::new("frame".into(), &frame))
                .chain(pins.iter().map(|&pin| {
                    let levels = self
                        .levels(pin)
                        .into_iter()
                        .map(u8::from)
                        .collect::<Vec<_>>();
                    Column::new(pin.to_string().into(), &levels)
                }))
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trace() -> Trace {
        Trace::new(5, vec![1, 1, 0, 0, 1, 3, 2, 2, 2, 3])
    }

    #[test]
    fn test_cycle() {
        let trace = trace();
        assert_eq!(2, trace.cycles());
        assert_eq!(Some(&[1, 1, 0, 0, 1][..]), trace.cycle(0));
        assert_eq!(Some(&[3, 2, 2, 2, 3][..]), trace.cycle(1));
    }

    #[rstest::rstest]
    #[case(1, 3, Pin(0), 0)]
    #[case(1, 2, Pin(0), 1)]
    #[case(0, 0, Pin(1), 0)]
    #[case(0, 5, Pin(1), 1)]
    #[test]
    fn test_edges(
        #[case] edges: usize,
        #[case] high: usize,
        #[case] pin: Pin,
        #[case] n: usize,
    ) {
        let trace = trace();
        assert_eq!(Some(edges), trace.rising_edges(pin, n));
        assert_eq!(Some(high), trace.high_frames(pin, n));
    }

    #[test]
    fn test_cycle_not_rendered() {
        let trace = trace();
        assert_eq!(None, trace.cycle(2));
        assert_eq!(None, trace.rising_edges(Pin(0), 2));
        assert_eq!(None, trace.high_frames(Pin(0), 5));
    }

    #[cfg(feature = "polars")]
    #[test]
    fn test_dataframe() -> PolarsResult<()> {
        let df = trace().to_dataframe(&[Pin(0), Pin(1)])?;
        assert_eq!((10, 3), df.shape());
        assert_eq!(
            vec![0, 0, 0, 0, 0, 1, 1, 1, 1, 1],
            df.column("GPIO1")?
                .u8()?
                .iter()
                .flatten()
                .collect::<Vec<_>>()
        );
        Ok(())
    }
}
