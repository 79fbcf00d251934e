use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use derive_more::Debug;
use getset::{CopyGetters, Getters};
use tracing::debug;

use super::{EngineError, PlaybackEngine, Trace, WaveId};
use crate::{pulse::Pulse, transducer::Pin};

const PI_EMPTY_WAVEFORM: i32 = -69;
const PI_BAD_WAVE_ID: i32 = -66;
const PI_NOT_PERMITTED: i32 = -41;

/// The operations of the playback contract.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Operation {
    #[allow(missing_docs)]
    SetOutput,
    #[allow(missing_docs)]
    Write,
    #[allow(missing_docs)]
    ClearWaveforms,
    #[allow(missing_docs)]
    AppendPulses,
    #[allow(missing_docs)]
    CreateWaveform,
    #[allow(missing_docs)]
    SendRepeat,
    #[allow(missing_docs)]
    Halt,
}

impl Operation {
    const fn name(self) -> &'static str {
        match self {
            Self::SetOutput => "set_output",
            Self::Write => "write",
            Self::ClearWaveforms => "clear_waveforms",
            Self::AppendPulses => "append_pulses",
            Self::CreateWaveform => "create_waveform",
            Self::SendRepeat => "send_repeat",
            Self::Halt => "halt",
        }
    }
}

/// A call received by an [`EmulatedEngine`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EngineCall {
    #[allow(missing_docs)]
    SetOutput(Pin),
    #[allow(missing_docs)]
    Write(Pin, bool),
    #[allow(missing_docs)]
    ClearWaveforms,
    #[allow(missing_docs)]
    AppendPulses(Vec<Pulse>),
    #[allow(missing_docs)]
    CreateWaveform(WaveId),
    #[allow(missing_docs)]
    SendRepeat(WaveId),
    #[allow(missing_docs)]
    Halt,
}

impl EngineCall {
    /// The operation this call performed.
    pub const fn operation(&self) -> Operation {
        match self {
            Self::SetOutput(_) => Operation::SetOutput,
            Self::Write(..) => Operation::Write,
            Self::ClearWaveforms => Operation::ClearWaveforms,
            Self::AppendPulses(_) => Operation::AppendPulses,
            Self::CreateWaveform(_) => Operation::CreateWaveform,
            Self::SendRepeat(_) => Operation::SendRepeat,
            Self::Halt => Operation::Halt,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub(crate) struct Waveform {
    /// Set and clear masks applied at each frame offset.
    pub(crate) edges: BTreeMap<u32, (u32, u32)>,
    pub(crate) length: u32,
}

impl Waveform {
    fn add(&mut self, pulses: &[Pulse]) {
        let mut t = 0;
        pulses.iter().for_each(|p| {
            if p.set != 0 || p.clear != 0 {
                let edge = self.edges.entry(t).or_default();
                edge.0 |= p.set;
                edge.1 |= p.clear;
            }
            t += p.duration;
        });
        self.length = self.length.max(t);
    }

    pub(crate) fn apply(&self, frame: u32, register: u32) -> u32 {
        self.edges
            .get(&frame)
            .map_or(register, |&(set, clear)| (register | set) & !clear)
    }

    /// Bits driven by the waveform.
    fn mask(&self) -> u32 {
        self.edges.values().fold(0, |acc, (set, clear)| acc | set | clear)
    }

    /// Register at the end of a loop once playback has settled.
    fn steady_state(&self, start: u32) -> u32 {
        let end = (0..2).fold(start, |register, _| {
            (0..self.length).fold(register, |r, frame| self.apply(frame, r))
        });
        (start & !self.mask()) | (end & self.mask())
    }
}

/// An in-memory playback engine.
///
/// Sequences appended to the queue are merged the way a DMA waveform engine merges them: every
/// sequence starts at frame zero and set/clear masks landing on the same frame are combined
/// bitwise. Every call is recorded, and any operation can be made to fail.
#[derive(Debug, Getters, CopyGetters)]
pub struct EmulatedEngine {
    sample_rate: u32,
    /// Pins configured as outputs.
    #[getset(get = "pub")]
    outputs: BTreeSet<Pin>,
    /// Static level of the output register.
    #[getset(get_copy = "pub")]
    register: u32,
    #[debug(skip)]
    queue: Waveform,
    #[debug(skip)]
    waves: HashMap<WaveId, Waveform>,
    next_wave: u32,
    /// Waveform currently repeating.
    #[getset(get_copy = "pub")]
    playing: Option<WaveId>,
    /// Every call received so far.
    #[getset(get = "pub")]
    #[debug(skip)]
    calls: Vec<EngineCall>,
    faults: HashSet<Operation>,
}

impl Default for EmulatedEngine {
    fn default() -> Self {
        Self::new(1_000_000)
    }
}

impl EmulatedEngine {
    /// Creates an engine that plays back at `sample_rate` frames per second.
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            outputs: BTreeSet::new(),
            register: 0,
            queue: Waveform::default(),
            waves: HashMap::new(),
            next_wave: 0,
            playing: None,
            calls: Vec::new(),
            faults: HashSet::new(),
        }
    }

    /// Makes every subsequent call of `operation` fail.
    pub fn inject_fault(&mut self, operation: Operation) {
        self.faults.insert(operation);
    }

    /// Removes every injected fault.
    pub fn clear_faults(&mut self) {
        self.faults.clear();
    }

    /// Forgets the recorded calls.
    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    /// Static level of `pin`.
    pub fn level(&self, pin: Pin) -> bool {
        self.register & pin.mask() != 0
    }

    /// Renders `cycles` repetitions of the playing waveform frame by frame.
    ///
    /// Returns `None` when nothing is playing.
    pub fn trace(&self, cycles: usize) -> Option<Trace> {
        let wave = self.waves.get(&self.playing?)?;
        let mut register = self.register;
        let frames = (0..cycles)
            .flat_map(|_| 0..wave.length)
            .map(|frame| {
                register = wave.apply(frame, register);
                register
            })
            .collect();
        Some(Trace::new(wave.length, frames))
    }

    fn check(&mut self, operation: Operation) -> Result<(), EngineError> {
        if self.faults.contains(&operation) {
            debug!(operation = operation.name(), "injected fault");
            return Err(EngineError::Rejected {
                command: operation.name(),
                code: PI_NOT_PERMITTED,
            });
        }
        Ok(())
    }
}

impl PlaybackEngine for EmulatedEngine {
    fn sample_rate(&self) -> Option<u32> {
        Some(self.sample_rate)
    }

    fn set_output(&mut self, pin: Pin) -> Result<(), EngineError> {
        self.check(Operation::SetOutput)?;
        self.outputs.insert(pin);
        self.calls.push(EngineCall::SetOutput(pin));
        Ok(())
    }

    fn write(&mut self, pin: Pin, high: bool) -> Result<(), EngineError> {
        self.check(Operation::Write)?;
        if high {
            self.register |= pin.mask();
        } else {
            self.register &= !pin.mask();
        }
        self.calls.push(EngineCall::Write(pin, high));
        Ok(())
    }

    fn clear_waveforms(&mut self) -> Result<(), EngineError> {
        self.check(Operation::ClearWaveforms)?;
        self.queue = Waveform::default();
        self.waves.clear();
        self.calls.push(EngineCall::ClearWaveforms);
        Ok(())
    }

    fn append_pulses(&mut self, pulses: &[Pulse]) -> Result<(), EngineError> {
        self.check(Operation::AppendPulses)?;
        self.queue.add(pulses);
        self.calls.push(EngineCall::AppendPulses(pulses.to_vec()));
        Ok(())
    }

    fn create_waveform(&mut self) -> Result<WaveId, EngineError> {
        self.check(Operation::CreateWaveform)?;
        if self.queue.length == 0 {
            return Err(EngineError::Rejected {
                command: Operation::CreateWaveform.name(),
                code: PI_EMPTY_WAVEFORM,
            });
        }
        let id = WaveId(self.next_wave);
        self.next_wave += 1;
        self.waves.insert(id, std::mem::take(&mut self.queue));
        self.calls.push(EngineCall::CreateWaveform(id));
        Ok(id)
    }

    fn send_repeat(&mut self, wave: WaveId) -> Result<(), EngineError> {
        self.check(Operation::SendRepeat)?;
        if !self.waves.contains_key(&wave) {
            return Err(EngineError::Rejected {
                command: Operation::SendRepeat.name(),
                code: PI_BAD_WAVE_ID,
            });
        }
        self.playing = Some(wave);
        self.calls.push(EngineCall::SendRepeat(wave));
        Ok(())
    }

    fn halt(&mut self) -> Result<(), EngineError> {
        self.check(Operation::Halt)?;
        if let Some(wave) = self.playing.take().and_then(|id| self.waves.get(&id)) {
            self.register = wave.steady_state(self.register);
        }
        self.calls.push(EngineCall::Halt);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge() -> Result<(), EngineError> {
        let mut engine = EmulatedEngine::default();
        engine.append_pulses(&[Pulse::new(1, 0, 2), Pulse::new(0, 1, 2)])?;
        engine.append_pulses(&[Pulse::idle(1), Pulse::new(2, 0, 3), Pulse::new(0, 2, 1)])?;
        let wave = engine.create_waveform()?;
        engine.send_repeat(wave)?;

        let trace = engine.trace(1).unwrap();
        assert_eq!(5, trace.loop_length());
        assert_eq!(&[1, 3, 2, 2, 0], trace.frames());
        Ok(())
    }

    #[test]
    fn test_create_empty() {
        let mut engine = EmulatedEngine::default();
        assert_eq!(
            Err(EngineError::Rejected {
                command: "create_waveform",
                code: PI_EMPTY_WAVEFORM
            }),
            engine.create_waveform()
        );
    }

    #[test]
    fn test_clear_invalidates_waves() -> Result<(), EngineError> {
        let mut engine = EmulatedEngine::default();
        engine.append_pulses(&[Pulse::idle(3)])?;
        let wave = engine.create_waveform()?;
        engine.clear_waveforms()?;
        assert_eq!(
            Err(EngineError::Rejected {
                command: "send_repeat",
                code: PI_BAD_WAVE_ID
            }),
            engine.send_repeat(wave)
        );
        Ok(())
    }

    #[test]
    fn test_halt_freezes_register() -> Result<(), EngineError> {
        let mut engine = EmulatedEngine::default();
        engine.append_pulses(&[Pulse::new(0, 1, 2), Pulse::new(1, 0, 3)])?;
        let wave = engine.create_waveform()?;
        engine.send_repeat(wave)?;
        engine.halt()?;
        assert!(engine.level(Pin(0)));
        assert_eq!(None, engine.playing());
        assert_eq!(None, engine.trace(1));
        Ok(())
    }

    #[rstest::rstest]
    #[case(Operation::SetOutput)]
    #[case(Operation::Write)]
    #[case(Operation::Halt)]
    #[test]
    fn test_fault(#[case] operation: Operation) {
        let mut engine = EmulatedEngine::default();
        engine.inject_fault(operation);
        let result = match operation {
            Operation::SetOutput => engine.set_output(Pin(1)),
            Operation::Write => engine.write(Pin(1), true),
            _ => engine.halt(),
        };
        assert!(matches!(result, Err(EngineError::Rejected { code: PI_NOT_PERMITTED, .. })));
        assert!(engine.calls().is_empty());
        engine.clear_faults();
        assert!(engine.halt().is_ok());
    }
}
