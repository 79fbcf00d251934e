use std::{
    io::{Read, Write},
    net::{TcpStream, ToSocketAddrs},
};

use bytemuck::{Pod, Zeroable};
use tracing::debug;

use super::{EngineError, PlaybackEngine, WaveId};
use crate::{pulse::Pulse, transducer::Pin};

const CMD_MODES: u32 = 0;
const CMD_WRITE: u32 = 4;
const CMD_WVCLR: u32 = 27;
const CMD_WVAG: u32 = 28;
const CMD_WVHLT: u32 = 33;
const CMD_WVCRE: u32 = 49;
const CMD_WVTXR: u32 = 52;

const MODE_OUTPUT: u32 = 1;

const DEFAULT_ADDR: &str = "localhost";
const DEFAULT_PORT: &str = "8888";

#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
struct Header {
    cmd: u32,
    p1: u32,
    p2: u32,
    p3: u32,
}

impl Header {
    fn new(cmd: u32, p1: u32, p2: u32, p3: u32) -> Self {
        Self {
            cmd: cmd.to_le(),
            p1: p1.to_le(),
            p2: p2.to_le(),
            p3: p3.to_le(),
        }
    }

    fn status(&self) -> i32 {
        u32::from_le(self.p3) as i32
    }
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
struct RawPulse {
    gpio_on: u32,
    gpio_off: u32,
    delay: u32,
}

impl From<&Pulse> for RawPulse {
    fn from(p: &Pulse) -> Self {
        Self {
            gpio_on: p.set.to_le(),
            gpio_off: p.clear.to_le(),
            delay: p.duration.to_le(),
        }
    }
}

/// Client of the pigpio daemon's socket interface.
///
/// pigpio plays waveforms with microsecond resolution, so one frame is one microsecond.
pub struct PigpioEngine<S: Read + Write = TcpStream> {
    stream: S,
}

impl PigpioEngine<TcpStream> {
    /// Connects to the daemon named by `PIGPIO_ADDR` and `PIGPIO_PORT`, defaulting to
    /// `localhost:8888`.
    pub fn connect() -> Result<Self, EngineError> {
        let addr = std::env::var("PIGPIO_ADDR").unwrap_or_else(|_| DEFAULT_ADDR.to_string());
        let port = std::env::var("PIGPIO_PORT").unwrap_or_else(|_| DEFAULT_PORT.to_string());
        Self::connect_to(format!("{addr}:{port}"))
    }

    /// Connects to the daemon at `addr`.
    pub fn connect_to(addr: impl ToSocketAddrs) -> Result<Self, EngineError> {
        let stream = TcpStream::connect(addr)?;
        stream.set_nodelay(true)?;
        Ok(Self::from_stream(stream))
    }
}

impl<S: Read + Write> PigpioEngine<S> {
    /// Talks to the daemon over an already open stream.
    pub fn from_stream(stream: S) -> Self {
        Self { stream }
    }

    fn command(
        &mut self,
        name: &'static str,
        cmd: u32,
        p1: u32,
        p2: u32,
        ext: &[u8],
    ) -> Result<u32, EngineError> {
        debug!(command = name, p1, p2, ext_len = ext.len(), "pigpio");
        let header = Header::new(cmd, p1, p2, ext.len() as u32);
        let mut request = Vec::with_capacity(size_of::<Header>() + ext.len());
        request.extend_from_slice(bytemuck::bytes_of(&header));
        request.extend_from_slice(ext);
        self.stream.write_all(&request)?;
        self.stream.flush()?;

        let mut response = [0u8; size_of::<Header>()];
        self.stream.read_exact(&mut response)?;
        let status = bytemuck::pod_read_unaligned::<Header>(&response).status();
        if status < 0 {
            return Err(EngineError::Rejected {
                command: name,
                code: status,
            });
        }
        Ok(status as u32)
    }
}

impl<S: Read + Write> PlaybackEngine for PigpioEngine<S> {
    fn sample_rate(&self) -> Option<u32> {
        Some(1_000_000)
    }

    fn set_output(&mut self, pin: Pin) -> Result<(), EngineError> {
        self.command("MODES", CMD_MODES, pin.gpio(), MODE_OUTPUT, &[])
            .map(|_| ())
    }

    fn write(&mut self, pin: Pin, high: bool) -> Result<(), EngineError> {
        self.command("WRITE", CMD_WRITE, pin.gpio(), high as u32, &[])
            .map(|_| ())
    }

    fn clear_waveforms(&mut self) -> Result<(), EngineError> {
        self.command("WVCLR", CMD_WVCLR, 0, 0, &[]).map(|_| ())
    }

    fn append_pulses(&mut self, pulses: &[Pulse]) -> Result<(), EngineError> {
        if pulses.is_empty() {
            return Ok(());
        }
        let raw = pulses.iter().map(RawPulse::from).collect::<Vec<_>>();
        self.command("WVAG", CMD_WVAG, 0, 0, bytemuck::cast_slice(raw.as_slice()))
            .map(|_| ())
    }

    fn create_waveform(&mut self) -> Result<WaveId, EngineError> {
        self.command("WVCRE", CMD_WVCRE, 0, 0, &[]).map(WaveId)
    }

    fn send_repeat(&mut self, wave: WaveId) -> Result<(), EngineError> {
        self.command("WVTXR", CMD_WVTXR, wave.0, 0, &[]).map(|_| ())
    }

    fn halt(&mut self) -> Result<(), EngineError> {
        self.command("WVHLT", CMD_WVHLT, 0, 0, &[]).map(|_| ())
    }
}
