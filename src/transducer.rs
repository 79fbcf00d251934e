use std::hash::Hash;

use autd3::core::geometry::Point3;
use derive_more::Display;
use getset::{CopyGetters, Getters};

/// A GPIO pin in the first bank of the output register.
#[derive(Clone, Copy, Debug, Display, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[display("GPIO{_0}")]
pub struct Pin(pub u8);

impl Pin {
    /// Number of pins addressable through one output register mask.
    pub const BANK_WIDTH: u8 = 32;

    /// The register bit of this pin, or zero if it lies outside the first bank.
    pub const fn mask(self) -> u32 {
        if self.0 < Self::BANK_WIDTH {
            1 << self.0
        } else {
            0
        }
    }

    /// The GPIO number.
    pub const fn gpio(self) -> u32 {
        self.0 as u32
    }
}

/// Two pins driven in anti-phase.
#[derive(Clone, Copy, Debug, Display, PartialEq, Eq, Hash)]
#[display("({primary}, {complement})")]
pub struct PinPair {
    /// Pin that carries the on-pulse.
    pub primary: Pin,
    /// Pin that carries the bitwise complement of `primary`.
    pub complement: Pin,
}

impl PinPair {
    #[allow(missing_docs)]
    pub const fn new(primary: u8, complement: u8) -> Self {
        Self {
            primary: Pin(primary),
            complement: Pin(complement),
        }
    }
}

/// How a transducer is wired to the output register.
pub trait PinAssignment: Copy + Eq + Hash + std::fmt::Debug + std::fmt::Display + Send + Sync {
    /// Every pin used by this assignment.
    fn pins(&self) -> Vec<Pin>;
}

impl PinAssignment for Pin {
    fn pins(&self) -> Vec<Pin> {
        vec![*self]
    }
}

impl PinAssignment for PinPair {
    fn pins(&self) -> Vec<Pin> {
        vec![self.primary, self.complement]
    }
}

/// A transducer to be driven.
#[derive(Clone, Debug, PartialEq, Getters, CopyGetters)]
pub struct Transducer<A: PinAssignment> {
    /// Index of the transducer in the driver's list.
    #[getset(get_copy = "pub")]
    pub(crate) id: usize,
    /// Location in metres where the origin is the centre of the array.
    #[getset(get = "pub")]
    location: Point3,
    /// Pins driving the transducer.
    #[getset(get_copy = "pub")]
    assignment: A,
}

impl<A: PinAssignment> Transducer<A> {
    /// Creates a transducer at `location` driven through `assignment`.
    ///
    /// The id is assigned from the transducer's position when it is handed to a driver.
    pub fn new(location: Point3, assignment: A) -> Self {
        Self {
            id: 0,
            location,
            assignment,
        }
    }
}
