use std::collections::HashSet;

use derive_more::Deref;

use crate::{
    error::DriverError,
    transducer::{Pin, PinAssignment, Transducer},
};

/// Validated set of transducers with unique, legal pin assignments.
#[derive(Clone, Debug, Deref)]
pub struct TransducerRegistry<A: PinAssignment> {
    #[deref]
    transducers: Vec<Transducer<A>>,
}

impl<A: PinAssignment> TransducerRegistry<A> {
    /// Checks every transducer against the device's pin table.
    ///
    /// Each assignment must appear in `legal` and may be used once. No pin may be shared between
    /// two assignments or with any of the `reserved` pins.
    pub fn new(
        transducers: impl IntoIterator<Item = Transducer<A>>,
        legal: &[A],
        reserved: &[Pin],
    ) -> Result<Self, DriverError> {
        let mut available = legal.iter().copied().collect::<HashSet<_>>();
        let mut used_pins = HashSet::new();
        let transducers = transducers
            .into_iter()
            .enumerate()
            .map(|(id, mut tr)| {
                let assignment = tr.assignment();
                if !available.remove(&assignment) {
                    return Err(if legal.contains(&assignment) {
                        DriverError::DuplicateAssignment(assignment.to_string())
                    } else {
                        DriverError::IllegalAssignment(assignment.to_string())
                    });
                }
                for pin in assignment.pins() {
                    if reserved.contains(&pin) {
                        return Err(DriverError::ReservedPin(pin));
                    }
                    if pin.mask() == 0 {
                        return Err(DriverError::IllegalAssignment(assignment.to_string()));
                    }
                    if !used_pins.insert(pin) {
                        return Err(DriverError::DuplicateAssignment(pin.to_string()));
                    }
                }
                tr.id = id;
                Ok(tr)
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { transducers })
    }

    /// Every pin driven by a registered transducer.
    pub fn pins(&self) -> impl Iterator<Item = Pin> + '_ {
        self.transducers.iter().flat_map(|tr| tr.assignment().pins())
    }
}
