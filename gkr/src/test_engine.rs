use std::sync::Arc;

use arith::{NativeRing, Ring, RingError};
use ark_ff::PrimeField;
use transcript::{MimcSponge, RingSponge};

use crate::{CircuitDescriptor, CommitError, Hint, HintError, OuterApi};

/// A direct-evaluation stand-in for an outer constraint builder: variables
/// are field values, hints run eagerly, commitments are MiMC digests and
/// equality assertions fail fast. The bridge tests (and downstream users'
/// tests) run the full solve/prove/verify pipeline through it without a
/// SNARK backend.
#[derive(Debug)]
pub struct TestEngine<F: PrimeField> {
    /// Descriptors attached by `Solution::verify`, for inspection.
    pub attached: Vec<CircuitDescriptor>,
    _marker: std::marker::PhantomData<F>,
}

impl<F: PrimeField> Default for TestEngine<F> {
    fn default() -> Self {
        Self {
            attached: Vec::new(),
            _marker: std::marker::PhantomData,
        }
    }
}

impl<F: PrimeField> TestEngine<F> {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<F: PrimeField> Ring for TestEngine<F> {
    type Base = F;
    type Elem = F;

    #[inline]
    fn constant(&mut self, value: F) -> F {
        value
    }

    #[inline]
    fn add(&mut self, a: &F, b: &F) -> F {
        *a + b
    }

    #[inline]
    fn sub(&mut self, a: &F, b: &F) -> F {
        *a - b
    }

    #[inline]
    fn mul(&mut self, a: &F, b: &F) -> F {
        *a * b
    }

    #[inline]
    fn neg(&mut self, a: &F) -> F {
        -*a
    }

    #[inline]
    fn assert_eq(&mut self, a: &F, b: &F) -> Result<(), RingError> {
        if a == b {
            Ok(())
        } else {
            Err(RingError::Unsatisfied)
        }
    }
}

impl<F: PrimeField> OuterApi for TestEngine<F> {
    fn new_hint(
        &mut self,
        hint: Arc<dyn Hint<F>>,
        nb_outputs: usize,
        inputs: &[F],
    ) -> Result<Vec<F>, HintError> {
        // no witness phase here: run immediately on the concrete values
        hint.run(inputs, nb_outputs)
    }

    fn commit(&mut self, elems: &[F]) -> Result<F, CommitError> {
        let mut ring = NativeRing::<F>::new();
        let mut sponge = MimcSponge::new(&mut ring);
        sponge.update(&mut ring, elems);
        Ok(sponge.squeeze(&mut ring))
    }

    fn attach_gkr_circuit(&mut self, descriptor: &CircuitDescriptor) {
        self.attached.push(descriptor.clone());
    }
}
