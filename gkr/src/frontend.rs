use std::sync::Arc;

use arith::Ring;
use ark_ff::PrimeField;

use crate::{CircuitDescriptor, CommitError, HintError};

/// An off-circuit computation the outer backend re-runs with concrete
/// witness values at proving time. Keyed by a stable string identity; the
/// outputs become ordinary outer-circuit variables with no constraints
/// attached, so the caller must constrain them.
pub trait Hint<F: PrimeField>: Send + Sync {
    fn id(&self) -> &str;
    fn run(&self, inputs: &[F], nb_outputs: usize) -> Result<Vec<F>, HintError>;
}

/// The capabilities the bridge consumes from the outer constraint builder,
/// on top of plain ring arithmetic over its variables.
pub trait OuterApi: Ring {
    /// Register a hint call; at witness time the backend invokes
    /// `hint.run` on the concrete values of `inputs`.
    fn new_hint(
        &mut self,
        hint: Arc<dyn Hint<Self::Base>>,
        nb_outputs: usize,
        inputs: &[Self::Elem],
    ) -> Result<Vec<Self::Elem>, HintError>;

    /// Commit to elements, returning a digest variable usable as a
    /// Fiat-Shamir seed that binds to them. Optional capability.
    fn commit(&mut self, elems: &[Self::Elem]) -> Result<Self::Elem, CommitError>;

    /// Record that a region of the witness is certified by this GKR
    /// circuit; the outer backend embeds the record in its keys.
    fn attach_gkr_circuit(&mut self, descriptor: &CircuitDescriptor);
}
