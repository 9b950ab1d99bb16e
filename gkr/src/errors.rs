use arith::RingError;
use circuit::{CircuitError, GateError, SolverError, WireId};
use thiserror::Error;
use transcript::HashError;

#[derive(Debug, Error)]
pub enum ProverError {
    #[error(transparent)]
    Circuit(#[from] CircuitError),
}

#[derive(Debug, Error)]
pub enum VerifyError {
    /// A protocol-level inconsistency. Deliberately unexplained: a verifier
    /// that describes why a proof failed leaks information.
    #[error("proof verification failed")]
    InvalidProof,

    #[error(transparent)]
    Circuit(#[from] CircuitError),

    #[error("wire {0} has no materialized values in the outer circuit")]
    MissingColumn(WireId),
}

impl From<RingError> for VerifyError {
    fn from(_: RingError) -> Self {
        VerifyError::InvalidProof
    }
}

#[derive(Debug, Error)]
pub enum HintError {
    #[error("hint failed: {0}")]
    Failed(String),
}

#[derive(Debug, Error)]
pub enum CommitError {
    #[error("the outer builder does not support commitments")]
    Unsupported,
}

#[derive(Debug, Error)]
pub enum BridgeError {
    #[error(transparent)]
    Circuit(#[from] CircuitError),

    #[error(transparent)]
    Gate(#[from] GateError),

    #[error(transparent)]
    Hash(#[from] HashError),

    #[error(transparent)]
    Solver(#[from] SolverError),

    #[error(transparent)]
    Verify(#[from] VerifyError),

    #[error(transparent)]
    Hint(#[from] HintError),

    #[error("imported {got} values but the instance count is {expected}")]
    InstanceCountMismatch { expected: usize, got: usize },

    #[error("cannot import before any instance count is known")]
    NothingImported,

    #[error("wire {wire} at instance {instance} was already explicitly supplied")]
    SlotExplicitlyAssigned { wire: WireId, instance: usize },

    #[error("wire {wire} at instance {instance} has no explicit value and no dependency")]
    UnassignedInputSlot { wire: WireId, instance: usize },

    #[error("dependency source wire {wire} is internal: only input and output wires are materialized")]
    DependencySourceNotMaterialized { wire: WireId },

    #[error("wire {wire} is internal and cannot be exported")]
    ExportInternalWire { wire: WireId },

    #[error("verification needs a commitment-capable builder or explicit initial challenges")]
    MissingFiatShamirSeed,
}
