//! Embedded GKR: delegate batched gate evaluations from an outer SNARK
//! circuit to a sumcheck-based argument, verified in-circuit at
//! near-constant cost per gate.

mod errors;
pub use errors::*;

mod claims;
pub use claims::*;

mod proof;
pub use proof::*;

mod prover;
pub use prover::*;

mod verifier;
pub use verifier::*;

mod descriptor;
pub use descriptor::*;

mod frontend;
pub use frontend::*;

mod hints;
pub use hints::*;

mod bridge;
pub use bridge::*;

mod test_engine;
pub use test_engine::*;

#[cfg(test)]
mod tests;
