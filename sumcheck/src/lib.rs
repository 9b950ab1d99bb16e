mod prover;
pub use prover::*;

mod verifier;
pub use verifier::*;

#[cfg(test)]
mod tests;
