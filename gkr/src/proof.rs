use arith::Ring;
use circuit::{Circuit, CircuitError, GateRegistry};

use crate::VerifyError;

/// One wire's share of the proof: the sumcheck round polynomials (values at
/// 1..=D each) and, for gate wires, the claimed evaluations of the distinct
/// input wires at the final point. Wires closed without a sumcheck have an
/// empty entry.
#[derive(Debug, Clone)]
pub struct WireProof<T> {
    pub round_polys: Vec<Vec<T>>,
    pub final_evals: Vec<T>,
}

impl<T> Default for WireProof<T> {
    fn default() -> Self {
        Self {
            round_polys: Vec::new(),
            final_evals: Vec::new(),
        }
    }
}

/// A GKR proof, indexed by canonical wire id.
#[derive(Debug, Clone)]
pub struct Proof<T> {
    pub wires: Vec<WireProof<T>>,
}

/// Statically-known layout of one wire's transcript share. Everything here
/// follows from the circuit and the registered gate degrees, so the prover
/// and the verifier always agree on where each element lives in the
/// flattened proof.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WireShape {
    pub nb_rounds: usize,
    /// Number of evaluations sent per round (= gate degree + 1).
    pub round_degree: usize,
    pub nb_final_evals: usize,
}

impl WireShape {
    const EMPTY: WireShape = WireShape {
        nb_rounds: 0,
        round_degree: 0,
        nb_final_evals: 0,
    };

    #[inline]
    fn nb_elems(&self) -> usize {
        self.nb_rounds * self.round_degree + self.nb_final_evals
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProofShape {
    pub wires: Vec<WireShape>,
}

impl ProofShape {
    /// Derive the proof layout: a wire receives one claim per distinct
    /// consumer, plus one when it is an output. Input wires with a single
    /// claim are opened directly by the verifier and contribute nothing.
    pub fn of<R: Ring>(
        circuit: &Circuit,
        registry: &GateRegistry<R>,
        nb_instances: usize,
    ) -> Result<Self, CircuitError> {
        let resolved = circuit.resolve(registry)?;
        let counts = circuit.unique_consumer_counts();
        let nb_rounds = nb_instances.trailing_zeros() as usize;

        let wires = (0..circuit.nb_wires())
            .map(|w| {
                let nb_claims = counts[w] + usize::from(counts[w] == 0);
                match &resolved[w] {
                    None if nb_claims <= 1 => WireShape::EMPTY,
                    // input wire with several claims: batched by a
                    // degree-2 identity sumcheck, opened by the verifier
                    None => WireShape {
                        nb_rounds,
                        round_degree: 2,
                        nb_final_evals: 0,
                    },
                    Some(gate) => WireShape {
                        nb_rounds,
                        round_degree: gate.degree() + 1,
                        nb_final_evals: circuit.unique_inputs(w).len(),
                    },
                }
            })
            .collect();
        Ok(Self { wires })
    }

    pub fn nb_elems(&self) -> usize {
        self.wires.iter().map(WireShape::nb_elems).sum()
    }
}

impl<T: Clone> Proof<T> {
    pub fn empty(nb_wires: usize) -> Self {
        Self {
            wires: (0..nb_wires).map(|_| WireProof::default()).collect(),
        }
    }

    /// Flatten in ascending canonical wire order: round polynomials first,
    /// final evaluations after. This is the hint-output format.
    pub fn serialize(&self) -> Vec<T> {
        let mut out = Vec::new();
        for wire in &self.wires {
            for round in &wire.round_polys {
                out.extend(round.iter().cloned());
            }
            out.extend(wire.final_evals.iter().cloned());
        }
        out
    }

    /// Rebuild a proof from its flattened form. Any size mismatch is a
    /// protocol failure.
    pub fn deserialize(shape: &ProofShape, elems: &[T]) -> Result<Self, VerifyError> {
        if elems.len() != shape.nb_elems() {
            return Err(VerifyError::InvalidProof);
        }
        let mut cursor = elems.iter();
        let wires = shape
            .wires
            .iter()
            .map(|ws| {
                let round_polys = (0..ws.nb_rounds)
                    .map(|_| {
                        cursor
                            .by_ref()
                            .take(ws.round_degree)
                            .cloned()
                            .collect::<Vec<_>>()
                    })
                    .collect();
                let final_evals = cursor.by_ref().take(ws.nb_final_evals).cloned().collect();
                WireProof {
                    round_polys,
                    final_evals,
                }
            })
            .collect();
        Ok(Self { wires })
    }

    /// Check the proof against the expected layout.
    pub fn matches(&self, shape: &ProofShape) -> bool {
        self.wires.len() == shape.wires.len()
            && self.wires.iter().zip(shape.wires.iter()).all(|(wp, ws)| {
                wp.round_polys.len() == ws.nb_rounds
                    && wp.round_polys.iter().all(|r| r.len() == ws.round_degree)
                    && wp.final_evals.len() == ws.nb_final_evals
            })
    }
}
