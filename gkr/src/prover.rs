use std::time::Instant;

use arith::{eq_evals_scaled, MultiLinearPoly, NativeRing};
use ark_ff::PrimeField;
use circuit::{Circuit, GateRegistry, WireAssignment};
use log::{debug, trace};
use sumcheck::prove_rounds;
use transcript::Transcript;

use crate::{Claim, ClaimsManager, Proof, ProverError, WireProof};

/// Produce the GKR proof for a solved, canonical circuit.
///
/// The transcript must already be seeded exactly as the verifier will seed
/// its own; every challenge drawn here is re-derived by the verifier from
/// the same prover messages.
pub fn prove<F: PrimeField>(
    circuit: &Circuit,
    registry: &GateRegistry<NativeRing<F>>,
    assignment: &WireAssignment<F>,
    transcript: &mut Transcript<'_, NativeRing<F>>,
) -> Result<Proof<F>, ProverError> {
    let started = Instant::now();
    let mut ring = NativeRing::<F>::new();
    let resolved = circuit.resolve(registry)?;
    let counts = circuit.unique_consumer_counts();
    let nb_instances = assignment.nb_instances;
    let nb_vars = nb_instances.trailing_zeros() as usize;

    let mut claims = ClaimsManager::<F>::new(circuit.nb_wires());
    let mut proof = Proof::empty(circuit.nb_wires());

    // one shared evaluation point seeds the claims on every output wire
    let r = transcript.challenge_vector(&mut ring, nb_vars);
    let mut scratch = vec![F::zero(); (nb_instances / 2).max(1)];
    for w in 0..circuit.nb_wires() {
        if counts[w] == 0 {
            let value =
                MultiLinearPoly::evaluate_with_buffer(assignment.wire(w), &r, &mut scratch);
            claims.add(w, r.clone(), value);
        }
    }

    for w in (0..circuit.nb_wires()).rev() {
        let wire_claims = claims.take(w);
        let is_input = circuit.wire(w).is_input();
        if is_input && wire_claims.len() <= 1 {
            // a lone claim on an input wire is opened directly by the verifier
            continue;
        }

        trace!("reducing wire {w} ({} claims)", wire_claims.len());
        let eq_table = combine_claims(&mut ring, &wire_claims, nb_instances, transcript);

        let rounds = match &resolved[w] {
            None => prove_rounds(
                1,
                |_: &mut NativeRing<F>, xs: &[F]| xs[0],
                eq_table,
                vec![assignment.wire(w).to_vec()],
                transcript,
            ),
            Some(gate) => {
                let tables = circuit
                    .wire(w)
                    .inputs
                    .iter()
                    .map(|&input| assignment.wire(input).to_vec())
                    .collect();
                prove_rounds(
                    gate.degree(),
                    |ring: &mut NativeRing<F>, xs: &[F]| gate.evaluate(ring, xs),
                    eq_table,
                    tables,
                    transcript,
                )
            }
        };

        let mut final_evals = Vec::new();
        if resolved[w].is_some() {
            // open each distinct input once, in first-occurrence order
            for unique in circuit.unique_inputs(w) {
                let position = circuit
                    .wire(w)
                    .inputs
                    .iter()
                    .position(|&input| input == unique)
                    .expect("unique inputs come from the input list");
                let value = rounds.input_finals[position];
                transcript.append_element(&value);
                claims.add(unique, rounds.point.clone(), value);
                final_evals.push(value);
            }
        }

        proof.wires[w] = WireProof {
            round_polys: rounds.round_polys,
            final_evals,
        };
    }

    debug!(
        "proved {} wires x {} instances in {:?}",
        circuit.nb_wires(),
        nb_instances,
        started.elapsed()
    );
    Ok(proof)
}

/// Batch a wire's claims into a single scaled eq table. With one claim the
/// table is just eq(r, .); with several, a transcript challenge provides the
/// random-linear-combination weights 1, a, a^2, ...
fn combine_claims<F: PrimeField>(
    ring: &mut NativeRing<F>,
    wire_claims: &[Claim<F>],
    nb_instances: usize,
    transcript: &mut Transcript<'_, NativeRing<F>>,
) -> Vec<F> {
    if wire_claims.len() == 1 {
        return eq_evals_scaled(&wire_claims[0].point, F::one());
    }

    let a = transcript.challenge(ring);
    let mut table = vec![F::zero(); nb_instances];
    let mut scale = F::one();
    for claim in wire_claims {
        let scaled = eq_evals_scaled(&claim.point, scale);
        for (acc, v) in table.iter_mut().zip(scaled.iter()) {
            *acc += v;
        }
        scale *= a;
    }
    table
}
