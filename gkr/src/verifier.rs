use arith::{eq_eval_ring, eval_multilinear, Ring};
use circuit::{Circuit, GateRegistry};
use sumcheck::verify_rounds;
use transcript::Transcript;

use crate::{ClaimsManager, Proof, VerifyError};

/// Replay the GKR argument over an arbitrary ring.
///
/// `columns` holds the per-instance values of every wire materialized in the
/// outer circuit (all input wires and all output wires), in canonical order;
/// internal wires are `None`. Run with [`arith::NativeRing`] this checks a
/// proof natively; run with an outer builder's ring it emits the in-circuit
/// verifier, whose assertions make the outer proof unsatisfiable when the
/// GKR transcript is inconsistent.
pub fn verify<R: Ring>(
    ring: &mut R,
    circuit: &Circuit,
    registry: &GateRegistry<R>,
    columns: &[Option<Vec<R::Elem>>],
    proof: &Proof<R::Elem>,
    transcript: &mut Transcript<'_, R>,
) -> Result<(), VerifyError> {
    let resolved = circuit.resolve(registry)?;
    let counts = circuit.unique_consumer_counts();
    if columns.len() != circuit.nb_wires() || proof.wires.len() != circuit.nb_wires() {
        return Err(VerifyError::InvalidProof);
    }

    let nb_instances = columns
        .iter()
        .flatten()
        .map(Vec::len)
        .next()
        .ok_or(VerifyError::InvalidProof)?;
    if !nb_instances.is_power_of_two() {
        return Err(VerifyError::InvalidProof);
    }
    let nb_vars = nb_instances.trailing_zeros() as usize;

    let mut claims = ClaimsManager::<R::Elem>::new(circuit.nb_wires());

    // the verifier evaluates every output wire itself at one shared point
    let r = transcript.challenge_vector(ring, nb_vars);
    for w in 0..circuit.nb_wires() {
        if counts[w] == 0 {
            let col = column(columns, w, nb_instances)?;
            let value = eval_multilinear(ring, col, &r);
            claims.add(w, r.clone(), value);
        }
    }

    for w in (0..circuit.nb_wires()).rev() {
        let wire_claims = claims.take(w);
        let is_input = circuit.wire(w).is_input();

        if is_input && wire_claims.len() <= 1 {
            if let Some(claim) = wire_claims.first() {
                let col = column(columns, w, nb_instances)?;
                let value = eval_multilinear(ring, col, &claim.point);
                ring.assert_eq(&value, &claim.value)?;
            }
            continue;
        }

        let wire_proof = &proof.wires[w];
        let round_degree = match &resolved[w] {
            None => 2,
            Some(gate) => gate.degree() + 1,
        };
        if wire_proof.round_polys.len() != nb_vars
            || wire_proof.round_polys.iter().any(|p| p.len() != round_degree)
        {
            return Err(VerifyError::InvalidProof);
        }

        // batching challenge first, then the combined claim, mirroring the
        // prover's transcript exactly
        let scales = if wire_claims.len() == 1 {
            vec![ring.one()]
        } else {
            let a = transcript.challenge(ring);
            let mut scales = Vec::with_capacity(wire_claims.len());
            let mut scale = ring.one();
            for _ in 0..wire_claims.len() {
                scales.push(scale.clone());
                scale = ring.mul(&scale, &a);
            }
            scales
        };
        let mut combined = ring.zero();
        for (claim, scale) in wire_claims.iter().zip(scales.iter()) {
            combined = ring.mul_add(&claim.value, scale, &combined);
        }

        let (rho, final_claim) = verify_rounds(
            ring,
            combined,
            round_degree,
            &wire_proof.round_polys,
            transcript,
        );

        // eqC(rho) = sum_k a^k eq(r_k, rho)
        let mut eq_combined = ring.zero();
        for (claim, scale) in wire_claims.iter().zip(scales.iter()) {
            let eq = eq_eval_ring(ring, &claim.point, &rho);
            let scaled = ring.mul(&eq, scale);
            eq_combined = ring.add(&eq_combined, &scaled);
        }

        let opened = match &resolved[w] {
            None => {
                // batched input wire: the verifier owns the column
                if !wire_proof.final_evals.is_empty() {
                    return Err(VerifyError::InvalidProof);
                }
                let col = column(columns, w, nb_instances)?;
                eval_multilinear(ring, col, &rho)
            }
            Some(gate) => {
                let unique = circuit.unique_inputs(w);
                if wire_proof.final_evals.len() != unique.len() {
                    return Err(VerifyError::InvalidProof);
                }
                for value in wire_proof.final_evals.iter() {
                    transcript.append_element(value);
                }
                let inputs: Vec<R::Elem> = circuit
                    .wire(w)
                    .inputs
                    .iter()
                    .map(|input| {
                        let at = unique
                            .iter()
                            .position(|u| u == input)
                            .expect("every input appears among the unique inputs");
                        wire_proof.final_evals[at].clone()
                    })
                    .collect();
                for (u, value) in unique.iter().zip(wire_proof.final_evals.iter()) {
                    claims.add(*u, rho.clone(), value.clone());
                }
                gate.evaluate(ring, &inputs)
            }
        };

        let expected = ring.mul(&eq_combined, &opened);
        ring.assert_eq(&final_claim, &expected)?;
    }

    Ok(())
}

fn column<'a, T>(
    columns: &'a [Option<Vec<T>>],
    w: usize,
    nb_instances: usize,
) -> Result<&'a Vec<T>, VerifyError> {
    let col = columns[w].as_ref().ok_or(VerifyError::MissingColumn(w))?;
    if col.len() != nb_instances {
        return Err(VerifyError::InvalidProof);
    }
    Ok(col)
}
