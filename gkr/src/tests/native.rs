use arith::NativeRing;
use ark_bn254::Fr;
use ark_ff::UniformRand;
use circuit::{solve, Circuit, GateRegistry, WireAssignment};
use rand::SeedableRng;
use rand_chacha::ChaCha12Rng;
use transcript::{HashRegistry, Transcript};

use crate::{prove, verify, Proof, ProofShape, VerifyError};

const TEST_SEED: u64 = 0x5eed;

type Native = NativeRing<Fr>;

fn registries() -> (GateRegistry<Native>, HashRegistry<Native>) {
    (GateRegistry::with_defaults(), HashRegistry::with_defaults())
}

fn materialize(circuit: &Circuit, assignment: &WireAssignment<Fr>) -> Vec<Option<Vec<Fr>>> {
    let counts = circuit.unique_consumer_counts();
    (0..circuit.nb_wires())
        .map(|w| {
            if circuit.wire(w).is_input() || counts[w] == 0 {
                Some(assignment.wire(w).to_vec())
            } else {
                None
            }
        })
        .collect()
}

fn prove_and_verify(
    circuit: &Circuit,
    nb_instances: usize,
    inputs: &[Vec<Fr>],
) -> (Proof<Fr>, Vec<Option<Vec<Fr>>>) {
    env_logger::builder().is_test(true).try_init().ok();
    let (gates, hashes) = registries();
    let mut ring = Native::new();
    let seed = [Fr::from(7u64)];

    let assignment = solve(circuit, &gates, nb_instances, inputs, &[]).unwrap();
    let mut prover_transcript = Transcript::new(&mut ring, &hashes, "mimc", &seed).unwrap();
    let proof = prove(circuit, &gates, &assignment, &mut prover_transcript).unwrap();

    let columns = materialize(circuit, &assignment);
    let mut verifier_transcript = Transcript::new(&mut ring, &hashes, "mimc", &seed).unwrap();
    verify(
        &mut ring,
        circuit,
        &gates,
        &columns,
        &proof,
        &mut verifier_transcript,
    )
    .unwrap();

    (proof, columns)
}

fn expect_invalid(
    circuit: &Circuit,
    columns: &[Option<Vec<Fr>>],
    proof: &Proof<Fr>,
) -> VerifyError {
    let (gates, hashes) = registries();
    let mut ring = Native::new();
    let seed = [Fr::from(7u64)];
    let mut transcript = Transcript::new(&mut ring, &hashes, "mimc", &seed).unwrap();
    verify(&mut ring, circuit, &gates, columns, proof, &mut transcript).unwrap_err()
}

fn random_column(n: usize, rng: &mut ChaCha12Rng) -> Vec<Fr> {
    (0..n).map(|_| Fr::rand(rng)).collect()
}

#[test]
fn single_mul_layer_proves_and_verifies() {
    let mut circuit = Circuit::new();
    let x = circuit.add_input();
    let y = circuit.add_input();
    circuit.add_gate("mul", &[x, y]).unwrap();

    for nb_instances in [1usize, 2, 8] {
        let mut rng = ChaCha12Rng::seed_from_u64(TEST_SEED);
        let inputs = vec![
            random_column(nb_instances, &mut rng),
            random_column(nb_instances, &mut rng),
        ];
        prove_and_verify(&circuit, nb_instances, &inputs);
    }
}

/// Two consumers of the same internal wire and of the same input wire, so
/// both the gate-wire and the input-wire claim-batching paths run.
fn diamond_circuit() -> Circuit {
    let mut circuit = Circuit::new();
    let x = circuit.add_input();
    let y = circuit.add_input();
    let a = circuit.add_gate("square", &[x]).unwrap();
    circuit.add_gate("mul", &[a, y]).unwrap();
    circuit.add_gate("add", &[a, y]).unwrap();
    circuit
}

#[test]
fn shared_wires_batch_their_claims() {
    let circuit = diamond_circuit();
    let mut rng = ChaCha12Rng::seed_from_u64(TEST_SEED);
    let inputs = vec![random_column(4, &mut rng), random_column(4, &mut rng)];
    prove_and_verify(&circuit, 4, &inputs);
}

#[test]
fn repeated_gate_input_is_opened_once() {
    let mut circuit = Circuit::new();
    let x = circuit.add_input();
    let w = circuit.add_gate("mul", &[x, x]).unwrap();

    let (gates, _) = registries();
    let shape = ProofShape::of(&circuit, &gates, 4).unwrap();
    assert_eq!(shape.wires[w].nb_final_evals, 1);

    let mut rng = ChaCha12Rng::seed_from_u64(TEST_SEED);
    let inputs = vec![random_column(4, &mut rng)];
    prove_and_verify(&circuit, 4, &inputs);
}

#[test]
fn deep_chain_propagates_claims() {
    let mut circuit = Circuit::new();
    let x = circuit.add_input();
    let y = circuit.add_input();
    let mut acc = circuit.add_gate("mul", &[x, y]).unwrap();
    for _ in 0..3 {
        let sq = circuit.add_gate("square", &[acc]).unwrap();
        acc = circuit.add_gate("add", &[sq, x]).unwrap();
    }

    let mut rng = ChaCha12Rng::seed_from_u64(TEST_SEED);
    let inputs = vec![random_column(8, &mut rng), random_column(8, &mut rng)];
    prove_and_verify(&circuit, 8, &inputs);
}

#[test]
fn proof_flattening_round_trips() {
    let circuit = diamond_circuit();
    let mut rng = ChaCha12Rng::seed_from_u64(TEST_SEED);
    let inputs = vec![random_column(4, &mut rng), random_column(4, &mut rng)];
    let (proof, _) = prove_and_verify(&circuit, 4, &inputs);

    let (gates, _) = registries();
    let shape = ProofShape::of(&circuit, &gates, 4).unwrap();
    let elems = proof.serialize();
    assert_eq!(elems.len(), shape.nb_elems());

    let back = Proof::deserialize(&shape, &elems).unwrap();
    assert!(back.matches(&shape));
    assert_eq!(back.serialize(), elems);

    assert!(matches!(
        Proof::<Fr>::deserialize(&shape, &elems[..elems.len() - 1]),
        Err(VerifyError::InvalidProof)
    ));
}

#[test]
fn every_tampered_proof_element_is_caught() {
    let circuit = diamond_circuit();
    let mut rng = ChaCha12Rng::seed_from_u64(TEST_SEED);
    let inputs = vec![random_column(4, &mut rng), random_column(4, &mut rng)];
    let (proof, columns) = prove_and_verify(&circuit, 4, &inputs);

    let (gates, _) = registries();
    let shape = ProofShape::of(&circuit, &gates, 4).unwrap();
    let elems = proof.serialize();

    for at in 0..elems.len() {
        let mut tampered = elems.clone();
        tampered[at] += Fr::from(1u64);
        let bad = Proof::deserialize(&shape, &tampered).unwrap();
        let err = expect_invalid(&circuit, &columns, &bad);
        assert!(
            matches!(err, VerifyError::InvalidProof),
            "element {at} slipped through"
        );
    }
}

#[test]
fn tampered_output_column_is_caught() {
    let circuit = diamond_circuit();
    let mut rng = ChaCha12Rng::seed_from_u64(TEST_SEED);
    let inputs = vec![random_column(4, &mut rng), random_column(4, &mut rng)];
    let (proof, mut columns) = prove_and_verify(&circuit, 4, &inputs);

    // wire 3 is the mul output; shift one of its exported values
    if let Some(col) = columns[3].as_mut() {
        col[2] += Fr::from(1u64);
    }
    let err = expect_invalid(&circuit, &columns, &proof);
    assert!(matches!(err, VerifyError::InvalidProof));
}

#[test]
fn soundness_margin_is_negligible() {
    // worst case across the test circuits: every proving wire runs one
    // sumcheck round per instance variable with degree <= 3 polynomials
    let circuit = diamond_circuit();
    let (gates, _) = registries();
    let shape = ProofShape::of(&circuit, &gates, 1 << 20).unwrap();

    let total_degree: usize = shape
        .wires
        .iter()
        .map(|w| w.nb_rounds * w.round_degree)
        .sum();
    // soundness error ~ total_degree / |F|; BN254's field has ~254 bits
    let error_bits = (total_degree as f64).log2();
    assert!(254.0 - error_bits > 200.0);
}
