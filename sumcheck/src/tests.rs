use arith::{eq_eval, eq_evals_scaled, NativeRing, Ring as _};
use ark_bn254::Fr;
use ark_ff::UniformRand;
use ark_std::test_rng;
use transcript::{HashRegistry, Transcript};

use crate::{prove_rounds, verify_rounds};

type Native = NativeRing<Fr>;

fn mul_gate(ring: &mut Native, xs: &[Fr]) -> Fr {
    ring.mul(&xs[0], &xs[1])
}

fn random_table(n: usize, rng: &mut impl ark_std::rand::RngCore) -> Vec<Fr> {
    (0..n).map(|_| Fr::rand(rng)).collect()
}

#[test]
fn rounds_reduce_to_a_true_final_claim() {
    let mut rng = test_rng();
    let hashes = HashRegistry::<Native>::with_defaults();
    let mut ring = Native::new();

    for nb_vars in 0..4usize {
        let n = 1 << nb_vars;
        let a = random_table(n, &mut rng);
        let b = random_table(n, &mut rng);
        let r: Vec<Fr> = (0..nb_vars).map(|_| Fr::rand(&mut rng)).collect();
        let eq_table = eq_evals_scaled(&r, Fr::from(1u64));

        let claim: Fr = (0..n).map(|x| eq_table[x] * a[x] * b[x]).sum();

        let seed = [Fr::from(42u64)];
        let mut prover_transcript =
            Transcript::new(&mut ring, &hashes, "mimc", &seed).unwrap();
        let rounds = prove_rounds(
            2,
            mul_gate,
            eq_table.clone(),
            vec![a.clone(), b.clone()],
            &mut prover_transcript,
        );

        let mut verifier_transcript =
            Transcript::new(&mut ring, &hashes, "mimc", &seed).unwrap();
        let (point, final_claim) = verify_rounds(
            &mut ring,
            claim,
            3,
            &rounds.round_polys,
            &mut verifier_transcript,
        );

        assert_eq!(point, rounds.point);
        let expected = eq_eval(&r, &point) * rounds.input_finals[0] * rounds.input_finals[1];
        assert_eq!(final_claim, expected);
    }
}

#[test]
fn tampered_round_polynomial_breaks_the_final_check() {
    let mut rng = test_rng();
    let hashes = HashRegistry::<Native>::with_defaults();
    let mut ring = Native::new();

    let nb_vars = 3usize;
    let n = 1 << nb_vars;
    let a = random_table(n, &mut rng);
    let b = random_table(n, &mut rng);
    let r: Vec<Fr> = (0..nb_vars).map(|_| Fr::rand(&mut rng)).collect();
    let eq_table = eq_evals_scaled(&r, Fr::from(1u64));
    let claim: Fr = (0..n).map(|x| eq_table[x] * a[x] * b[x]).sum();

    let seed = [Fr::from(42u64)];
    let mut prover_transcript = Transcript::new(&mut ring, &hashes, "mimc", &seed).unwrap();
    let rounds = prove_rounds(2, mul_gate, eq_table, vec![a, b], &mut prover_transcript);

    let mut tampered = rounds.round_polys.clone();
    tampered[1][0] += Fr::from(1u64);

    let mut verifier_transcript = Transcript::new(&mut ring, &hashes, "mimc", &seed).unwrap();
    let (point, final_claim) = verify_rounds(
        &mut ring,
        claim,
        3,
        &tampered,
        &mut verifier_transcript,
    );

    // the honest tables folded along a different challenge path, so
    // re-deriving the expected value at the tampered point must disagree
    let expected = eq_eval(&r, &point) * rounds.input_finals[0] * rounds.input_finals[1];
    assert_ne!(final_claim, expected);
}
