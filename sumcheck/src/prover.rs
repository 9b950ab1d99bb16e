use arith::NativeRing;
use ark_ff::PrimeField;
use transcript::Transcript;

/// Output of one wire's sumcheck: the per-round partial-sum polynomials
/// (evaluations at 1..=D), the challenge point the claim was reduced to, and
/// the folded-down value of every input table at that point.
#[derive(Debug, Clone)]
pub struct SumcheckRounds<F: PrimeField> {
    pub round_polys: Vec<Vec<F>>,
    pub point: Vec<F>,
    pub input_finals: Vec<F>,
}

/// Restrict the first variable of a hypercube table to `r`.
#[inline]
pub fn fold_in_place<F: PrimeField>(table: &mut Vec<F>, r: F) {
    let half = table.len() / 2;
    for i in 0..half {
        let lo = table[2 * i];
        let hi = table[2 * i + 1];
        table[i] = lo + r * (hi - lo);
    }
    table.truncate(half);
}

/// Run the sumcheck for the claim
/// `sum_x eq_table(x) * gate(inputs_0(x), ..., inputs_{m-1}(x))`,
/// one round per instance variable, where `gate` has total degree
/// `gate_degree`. Each round sends the partial-sum polynomial as its values
/// at 1..=D with D = gate_degree + 1; the verifier reconstructs the value at
/// 0 from the running claim.
pub fn prove_rounds<F, E>(
    gate_degree: usize,
    gate: E,
    mut eq_table: Vec<F>,
    mut input_tables: Vec<Vec<F>>,
    transcript: &mut Transcript<'_, NativeRing<F>>,
) -> SumcheckRounds<F>
where
    F: PrimeField,
    E: Fn(&mut NativeRing<F>, &[F]) -> F,
{
    debug_assert!(eq_table.len().is_power_of_two());
    debug_assert!(input_tables.iter().all(|t| t.len() == eq_table.len()));

    let mut ring = NativeRing::<F>::new();
    let nb_vars = eq_table.len().trailing_zeros() as usize;
    let degree = gate_degree + 1;
    let arity = input_tables.len();

    let mut round_polys = Vec::with_capacity(nb_vars);
    let mut point = Vec::with_capacity(nb_vars);
    let mut xs = vec![F::zero(); arity];
    let mut deltas = vec![F::zero(); arity];

    for _ in 0..nb_vars {
        let half = eq_table.len() / 2;
        // evals[t] = g(t + 1)
        let mut evals = vec![F::zero(); degree];

        for p in 0..half {
            let eq_lo = eq_table[2 * p];
            let eq_hi = eq_table[2 * p + 1];
            let eq_delta = eq_hi - eq_lo;
            for (j, table) in input_tables.iter().enumerate() {
                xs[j] = table[2 * p + 1];
                deltas[j] = table[2 * p + 1] - table[2 * p];
            }

            // X = 1 uses the high halves directly; larger X extrapolates
            // linearly, one delta step at a time.
            let mut eq_x = eq_hi;
            evals[0] += eq_x * gate(&mut ring, &xs);
            for eval in evals.iter_mut().skip(1) {
                eq_x += eq_delta;
                for (x, delta) in xs.iter_mut().zip(deltas.iter()) {
                    *x += delta;
                }
                *eval += eq_x * gate(&mut ring, &xs);
            }
        }

        for eval in evals.iter() {
            transcript.append_element(eval);
        }
        let r = transcript.challenge(&mut ring);
        point.push(r);

        fold_in_place(&mut eq_table, r);
        for table in input_tables.iter_mut() {
            fold_in_place(table, r);
        }
        round_polys.push(evals);
    }

    SumcheckRounds {
        round_polys,
        point,
        input_finals: input_tables.into_iter().map(|t| t[0]).collect(),
    }
}
