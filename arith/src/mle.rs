use ark_ff::PrimeField;

use crate::Ring;

/// Multilinear polynomial in hypercube-basis form: `evals[i]` is the value at
/// the boolean point whose bit `j` is `(i >> j) & 1`. Variable 0 is the least
/// significant index bit; evaluation points follow the same order.
#[derive(Debug, Clone, Default)]
pub struct MultiLinearPoly<F: PrimeField> {
    pub evals: Vec<F>,
}

impl<F: PrimeField> MultiLinearPoly<F> {
    #[inline]
    pub fn new(evals: Vec<F>) -> Self {
        assert!(evals.len().is_power_of_two());
        Self { evals }
    }

    #[inline]
    pub fn num_vars(&self) -> usize {
        self.evals.len().trailing_zeros() as usize
    }

    /// Restrict the first variable to `r`, halving the table.
    #[inline]
    pub fn fix_first_variable(&mut self, r: F) {
        let half = self.evals.len() / 2;
        for i in 0..half {
            let lo = self.evals[2 * i];
            let hi = self.evals[2 * i + 1];
            self.evals[i] = lo + r * (hi - lo);
        }
        self.evals.truncate(half);
    }

    /// Evaluate without allocating; `scratch` must hold at least
    /// `evals.len() / 2` elements.
    pub fn evaluate_with_buffer(evals: &[F], point: &[F], scratch: &mut [F]) -> F {
        assert_eq!(1 << point.len(), evals.len());

        if point.is_empty() {
            return evals[0];
        }

        let mut size = evals.len() >> 1;
        for i in 0..size {
            scratch[i] = evals[2 * i] + (evals[2 * i + 1] - evals[2 * i]) * point[0];
        }
        for r in point.iter().skip(1) {
            size >>= 1;
            for i in 0..size {
                scratch[i] = scratch[2 * i] + (scratch[2 * i + 1] - scratch[2 * i]) * r;
            }
        }
        scratch[0]
    }

    #[inline]
    pub fn evaluate(&self, point: &[F]) -> F {
        let mut scratch = vec![F::zero(); (self.evals.len() / 2).max(1)];
        Self::evaluate_with_buffer(&self.evals, point, &mut scratch)
    }
}

/// Ring-generic multilinear evaluation, used by the verifier to open input
/// and output wires in-circuit. Same fold as `evaluate_with_buffer`.
pub fn eval_multilinear<R: Ring>(
    ring: &mut R,
    evals: &[R::Elem],
    point: &[R::Elem],
) -> R::Elem {
    assert_eq!(1 << point.len(), evals.len());

    if point.is_empty() {
        return evals[0].clone();
    }

    let mut table: Vec<R::Elem> = Vec::with_capacity(evals.len() / 2);
    for i in 0..evals.len() / 2 {
        let delta = ring.sub(&evals[2 * i + 1], &evals[2 * i]);
        table.push(ring.mul_add(&delta, &point[0], &evals[2 * i]));
    }
    for r in point.iter().skip(1) {
        let half = table.len() / 2;
        for i in 0..half {
            let delta = ring.sub(&table[2 * i + 1], &table[2 * i]);
            table[i] = ring.mul_add(&delta, r, &table[2 * i]);
        }
        table.truncate(half);
    }
    table[0].clone()
}

#[cfg(test)]
mod tests {
    use ark_bn254::Fr;
    use ark_ff::UniformRand;
    use ark_std::test_rng;

    use super::*;
    use crate::{eq_evals_scaled, NativeRing};

    #[test]
    fn evaluate_matches_eq_table_inner_product() {
        let mut rng = test_rng();
        for nv in 0..5 {
            let poly =
                MultiLinearPoly::new((0..1 << nv).map(|_| Fr::rand(&mut rng)).collect());
            let point: Vec<Fr> = (0..nv).map(|_| Fr::rand(&mut rng)).collect();

            let table = eq_evals_scaled(&point, Fr::from(1u64));
            let expected: Fr = poly
                .evals
                .iter()
                .zip(table.iter())
                .map(|(a, b)| *a * b)
                .sum();

            assert_eq!(poly.evaluate(&point), expected);

            let mut ring = NativeRing::<Fr>::new();
            assert_eq!(eval_multilinear(&mut ring, &poly.evals, &point), expected);
        }
    }

    #[test]
    fn fix_first_variable_is_partial_evaluation() {
        let mut rng = test_rng();
        let mut poly =
            MultiLinearPoly::new((0..8).map(|_| Fr::rand(&mut rng)).collect::<Vec<_>>());
        let point: Vec<Fr> = (0..3).map(|_| Fr::rand(&mut rng)).collect();
        let full = poly.evaluate(&point);

        poly.fix_first_variable(point[0]);
        assert_eq!(poly.evaluate(&point[1..]), full);
    }
}
