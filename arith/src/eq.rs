use ark_ff::PrimeField;

use crate::Ring;

/// Build the table `scale * eq(r, x)` for all x on the hypercube, in the same
/// variable order as [`crate::MultiLinearPoly`].
pub fn eq_evals_scaled<F: PrimeField>(r: &[F], scale: F) -> Vec<F> {
    let mut evals = vec![F::zero(); 1 << r.len()];
    evals[0] = scale;
    let mut size = 1;
    for r_i in r.iter() {
        for j in 0..size {
            let delta = evals[j] * r_i;
            evals[j + size] = delta;
            evals[j] -= delta;
        }
        size <<= 1;
    }
    evals
}

/// eq(x, y) over the base field.
#[inline]
pub fn eq_eval<F: PrimeField>(xs: &[F], ys: &[F]) -> F {
    debug_assert_eq!(xs.len(), ys.len());
    xs.iter()
        .zip(ys.iter())
        .map(|(x, y)| {
            // x * y + (1 - x) * (1 - y)
            let xy = *x * y;
            xy + xy - x - y + F::one()
        })
        .product()
}

/// Ring-generic eq(x, y), used by the verifier at the final sumcheck point.
pub fn eq_eval_ring<R: Ring>(ring: &mut R, xs: &[R::Elem], ys: &[R::Elem]) -> R::Elem {
    debug_assert_eq!(xs.len(), ys.len());
    let mut acc = ring.one();
    for (x, y) in xs.iter().zip(ys.iter()) {
        let xy = ring.mul(x, y);
        let two_xy = ring.add(&xy, &xy);
        let s = ring.add(x, y);
        let t = ring.sub(&two_xy, &s);
        let one = ring.one();
        let term = ring.add(&t, &one);
        acc = ring.mul(&acc, &term);
    }
    acc
}
