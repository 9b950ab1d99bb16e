use ark_ff::PrimeField;

use crate::Ring;

/// Inverse barycentric weights `1 / prod_{k != j} (j - k)` for the
/// interpolation nodes 0..=d.
pub fn lagrange_inv_weights<F: PrimeField>(d: usize) -> Vec<F> {
    (0..=d)
        .map(|j| {
            let mut w = F::one();
            for k in 0..=d {
                if k != j {
                    w *= F::from(j as u64) - F::from(k as u64);
                }
            }
            // the nodes are distinct, so w is a product of nonzero factors
            w.inverse().unwrap()
        })
        .collect()
}

/// Evaluate the degree-d polynomial given by its values on the nodes 0..=d at
/// an arbitrary ring element, without ring division: prefix/suffix products
/// of (x - k) and natively precomputed inverse weights.
pub fn lagrange_eval<R: Ring>(
    ring: &mut R,
    evals: &[R::Elem],
    inv_weights: &[R::Base],
    x: &R::Elem,
) -> R::Elem {
    let n = evals.len();
    debug_assert_eq!(inv_weights.len(), n);

    let terms: Vec<R::Elem> = (0..n)
        .map(|k| {
            let node = ring.constant(R::Base::from(k as u64));
            ring.sub(x, &node)
        })
        .collect();

    // prefix[j] = prod_{k < j} (x - k), suffix[j] = prod_{k > j} (x - k)
    let mut prefix = Vec::with_capacity(n + 1);
    let mut running = ring.one();
    prefix.push(running.clone());
    for t in terms.iter() {
        running = ring.mul(&running, t);
        prefix.push(running.clone());
    }
    let mut suffix = vec![ring.one(); n + 1];
    for j in (0..n).rev() {
        suffix[j] = ring.mul(&suffix[j + 1], &terms[j]);
    }

    let mut acc = ring.zero();
    for j in 0..n {
        let basis = ring.mul(&prefix[j], &suffix[j + 1]);
        let w = ring.constant(inv_weights[j]);
        let scaled = ring.mul(&basis, &w);
        acc = ring.mul_add(&scaled, &evals[j], &acc);
    }
    acc
}

#[cfg(test)]
mod tests {
    use ark_bn254::Fr;
    use ark_ff::UniformRand;
    use ark_std::test_rng;

    use super::*;
    use crate::NativeRing;

    #[test]
    fn interpolation_recovers_polynomial_values() {
        let mut rng = test_rng();
        // p(t) = 3 t^2 + 2 t + 7
        let p = |t: Fr| Fr::from(3u64) * t * t + Fr::from(2u64) * t + Fr::from(7u64);
        let evals: Vec<Fr> = (0..=2u64).map(|t| p(Fr::from(t))).collect();
        let inv_weights = lagrange_inv_weights::<Fr>(2);

        let mut ring = NativeRing::<Fr>::new();
        for _ in 0..8 {
            let x = Fr::rand(&mut rng);
            assert_eq!(lagrange_eval(&mut ring, &evals, &inv_weights, &x), p(x));
        }
        // landing exactly on a node must also work
        let node = Fr::from(1u64);
        assert_eq!(
            lagrange_eval(&mut ring, &evals, &inv_weights, &node),
            p(node)
        );
    }
}
