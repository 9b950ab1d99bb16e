use arith::Ring;

use crate::{HashError, HashRegistry, RingSponge};

/// Fiat-Shamir transcript over ring elements.
///
/// Challenges chain the sponge state: each challenge hashes the previous
/// state together with everything appended since, so a challenge depends on
/// every prior prover message and two consecutive challenges with no
/// absorption in between still differ.
pub struct Transcript<'h, R: Ring> {
    registry: &'h HashRegistry<R>,
    hash_name: String,
    state: R::Elem,
    pending: Vec<R::Elem>,
}

impl<'h, R: Ring> Transcript<'h, R> {
    pub fn new(
        ring: &mut R,
        registry: &'h HashRegistry<R>,
        hash_name: &str,
        seed: &[R::Elem],
    ) -> Result<Self, HashError> {
        if !registry.contains(hash_name) {
            return Err(HashError::Unknown(hash_name.to_string()));
        }
        Ok(Self {
            registry,
            hash_name: hash_name.to_string(),
            state: ring.zero(),
            pending: seed.to_vec(),
        })
    }

    /// Append a prover message.
    #[inline]
    pub fn append_element(&mut self, elem: &R::Elem) {
        self.pending.push(elem.clone());
    }

    /// Derive the next verifier challenge.
    pub fn challenge(&mut self, ring: &mut R) -> R::Elem {
        let mut sponge: Box<dyn RingSponge<R>> = self
            .registry
            .sponge(&self.hash_name, ring)
            .expect("hash name was checked at construction");
        sponge.update(ring, std::slice::from_ref(&self.state));
        sponge.update(ring, &self.pending);
        self.pending.clear();
        self.state = sponge.squeeze(ring);
        self.state.clone()
    }

    pub fn challenge_vector(&mut self, ring: &mut R, n: usize) -> Vec<R::Elem> {
        (0..n).map(|_| self.challenge(ring)).collect()
    }
}

#[cfg(test)]
mod tests {
    use arith::NativeRing;
    use ark_bn254::Fr;

    use super::*;

    fn challenges(seed: &[u64], absorbs: &[u64], n: usize) -> Vec<Fr> {
        let mut ring = NativeRing::<Fr>::new();
        let registry = HashRegistry::with_defaults();
        let seed: Vec<Fr> = seed.iter().map(|&v| Fr::from(v)).collect();
        let mut transcript = Transcript::new(&mut ring, &registry, "mimc", &seed).unwrap();
        for &a in absorbs {
            transcript.append_element(&Fr::from(a));
        }
        transcript.challenge_vector(&mut ring, n)
    }

    #[test]
    fn challenges_are_deterministic() {
        assert_eq!(challenges(&[1], &[2, 3], 3), challenges(&[1], &[2, 3], 3));
    }

    #[test]
    fn challenges_depend_on_seed_and_messages() {
        let base = challenges(&[1], &[2, 3], 1);
        assert_ne!(base, challenges(&[4], &[2, 3], 1));
        assert_ne!(base, challenges(&[1], &[2, 4], 1));
        assert_ne!(base, challenges(&[1], &[3, 2], 1));
    }

    #[test]
    fn consecutive_challenges_differ() {
        let cs = challenges(&[7], &[], 2);
        assert_ne!(cs[0], cs[1]);
    }

    #[test]
    fn unknown_hash_is_rejected() {
        let mut ring = NativeRing::<Fr>::new();
        let registry = HashRegistry::<NativeRing<Fr>>::with_defaults();
        assert!(Transcript::new(&mut ring, &registry, "poseidon2", &[]).is_err());
    }
}
