use arith::{lagrange_eval, lagrange_inv_weights, Ring};
use transcript::Transcript;

/// Replay one wire's sumcheck rounds against the transcript.
///
/// Each round's polynomial arrives as its values at 1..=D; the value at 0 is
/// reconstructed as `claim - g(1)`, which defers all soundness to the final
/// gate-evaluation check. Returns the reduced point and the claim the last
/// round leaves open there.
pub fn verify_rounds<R: Ring>(
    ring: &mut R,
    mut claim: R::Elem,
    degree: usize,
    round_polys: &[Vec<R::Elem>],
    transcript: &mut Transcript<'_, R>,
) -> (Vec<R::Elem>, R::Elem) {
    let inv_weights = lagrange_inv_weights::<R::Base>(degree);
    let mut point = Vec::with_capacity(round_polys.len());

    for sent in round_polys {
        debug_assert_eq!(sent.len(), degree);
        for eval in sent.iter() {
            transcript.append_element(eval);
        }
        let r = transcript.challenge(ring);

        // g(0) = claim - g(1), then step to g(r)
        let g0 = ring.sub(&claim, &sent[0]);
        let mut full = Vec::with_capacity(degree + 1);
        full.push(g0);
        full.extend(sent.iter().cloned());
        claim = lagrange_eval(ring, &full, &inv_weights, &r);
        point.push(r);
    }

    (point, claim)
}
