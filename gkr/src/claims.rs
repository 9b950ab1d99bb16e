use circuit::WireId;

/// A statement "the multilinear extension of this wire's assignment takes
/// `value` at `point`".
#[derive(Debug, Clone)]
pub struct Claim<T> {
    pub point: Vec<T>,
    pub value: T,
}

/// Per-wire claim collection. Claims accumulate while the wires consuming a
/// wire are reduced, and are taken exactly once when the wire's own turn
/// comes. Insertion order is deterministic and identical on the prover and
/// the verifier; the random-linear-combination batching relies on that.
#[derive(Debug, Clone)]
pub struct ClaimsManager<T> {
    per_wire: Vec<Vec<Claim<T>>>,
}

impl<T> ClaimsManager<T> {
    pub fn new(nb_wires: usize) -> Self {
        Self {
            per_wire: (0..nb_wires).map(|_| Vec::new()).collect(),
        }
    }

    #[inline]
    pub fn add(&mut self, wire: WireId, point: Vec<T>, value: T) {
        self.per_wire[wire].push(Claim { point, value });
    }

    #[inline]
    pub fn count(&self, wire: WireId) -> usize {
        self.per_wire[wire].len()
    }

    /// Take the wire's claims; the wire transitions to its reduction phase.
    #[inline]
    pub fn take(&mut self, wire: WireId) -> Vec<Claim<T>> {
        std::mem::take(&mut self.per_wire[wire])
    }
}
