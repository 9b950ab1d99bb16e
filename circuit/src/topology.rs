use std::cmp::Reverse;
use std::collections::BinaryHeap;

use crate::{Circuit, CircuitError, Dependency, WireId};

/// A bijection on indices, kept in both directions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Permutation {
    new_to_old: Vec<usize>,
    old_to_new: Vec<usize>,
}

impl Permutation {
    pub fn identity(n: usize) -> Self {
        Self {
            new_to_old: (0..n).collect(),
            old_to_new: (0..n).collect(),
        }
    }

    pub fn from_new_to_old(new_to_old: Vec<usize>) -> Self {
        let mut old_to_new = vec![0usize; new_to_old.len()];
        for (new, &old) in new_to_old.iter().enumerate() {
            old_to_new[old] = new;
        }
        Self {
            new_to_old,
            old_to_new,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.new_to_old.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.new_to_old.is_empty()
    }

    pub fn is_identity(&self) -> bool {
        self.new_to_old.iter().enumerate().all(|(i, &o)| i == o)
    }

    #[inline]
    pub fn new_index(&self, old: usize) -> usize {
        self.old_to_new[old]
    }

    #[inline]
    pub fn old_index(&self, new: usize) -> usize {
        self.new_to_old[new]
    }

    /// Reorder a slice into canonical (new) order.
    pub fn apply<T: Clone>(&self, items: &[T]) -> Vec<T> {
        debug_assert_eq!(items.len(), self.len());
        self.new_to_old.iter().map(|&o| items[o].clone()).collect()
    }
}

/// Canonical wire order: input wires, then internal gate wires, then output
/// wires, each bucket in declaration order. Declaration order is already
/// topologically valid, and outputs have no consumers, so the bucketing
/// preserves the invariant that a wire precedes all its consumers.
/// Applying it to an already-canonical circuit yields the identity.
pub fn canonical_wire_order(circuit: &Circuit) -> Permutation {
    let counts = circuit.unique_consumer_counts();
    let mut order: Vec<WireId> = Vec::with_capacity(circuit.nb_wires());

    order.extend((0..circuit.nb_wires()).filter(|&w| circuit.wire(w).is_input()));
    order.extend(
        (0..circuit.nb_wires()).filter(|&w| !circuit.wire(w).is_input() && counts[w] > 0),
    );
    order.extend(
        (0..circuit.nb_wires()).filter(|&w| !circuit.wire(w).is_input() && counts[w] == 0),
    );

    Permutation::from_new_to_old(order)
}

/// Canonical instance order: the lexicographically-smallest topological order
/// of the dependency graph over instances (Kahn's algorithm with a min-index
/// heap). With all dependencies already flowing forward this is the identity.
/// An instance-level cycle, including a self-loop, is a construction error.
pub fn canonical_instance_order(
    dependencies: &[Dependency],
    nb_instances: usize,
) -> Result<Permutation, CircuitError> {
    if dependencies.is_empty() {
        return Ok(Permutation::identity(nb_instances));
    }

    let mut successors: Vec<Vec<usize>> = vec![vec![]; nb_instances];
    let mut indegree = vec![0usize; nb_instances];
    for dep in dependencies {
        if dep.output_instance == dep.input_instance {
            return Err(CircuitError::CyclicDependency);
        }
        successors[dep.output_instance].push(dep.input_instance);
        indegree[dep.input_instance] += 1;
    }

    let mut ready: BinaryHeap<Reverse<usize>> = (0..nb_instances)
        .filter(|&i| indegree[i] == 0)
        .map(Reverse)
        .collect();
    let mut order = Vec::with_capacity(nb_instances);

    while let Some(Reverse(i)) = ready.pop() {
        order.push(i);
        for &next in &successors[i] {
            indegree[next] -= 1;
            if indegree[next] == 0 {
                ready.push(Reverse(next));
            }
        }
    }

    if order.len() != nb_instances {
        return Err(CircuitError::CyclicDependency);
    }
    Ok(Permutation::from_new_to_old(order))
}
