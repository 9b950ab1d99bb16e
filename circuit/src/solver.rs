use std::collections::HashMap;
use std::time::Instant;

use arith::NativeRing;
use ark_ff::PrimeField;
use log::debug;
use rayon::prelude::*;
use thiserror::Error;

use crate::{canonical_instance_order, Circuit, CircuitError, Dependency, GateRegistry, WireId};

/// Instances are evaluated in bounded batches; batches only run in parallel
/// when no dependency forces an order between them.
pub const SOLVER_CHUNK_SIZE: usize = 1024;

#[derive(Debug, Error)]
pub enum SolverError {
    #[error(transparent)]
    Circuit(#[from] CircuitError),

    #[error("input wire {wire} is missing explicit values ({got} supplied, {needed} needed)")]
    MissingInput {
        wire: WireId,
        got: usize,
        needed: usize,
    },

    #[error("input wire {wire} has too many explicit values ({got} supplied, {needed} needed)")]
    TooManyInputs {
        wire: WireId,
        got: usize,
        needed: usize,
    },

    #[error("{got} input vectors supplied, but the circuit has {expected} input wires")]
    SurplusInputVectors { got: usize, expected: usize },
}

/// Every wire's value at every instance, wire-major.
#[derive(Debug, Clone)]
pub struct WireAssignment<F: PrimeField> {
    pub nb_instances: usize,
    columns: Vec<Vec<F>>,
}

impl<F: PrimeField> WireAssignment<F> {
    pub fn zeroed(nb_wires: usize, nb_instances: usize) -> Self {
        Self {
            nb_instances,
            columns: vec![vec![F::zero(); nb_instances]; nb_wires],
        }
    }

    #[inline]
    pub fn wire(&self, w: WireId) -> &[F] {
        &self.columns[w]
    }

    #[inline]
    pub fn set(&mut self, w: WireId, instance: usize, value: F) {
        self.columns[w][instance] = value;
    }
}

/// Compute every wire's value in every instance.
///
/// `inputs` holds one vector of explicit values per input wire (ascending
/// wire order); each is consumed in ascending instance order, skipping the
/// instances bound by a dependency. Dependency cycles are detected up front
/// by the instance topological sort; evaluation itself never recurses.
pub fn solve<F: PrimeField>(
    circuit: &Circuit,
    registry: &GateRegistry<NativeRing<F>>,
    nb_instances: usize,
    inputs: &[Vec<F>],
    dependencies: &[Dependency],
) -> Result<WireAssignment<F>, SolverError> {
    if !nb_instances.is_power_of_two() {
        return Err(CircuitError::NonPowerOfTwoInstances(nb_instances).into());
    }
    let resolved = circuit.resolve(registry)?;
    let dependency_map = index_dependencies(circuit, nb_instances, dependencies)?;

    let started = Instant::now();
    let mut assignment = WireAssignment::zeroed(circuit.nb_wires(), nb_instances);
    bind_explicit_inputs(circuit, nb_instances, inputs, &dependency_map, &mut assignment)?;

    let max_arity = circuit.max_arity().max(1);
    if dependency_map.is_empty() {
        // independent instances: fan the chunks out on the worker pool
        let chunks = split_into_chunks(&mut assignment.columns, nb_instances);
        chunks.into_par_iter().for_each(|mut columns| {
            let mut ring = NativeRing::<F>::new();
            let mut scratch = vec![F::zero(); max_arity];
            let chunk_len = columns.first().map_or(0, |c| c.len());
            for instance in 0..chunk_len {
                for (w, gate) in resolved.iter().enumerate() {
                    if let Some(gate) = gate {
                        let wire = circuit.wire(w);
                        for (k, &input) in wire.inputs.iter().enumerate() {
                            scratch[k] = columns[input][instance];
                        }
                        columns[w][instance] =
                            gate.evaluate(&mut ring, &scratch[..wire.inputs.len()]);
                    }
                }
            }
        });
    } else {
        // dependencies serialize the instances; walk them in topological order
        let order = canonical_instance_order(dependencies, nb_instances)?;
        let mut ring = NativeRing::<F>::new();
        let mut scratch = vec![F::zero(); max_arity];
        for step in 0..nb_instances {
            let instance = order.old_index(step);
            for (w, gate) in resolved.iter().enumerate() {
                match gate {
                    Some(gate) => {
                        let wire = circuit.wire(w);
                        for (k, &input) in wire.inputs.iter().enumerate() {
                            scratch[k] = assignment.columns[input][instance];
                        }
                        let value = gate.evaluate(&mut ring, &scratch[..wire.inputs.len()]);
                        assignment.set(w, instance, value);
                    }
                    None => {
                        if let Some(&(ow, oi)) = dependency_map.get(&(w, instance)) {
                            let value = assignment.columns[ow][oi];
                            assignment.set(w, instance, value);
                        }
                    }
                }
            }
        }
    }

    debug!(
        "solved {} wires x {} instances in {:?}",
        circuit.nb_wires(),
        nb_instances,
        started.elapsed()
    );
    Ok(assignment)
}

fn index_dependencies(
    circuit: &Circuit,
    nb_instances: usize,
    dependencies: &[Dependency],
) -> Result<HashMap<(WireId, usize), (WireId, usize)>, SolverError> {
    let mut map = HashMap::with_capacity(dependencies.len());
    for dep in dependencies {
        for wire in [dep.input_wire, dep.output_wire] {
            if wire >= circuit.nb_wires() {
                return Err(CircuitError::WireOutOfRange {
                    wire: circuit.nb_wires(),
                    input: wire,
                }
                .into());
            }
        }
        if !circuit.wire(dep.input_wire).is_input() {
            return Err(CircuitError::NotAnInputWire {
                wire: dep.input_wire,
            }
            .into());
        }
        for instance in [dep.input_instance, dep.output_instance] {
            if instance >= nb_instances {
                return Err(CircuitError::InstanceOutOfRange {
                    instance,
                    nb_instances,
                }
                .into());
            }
        }
        if map
            .insert(
                (dep.input_wire, dep.input_instance),
                (dep.output_wire, dep.output_instance),
            )
            .is_some()
        {
            return Err(CircuitError::DuplicateDependency {
                wire: dep.input_wire,
                instance: dep.input_instance,
            }
            .into());
        }
    }
    Ok(map)
}

fn bind_explicit_inputs<F: PrimeField>(
    circuit: &Circuit,
    nb_instances: usize,
    inputs: &[Vec<F>],
    dependency_map: &HashMap<(WireId, usize), (WireId, usize)>,
    assignment: &mut WireAssignment<F>,
) -> Result<(), SolverError> {
    let mut supplied = inputs.iter();
    for w in 0..circuit.nb_wires() {
        if !circuit.wire(w).is_input() {
            continue;
        }
        let values = supplied.next().map(Vec::as_slice).unwrap_or(&[]);
        let needed = (0..nb_instances)
            .filter(|&i| !dependency_map.contains_key(&(w, i)))
            .count();
        if values.len() < needed {
            return Err(SolverError::MissingInput {
                wire: w,
                got: values.len(),
                needed,
            });
        }
        if values.len() > needed {
            return Err(SolverError::TooManyInputs {
                wire: w,
                got: values.len(),
                needed,
            });
        }
        let mut cursor = values.iter();
        for instance in 0..nb_instances {
            if !dependency_map.contains_key(&(w, instance)) {
                // cursor length was checked against `needed` above
                assignment.set(w, instance, *cursor.next().unwrap());
            }
        }
    }
    if supplied.next().is_some() {
        return Err(SolverError::SurplusInputVectors {
            got: inputs.len(),
            expected: circuit.input_wires().count(),
        });
    }
    Ok(())
}

/// Split each wire column into per-chunk mutable slices, chunked along the
/// instance axis. Each returned group owns disjoint parts of the assignment,
/// so the chunks can be evaluated concurrently.
fn split_into_chunks<'a, F: PrimeField>(
    columns: &'a mut [Vec<F>],
    nb_instances: usize,
) -> Vec<Vec<&'a mut [F]>> {
    let nb_chunks = nb_instances.div_ceil(SOLVER_CHUNK_SIZE).max(1);
    let mut rests: Vec<&'a mut [F]> = columns.iter_mut().map(|c| c.as_mut_slice()).collect();
    let mut chunks = Vec::with_capacity(nb_chunks);
    let mut start = 0;
    while start < nb_instances {
        let len = SOLVER_CHUNK_SIZE.min(nb_instances - start);
        let mut group = Vec::with_capacity(rests.len());
        for rest in rests.iter_mut() {
            let (head, tail) = std::mem::take(rest).split_at_mut(len);
            group.push(head);
            *rest = tail;
        }
        chunks.push(group);
        start += len;
    }
    chunks
}

#[cfg(test)]
mod tests {
    use ark_bn254::Fr;
    use arith::Ring;

    use super::*;
    use crate::GateOptions;

    fn fr(values: &[u64]) -> Vec<Fr> {
        values.iter().map(|&v| Fr::from(v)).collect()
    }

    fn registry() -> GateRegistry<NativeRing<Fr>> {
        GateRegistry::with_defaults()
    }

    #[test]
    fn gate_values_match_reference_arithmetic() {
        let mut circuit = Circuit::new();
        let x = circuit.add_input();
        let y = circuit.add_input();
        let p = circuit.add_gate("mul", &[x, y]).unwrap();
        circuit.add_gate("add", &[p, x]).unwrap();

        let assignment = solve(
            &circuit,
            &registry(),
            4,
            &[fr(&[1, 2, 3, 4]), fr(&[5, 6, 7, 8])],
            &[],
        )
        .unwrap();

        assert_eq!(assignment.wire(p), fr(&[5, 12, 21, 32]).as_slice());
        assert_eq!(assignment.wire(3), fr(&[6, 14, 24, 36]).as_slice());
    }

    #[test]
    fn parallel_chunks_match_small_runs() {
        let nb_instances = 4 * SOLVER_CHUNK_SIZE;
        let mut circuit = Circuit::new();
        let x = circuit.add_input();
        let sq = circuit.add_gate("square", &[x]).unwrap();
        circuit.add_gate("neg", &[sq]).unwrap();

        let values: Vec<Fr> = (0..nb_instances as u64).map(Fr::from).collect();
        let assignment = solve(&circuit, &registry(), nb_instances, &[values.clone()], &[])
            .unwrap();

        for (i, v) in values.iter().enumerate() {
            assert_eq!(assignment.wire(2)[i], -(*v * v));
        }
    }

    #[test]
    fn dependencies_chain_instances() {
        // running product: state_{i+1} = state_i * x_i
        let mut circuit = Circuit::new();
        let state = circuit.add_input();
        let x = circuit.add_input();
        let next = circuit.add_gate("mul", &[state, x]).unwrap();

        let deps: Vec<Dependency> = (1..4)
            .map(|i| Dependency {
                input_wire: state,
                input_instance: i,
                output_wire: next,
                output_instance: i - 1,
            })
            .collect();

        let assignment = solve(
            &circuit,
            &registry(),
            4,
            &[fr(&[1]), fr(&[2, 3, 4, 5])],
            &deps,
        )
        .unwrap();

        assert_eq!(assignment.wire(state), fr(&[1, 2, 6, 24]).as_slice());
        assert_eq!(assignment.wire(next), fr(&[2, 6, 24, 120]).as_slice());
        for i in 1..4 {
            assert_eq!(assignment.wire(state)[i], assignment.wire(next)[i - 1]);
        }
    }

    #[test]
    fn cyclic_dependencies_fail_before_evaluation() {
        let mut circuit = Circuit::new();
        let a = circuit.add_input();
        let b = circuit.add_input();
        let out = circuit.add_gate("add", &[a, b]).unwrap();

        let deps = [
            Dependency {
                input_wire: a,
                input_instance: 0,
                output_wire: out,
                output_instance: 1,
            },
            Dependency {
                input_wire: b,
                input_instance: 1,
                output_wire: out,
                output_instance: 0,
            },
        ];
        let err = solve(&circuit, &registry(), 2, &[fr(&[9]), fr(&[9])], &deps).unwrap_err();
        assert!(matches!(
            err,
            SolverError::Circuit(CircuitError::CyclicDependency)
        ));
    }

    #[test]
    fn missing_and_surplus_inputs_are_reported() {
        let mut circuit = Circuit::new();
        let x = circuit.add_input();
        circuit.add_gate("square", &[x]).unwrap();

        let err = solve(&circuit, &registry(), 2, &[fr(&[1])], &[]).unwrap_err();
        assert!(matches!(err, SolverError::MissingInput { wire: 0, .. }));

        let err = solve(&circuit, &registry(), 2, &[fr(&[1, 2, 3])], &[]).unwrap_err();
        assert!(matches!(err, SolverError::TooManyInputs { wire: 0, .. }));
    }

    #[test]
    fn unregistered_gate_surfaces_at_resolution() {
        let mut circuit = Circuit::new();
        let x = circuit.add_input();
        circuit.add_gate("poseidon2", &[x]).unwrap();

        let err = solve(&circuit, &registry(), 2, &[fr(&[1, 2])], &[]).unwrap_err();
        assert!(matches!(
            err,
            SolverError::Circuit(CircuitError::Gate { wire: 1, .. })
        ));
    }

    #[test]
    fn custom_gate_goes_through_registration_and_solving() {
        let mut reg = registry();
        reg.register_auto(
            "lincomb",
            3,
            GateOptions {
                degree: Some(1),
                solvable_var: Some(2),
            },
            Box::new(|ring, xs| {
                let s = ring.add(&xs[0], &xs[1]);
                let s = ring.add(&s, &xs[2]);
                ring.add(&s, &xs[2])
            }),
        )
        .unwrap();

        let mut circuit = Circuit::new();
        let a = circuit.add_input();
        let b = circuit.add_input();
        let c = circuit.add_input();
        let out = circuit.add_gate("lincomb", &[a, b, c]).unwrap();

        let assignment = solve(
            &circuit,
            &reg,
            2,
            &[fr(&[1, 2]), fr(&[10, 20]), fr(&[100, 200])],
            &[],
        )
        .unwrap();
        assert_eq!(assignment.wire(out), fr(&[211, 422]).as_slice());
    }
}
