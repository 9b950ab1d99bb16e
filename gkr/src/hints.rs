use std::sync::Arc;

use arith::NativeRing;
use ark_ff::PrimeField;
use circuit::{solve, Circuit, CircuitError, Dependency, GateRegistry, WireId};
use transcript::{HashRegistry, Transcript};

use crate::{prove, Hint, HintError, ProofShape};

/// Output wires that are not inputs: the wires whose columns the solve hint
/// must materialize for the outer circuit.
pub fn output_gate_wires(circuit: &Circuit) -> Vec<WireId> {
    circuit
        .output_wires()
        .into_iter()
        .filter(|&w| !circuit.wire(w).is_input())
        .collect()
}

/// Number of explicit values fed to the solve hint: every input-wire slot
/// not bound by a dependency.
pub fn solve_hint_input_len(circuit: &Circuit, nb_instances: usize, nb_deps: usize) -> usize {
    circuit.input_wires().count() * nb_instances - nb_deps
}

/// Solve-hint output layout: one value per dependency (in descriptor
/// order), then the full column of every output gate wire.
pub fn solve_hint_output_len(circuit: &Circuit, nb_instances: usize, nb_deps: usize) -> usize {
    nb_deps + output_gate_wires(circuit).len() * nb_instances
}

/// The off-circuit solver run. Deterministic in its inputs; its outputs feed
/// the prove hint, which is what orders the two hints at witness time.
pub struct SolveHint<F: PrimeField> {
    id: String,
    circuit: Circuit,
    nb_instances: usize,
    dependencies: Vec<Dependency>,
    gates: Arc<GateRegistry<NativeRing<F>>>,
}

impl<F: PrimeField> SolveHint<F> {
    pub fn new(
        id: String,
        circuit: Circuit,
        nb_instances: usize,
        dependencies: Vec<Dependency>,
        gates: Arc<GateRegistry<NativeRing<F>>>,
    ) -> Self {
        Self {
            id,
            circuit,
            nb_instances,
            dependencies,
            gates,
        }
    }
}

impl<F: PrimeField> Hint<F> for SolveHint<F> {
    fn id(&self) -> &str {
        &self.id
    }

    fn run(&self, inputs: &[F], nb_outputs: usize) -> Result<Vec<F>, HintError> {
        let n = self.nb_instances;
        let fail = |reason: String| HintError::Failed(reason);

        let expected =
            solve_hint_input_len(&self.circuit, n, self.dependencies.len());
        if inputs.len() != expected {
            return Err(fail(format!(
                "solve hint expected {expected} inputs, got {}",
                inputs.len()
            )));
        }

        // slice the flat input stream into per-wire explicit values
        let mut cursor = inputs.iter();
        let mut explicit: Vec<Vec<F>> = Vec::new();
        for w in self.circuit.input_wires() {
            let bound = self
                .dependencies
                .iter()
                .filter(|d| d.input_wire == w)
                .count();
            explicit.push(cursor.by_ref().take(n - bound).copied().collect());
        }

        let assignment = solve(&self.circuit, &self.gates, n, &explicit, &self.dependencies)
            .map_err(|e| fail(e.to_string()))?;

        let mut outputs = Vec::with_capacity(nb_outputs);
        for dep in &self.dependencies {
            outputs.push(assignment.wire(dep.input_wire)[dep.input_instance]);
        }
        for w in output_gate_wires(&self.circuit) {
            outputs.extend_from_slice(assignment.wire(w));
        }
        debug_assert_eq!(outputs.len(), nb_outputs);
        Ok(outputs)
    }
}

/// The off-circuit prover run. Its inputs start with the Fiat-Shamir seed
/// and include the solve hint's outputs, so the outer scheduler cannot run
/// it before the solver.
pub struct ProveHint<F: PrimeField> {
    id: String,
    circuit: Circuit,
    nb_instances: usize,
    nb_seed_elems: usize,
    fs_hash_name: String,
    gates: Arc<GateRegistry<NativeRing<F>>>,
    hashes: Arc<HashRegistry<NativeRing<F>>>,
}

impl<F: PrimeField> ProveHint<F> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: String,
        circuit: Circuit,
        nb_instances: usize,
        nb_seed_elems: usize,
        fs_hash_name: String,
        gates: Arc<GateRegistry<NativeRing<F>>>,
        hashes: Arc<HashRegistry<NativeRing<F>>>,
    ) -> Self {
        Self {
            id,
            circuit,
            nb_instances,
            nb_seed_elems,
            fs_hash_name,
            gates,
            hashes,
        }
    }
}

impl<F: PrimeField> Hint<F> for ProveHint<F> {
    fn id(&self) -> &str {
        &self.id
    }

    fn run(&self, inputs: &[F], nb_outputs: usize) -> Result<Vec<F>, HintError> {
        let n = self.nb_instances;
        let fail = |reason: String| HintError::Failed(reason);

        let nb_input_wires = self.circuit.input_wires().count();
        let nb_output_cols = output_gate_wires(&self.circuit).len();
        let expected = self.nb_seed_elems + (nb_input_wires + nb_output_cols) * n;
        if inputs.len() != expected {
            return Err(fail(format!(
                "prove hint expected {expected} inputs, got {}",
                inputs.len()
            )));
        }

        let seeds = &inputs[..self.nb_seed_elems];
        let mut cursor = inputs[self.nb_seed_elems..].iter();
        let explicit: Vec<Vec<F>> = (0..nb_input_wires)
            .map(|_| cursor.by_ref().take(n).copied().collect())
            .collect();

        // every input slot is explicit here, dependencies included: the
        // solver reduces to a forward evaluation
        let assignment = solve(&self.circuit, &self.gates, n, &explicit, &[])
            .map_err(|e| fail(e.to_string()))?;

        let mut ring = NativeRing::<F>::new();
        let mut transcript =
            Transcript::new(&mut ring, &self.hashes, &self.fs_hash_name, seeds)
                .map_err(|e| fail(e.to_string()))?;
        let proof = prove(&self.circuit, &self.gates, &assignment, &mut transcript)
            .map_err(|e| fail(e.to_string()))?;

        let out = proof.serialize();
        if out.len() != nb_outputs {
            return Err(fail(format!(
                "prove hint produced {} elements, expected {nb_outputs}",
                out.len()
            )));
        }
        Ok(out)
    }
}

/// Number of field elements the prove hint emits.
pub fn prove_hint_output_len<F: PrimeField>(
    circuit: &Circuit,
    gates: &GateRegistry<NativeRing<F>>,
    nb_instances: usize,
) -> Result<usize, CircuitError> {
    Ok(ProofShape::of(circuit, gates, nb_instances)?.nb_elems())
}
