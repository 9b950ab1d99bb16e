use std::sync::Arc;

use arith::NativeRing;
use circuit::{
    canonical_instance_order, canonical_wire_order, Circuit, CircuitError, Dependency,
    GateError, GateRegistry, Permutation, WireId,
};
use log::debug;
use transcript::{HashError, HashRegistry, Transcript};

use crate::{
    output_gate_wires, prove_hint_output_len, solve_hint_output_len, verify, BridgeError,
    CircuitDescriptor, CommitError, OuterApi, Proof, ProofShape, ProveHint, SolveHint,
};

/// The four registries a bridge session reads: gates and Fiat-Shamir
/// sponges, each in their native (prover-side) and outer (verifier-side)
/// incarnation. Gates must be registered identically on both sides; the
/// built-ins are, by construction.
#[derive(Debug)]
pub struct BridgeRegistries<A: OuterApi> {
    pub native_gates: Arc<GateRegistry<NativeRing<A::Base>>>,
    pub outer_gates: Arc<GateRegistry<A>>,
    pub native_hashes: Arc<HashRegistry<NativeRing<A::Base>>>,
    pub outer_hashes: Arc<HashRegistry<A>>,
}

impl<A: OuterApi> Clone for BridgeRegistries<A> {
    fn clone(&self) -> Self {
        Self {
            native_gates: Arc::clone(&self.native_gates),
            outer_gates: Arc::clone(&self.outer_gates),
            native_hashes: Arc::clone(&self.native_hashes),
            outer_hashes: Arc::clone(&self.outer_hashes),
        }
    }
}

impl<A: OuterApi + 'static> BridgeRegistries<A> {
    pub fn with_defaults() -> Self {
        Self {
            native_gates: Arc::new(GateRegistry::with_defaults()),
            outer_gates: Arc::new(GateRegistry::with_defaults()),
            native_hashes: Arc::new(HashRegistry::with_defaults()),
            outer_hashes: Arc::new(HashRegistry::with_defaults()),
        }
    }
}

/// One embedded-GKR use site, owned by the outer circuit author while the
/// outer circuit is being defined. Construction is append-only; `solve`
/// consumes the session.
pub struct GkrApi<A: OuterApi> {
    registries: BridgeRegistries<A>,
    circuit: Circuit,
    /// Imported per-instance variables, aligned with the circuit's wires;
    /// `None` entries inside an input column await a dependency.
    assignments: Vec<Option<Vec<Option<A::Elem>>>>,
    dependencies: Vec<Dependency>,
    nb_instances: Option<usize>,
}

impl<A: OuterApi> GkrApi<A> {
    pub fn new(registries: BridgeRegistries<A>) -> Self {
        Self {
            registries,
            circuit: Circuit::new(),
            assignments: Vec::new(),
            dependencies: Vec::new(),
            nb_instances: None,
        }
    }

    #[inline]
    pub fn nb_instances(&self) -> Option<usize> {
        self.nb_instances
    }

    /// Import outer-circuit variables as a new input wire, one value per
    /// instance. `None` marks a slot to be fed through `series`. The first
    /// import fixes the instance count; later imports must match it.
    pub fn import(&mut self, values: &[Option<A::Elem>]) -> Result<WireId, BridgeError> {
        let n = values.len();
        if !n.is_power_of_two() {
            return Err(CircuitError::NonPowerOfTwoInstances(n).into());
        }
        match self.nb_instances {
            Some(expected) if expected != n => {
                return Err(BridgeError::InstanceCountMismatch { expected, got: n });
            }
            _ => self.nb_instances = Some(n),
        }
        let wire = self.circuit.add_input();
        self.assignments.push(Some(values.to_vec()));
        Ok(wire)
    }

    /// Import with every slot explicitly supplied.
    pub fn import_values(&mut self, values: &[A::Elem]) -> Result<WireId, BridgeError> {
        let wrapped: Vec<Option<A::Elem>> = values.iter().cloned().map(Some).collect();
        self.import(&wrapped)
    }

    /// Append a gate wire. The gate must be registered on both the native
    /// and the outer side.
    pub fn named_gate(&mut self, name: &str, inputs: &[WireId]) -> Result<WireId, BridgeError> {
        let gate = self.registries.native_gates.get(name)?;
        if gate.arity() != inputs.len() {
            return Err(CircuitError::ArityMismatch {
                wire: self.circuit.nb_wires(),
                name: name.to_string(),
                expected: gate.arity(),
                got: inputs.len(),
            }
            .into());
        }
        if !self.registries.outer_gates.contains(name) {
            return Err(GateError::Unknown(name.to_string()).into());
        }
        let wire = self.circuit.add_gate(name, inputs)?;
        self.assignments.push(None);
        Ok(wire)
    }

    /// Bind `input`'s value at `input_instance` to `output`'s value at
    /// `output_instance`.
    pub fn series(
        &mut self,
        input: WireId,
        output: WireId,
        input_instance: usize,
        output_instance: usize,
    ) -> Result<(), BridgeError> {
        let n = self.nb_instances.ok_or(BridgeError::NothingImported)?;
        let nb_wires = self.circuit.nb_wires();
        for wire in [input, output] {
            if wire >= nb_wires {
                return Err(CircuitError::WireOutOfRange {
                    wire: nb_wires,
                    input: wire,
                }
                .into());
            }
        }
        if !self.circuit.wire(input).is_input() {
            return Err(CircuitError::NotAnInputWire { wire: input }.into());
        }
        for instance in [input_instance, output_instance] {
            if instance >= n {
                return Err(CircuitError::InstanceOutOfRange {
                    instance,
                    nb_instances: n,
                }
                .into());
            }
        }
        let slots = self.assignments[input]
            .as_ref()
            .expect("input wires carry imported slots");
        if slots[input_instance].is_some() {
            return Err(BridgeError::SlotExplicitlyAssigned {
                wire: input,
                instance: input_instance,
            });
        }
        if self
            .dependencies
            .iter()
            .any(|d| d.input_wire == input && d.input_instance == input_instance)
        {
            return Err(CircuitError::DuplicateDependency {
                wire: input,
                instance: input_instance,
            }
            .into());
        }
        self.dependencies.push(Dependency {
            input_wire: input,
            input_instance,
            output_wire: output,
            output_instance,
        });
        Ok(())
    }

    /// Canonicalize the circuit, run the solver as an off-circuit hint and
    /// assemble the materialized columns. Consumes the session.
    pub fn solve(self, api: &mut A) -> Result<Solution<A>, BridgeError> {
        let n = self.nb_instances.ok_or(BridgeError::NothingImported)?;
        let nb_wires = self.circuit.nb_wires();
        let counts = self.circuit.unique_consumer_counts();

        // a dependency can only source a wire the outer circuit will hold
        for dep in &self.dependencies {
            let source = self.circuit.wire(dep.output_wire);
            if !source.is_input() && counts[dep.output_wire] != 0 {
                return Err(BridgeError::DependencySourceNotMaterialized {
                    wire: dep.output_wire,
                });
            }
        }
        // every hole in an imported column must be fed by some dependency
        for w in self.circuit.input_wires() {
            let slots = self.assignments[w]
                .as_ref()
                .expect("input wires carry imported slots");
            for (instance, slot) in slots.iter().enumerate() {
                if slot.is_none()
                    && !self
                        .dependencies
                        .iter()
                        .any(|d| d.input_wire == w && d.input_instance == instance)
                {
                    return Err(BridgeError::UnassignedInputSlot { wire: w, instance });
                }
            }
        }

        // canonical form: wires bucketed, instances topologically ordered;
        // computed once, applied once
        let wire_perm = canonical_wire_order(&self.circuit);
        let instance_perm = canonical_instance_order(&self.dependencies, n)?;

        let mut canonical = Circuit::new();
        for new in 0..nb_wires {
            let wire = self.circuit.wire(wire_perm.old_index(new));
            match &wire.gate {
                None => {
                    canonical.add_input();
                }
                Some(name) => {
                    let remapped: Vec<WireId> = wire
                        .inputs
                        .iter()
                        .map(|&input| wire_perm.new_index(input))
                        .collect();
                    canonical.add_gate(name.clone(), &remapped)?;
                }
            }
        }

        let mut dependencies: Vec<Dependency> = self
            .dependencies
            .iter()
            .map(|d| Dependency {
                input_wire: wire_perm.new_index(d.input_wire),
                input_instance: instance_perm.new_index(d.input_instance),
                output_wire: wire_perm.new_index(d.output_wire),
                output_instance: instance_perm.new_index(d.output_instance),
            })
            .collect();
        dependencies.sort_by_key(|d| (d.input_instance, d.input_wire));

        // imported columns in canonical wire and instance order
        let mut columns: Vec<Option<Vec<Option<A::Elem>>>> = Vec::with_capacity(nb_wires);
        for new in 0..nb_wires {
            let old = wire_perm.old_index(new);
            columns.push(self.assignments[old].as_ref().map(|col| {
                (0..n)
                    .map(|instance| col[instance_perm.old_index(instance)].clone())
                    .collect()
            }));
        }

        // an unregistered gate must surface now, not inside the hint
        canonical.resolve(&*self.registries.native_gates)?;

        let descriptor = CircuitDescriptor::new(&canonical, n, dependencies.clone());

        let mut hint_inputs: Vec<A::Elem> = Vec::new();
        for w in canonical.input_wires() {
            let col = columns[w].as_ref().expect("input wires have columns");
            hint_inputs.extend(col.iter().flatten().cloned());
        }

        let nb_outputs = solve_hint_output_len(&canonical, n, dependencies.len());
        let hint_outputs = if nb_outputs > 0 {
            let hint = SolveHint::new(
                descriptor.solve_hint_id.clone(),
                canonical.clone(),
                n,
                dependencies.clone(),
                Arc::clone(&self.registries.native_gates),
            );
            api.new_hint(Arc::new(hint), nb_outputs, &hint_inputs)?
        } else {
            Vec::new()
        };
        debug!(
            "gkr solve hint: {} inputs, {} outputs, {} wires",
            hint_inputs.len(),
            nb_outputs,
            nb_wires
        );

        // output gate columns come from the hint; dependency slots reuse the
        // source wire's variable, so the proof covers them with no extra
        // constraint
        for (k, &w) in output_gate_wires(&canonical).iter().enumerate() {
            let start = dependencies.len() + k * n;
            columns[w] = Some(
                hint_outputs[start..start + n]
                    .iter()
                    .cloned()
                    .map(Some)
                    .collect(),
            );
        }
        for dep in &dependencies {
            let value = columns[dep.output_wire]
                .as_ref()
                .and_then(|col| col[dep.output_instance].clone())
                .ok_or(BridgeError::DependencySourceNotMaterialized {
                    wire: dep.output_wire,
                })?;
            columns[dep.input_wire]
                .as_mut()
                .expect("dependency targets are input wires")[dep.input_instance] = Some(value);
        }

        let columns: Vec<Option<Vec<A::Elem>>> = columns
            .into_iter()
            .map(|col| {
                col.map(|slots| {
                    slots
                        .into_iter()
                        .map(|slot| slot.expect("all slots were resolved above"))
                        .collect()
                })
            })
            .collect();

        Ok(Solution {
            registries: self.registries,
            circuit: canonical,
            descriptor,
            columns,
            wire_perm,
            instance_perm,
            nb_instances: n,
        })
    }
}

/// The solved circuit: every materialized wire's per-instance variables plus
/// the canonicalization that produced them. Consumed by `verify`.
#[derive(Debug)]
pub struct Solution<A: OuterApi> {
    registries: BridgeRegistries<A>,
    circuit: Circuit,
    descriptor: CircuitDescriptor,
    columns: Vec<Option<Vec<A::Elem>>>,
    wire_perm: Permutation,
    instance_perm: Permutation,
    nb_instances: usize,
}

impl<A: OuterApi> Solution<A> {
    pub fn descriptor(&self) -> &CircuitDescriptor {
        &self.descriptor
    }

    /// The wire's per-instance values as outer variables, in the original
    /// (pre-permutation) instance order. Only input and output wires are
    /// materialized; internal wires stay inside the argument.
    pub fn export(&self, wire: WireId) -> Result<Vec<A::Elem>, BridgeError> {
        if wire >= self.wire_perm.len() {
            return Err(CircuitError::WireOutOfRange {
                wire: self.wire_perm.len(),
                input: wire,
            }
            .into());
        }
        let canonical = self.wire_perm.new_index(wire);
        let column = self.columns[canonical]
            .as_ref()
            .ok_or(BridgeError::ExportInternalWire { wire })?;
        Ok((0..self.nb_instances)
            .map(|instance| column[self.instance_perm.new_index(instance)].clone())
            .collect())
    }

    /// Prove off-circuit and replay the verifier in-circuit.
    ///
    /// The Fiat-Shamir seed is the caller's initial challenges plus, when
    /// the builder supports it, a commitment binding every materialized
    /// column; with neither, verification refuses to run.
    pub fn verify(
        mut self,
        api: &mut A,
        hash_name: &str,
        initial_challenges: &[A::Elem],
    ) -> Result<(), BridgeError> {
        for registry_has in [
            self.registries.native_hashes.contains(hash_name),
            self.registries.outer_hashes.contains(hash_name),
        ] {
            if !registry_has {
                return Err(HashError::Unknown(hash_name.to_string()).into());
            }
        }

        let mut seeds: Vec<A::Elem> = initial_challenges.to_vec();
        let bound: Vec<A::Elem> = self
            .columns
            .iter()
            .flatten()
            .flat_map(|col| col.iter().cloned())
            .collect();
        match api.commit(&bound) {
            Ok(commitment) => seeds.push(commitment),
            Err(CommitError::Unsupported) => {
                if seeds.is_empty() {
                    return Err(BridgeError::MissingFiatShamirSeed);
                }
            }
        }

        self.descriptor.finalize(hash_name, seeds.len());

        // prove hint inputs: seed first, then input columns, then the solve
        // hint's output columns - the data dependency that orders the hints
        let mut hint_inputs = seeds.clone();
        for w in self.circuit.input_wires() {
            let col = self.columns[w].as_ref().expect("input columns exist");
            hint_inputs.extend(col.iter().cloned());
        }
        for w in output_gate_wires(&self.circuit) {
            let col = self.columns[w].as_ref().expect("output columns exist");
            hint_inputs.extend(col.iter().cloned());
        }

        let nb_outputs =
            prove_hint_output_len(&self.circuit, &self.registries.native_gates, self.nb_instances)?;
        let hint = ProveHint::new(
            self.descriptor.prove_hint_id.clone(),
            self.circuit.clone(),
            self.nb_instances,
            seeds.len(),
            hash_name.to_string(),
            Arc::clone(&self.registries.native_gates),
            Arc::clone(&self.registries.native_hashes),
        );
        let proof_elems = api.new_hint(Arc::new(hint), nb_outputs, &hint_inputs)?;

        let shape = ProofShape::of(&self.circuit, &*self.registries.native_gates, self.nb_instances)
            .map_err(BridgeError::Circuit)?;
        let proof = Proof::deserialize(&shape, &proof_elems).map_err(BridgeError::Verify)?;

        let mut transcript =
            Transcript::new(api, &self.registries.outer_hashes, hash_name, &seeds)?;
        verify(
            api,
            &self.circuit,
            &self.registries.outer_gates,
            &self.columns,
            &proof,
            &mut transcript,
        )
        .map_err(BridgeError::Verify)?;

        api.attach_gkr_circuit(&self.descriptor);
        Ok(())
    }
}
