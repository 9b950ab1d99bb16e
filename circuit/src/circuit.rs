use std::sync::Arc;

use arith::Ring;
use itertools::Itertools;
use thiserror::Error;

use crate::{Gate, GateError, GateRegistry};

pub type WireId = usize;

#[derive(Debug, Error)]
pub enum CircuitError {
    #[error("wire {wire}: input {input} is not an existing wire")]
    WireOutOfRange { wire: WireId, input: WireId },

    #[error("wire {wire}: {source}")]
    Gate {
        wire: WireId,
        #[source]
        source: GateError,
    },

    #[error("wire {wire}: gate `{name}` takes {expected} inputs, got {got}")]
    ArityMismatch {
        wire: WireId,
        name: String,
        expected: usize,
        got: usize,
    },

    #[error("wire {wire} is not an input wire")]
    NotAnInputWire { wire: WireId },

    #[error("instance {instance} is out of range for {nb_instances} instances")]
    InstanceOutOfRange {
        instance: usize,
        nb_instances: usize,
    },

    #[error("wire {wire} already has a dependency at instance {instance}")]
    DuplicateDependency { wire: WireId, instance: usize },

    #[error("instance count {0} is not a power of two")]
    NonPowerOfTwoInstances(usize),

    #[error("the dependency graph over instances has a cycle")]
    CyclicDependency,
}

/// A node of the GKR circuit: either an externally-fed input wire or the
/// output of a named gate applied to earlier wires.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Wire {
    pub gate: Option<String>,
    pub inputs: Vec<WireId>,
}

impl Wire {
    #[inline]
    pub fn is_input(&self) -> bool {
        self.gate.is_none()
    }
}

/// States that `input_wire` at `input_instance` takes the value computed for
/// `output_wire` at `output_instance`, chaining invocations of the circuit
/// across instances.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dependency {
    pub input_wire: WireId,
    pub input_instance: usize,
    pub output_wire: WireId,
    pub output_instance: usize,
}

/// Append-only list of wires in a topologically valid order: every gate input
/// references a strictly smaller index.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Circuit {
    wires: Vec<Wire>,
}

impl Circuit {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_wires(wires: Vec<Wire>) -> Result<Self, CircuitError> {
        let mut circuit = Self::new();
        for wire in wires {
            match wire.gate {
                None => {
                    circuit.add_input();
                }
                Some(name) => {
                    circuit.add_gate(name, &wire.inputs)?;
                }
            }
        }
        Ok(circuit)
    }

    pub fn add_input(&mut self) -> WireId {
        self.wires.push(Wire {
            gate: None,
            inputs: vec![],
        });
        self.wires.len() - 1
    }

    pub fn add_gate(
        &mut self,
        name: impl Into<String>,
        inputs: &[WireId],
    ) -> Result<WireId, CircuitError> {
        let wire = self.wires.len();
        for &input in inputs {
            if input >= wire {
                return Err(CircuitError::WireOutOfRange { wire, input });
            }
        }
        self.wires.push(Wire {
            gate: Some(name.into()),
            inputs: inputs.to_vec(),
        });
        Ok(wire)
    }

    #[inline]
    pub fn nb_wires(&self) -> usize {
        self.wires.len()
    }

    #[inline]
    pub fn wire(&self, w: WireId) -> &Wire {
        &self.wires[w]
    }

    #[inline]
    pub fn wires(&self) -> &[Wire] {
        &self.wires
    }

    pub fn input_wires(&self) -> impl Iterator<Item = WireId> + '_ {
        self.wires
            .iter()
            .enumerate()
            .filter(|(_, w)| w.is_input())
            .map(|(i, _)| i)
    }

    /// The distinct input wires of `w`, in first-occurrence order. A gate
    /// consuming the same wire twice opens it once.
    pub fn unique_inputs(&self, w: WireId) -> Vec<WireId> {
        self.wires[w].inputs.iter().copied().unique().collect()
    }

    /// For each wire, how many distinct wires consume it.
    pub fn unique_consumer_counts(&self) -> Vec<usize> {
        let mut counts = vec![0usize; self.wires.len()];
        for w in 0..self.wires.len() {
            for input in self.unique_inputs(w) {
                counts[input] += 1;
            }
        }
        counts
    }

    /// Output wires: no wire consumes them. These are the wires whose values
    /// cross back into the outer circuit.
    pub fn output_wires(&self) -> Vec<WireId> {
        self.unique_consumer_counts()
            .iter()
            .enumerate()
            .filter(|(_, &c)| c == 0)
            .map(|(w, _)| w)
            .collect()
    }

    /// Resolve every gate wire against a registry, checking existence and
    /// arity. This is the point where an unregistered gate name surfaces.
    pub fn resolve<R: Ring>(
        &self,
        registry: &GateRegistry<R>,
    ) -> Result<Vec<Option<Arc<Gate<R>>>>, CircuitError> {
        self.wires
            .iter()
            .enumerate()
            .map(|(w, wire)| match &wire.gate {
                None => Ok(None),
                Some(name) => {
                    let gate = registry
                        .get(name)
                        .map_err(|source| CircuitError::Gate { wire: w, source })?;
                    if gate.arity() != wire.inputs.len() {
                        return Err(CircuitError::ArityMismatch {
                            wire: w,
                            name: name.clone(),
                            expected: gate.arity(),
                            got: wire.inputs.len(),
                        });
                    }
                    Ok(Some(Arc::clone(gate)))
                }
            })
            .collect()
    }

    /// Largest gate arity, for sizing evaluation scratch buffers.
    pub fn max_arity(&self) -> usize {
        self.wires
            .iter()
            .map(|w| w.inputs.len())
            .max()
            .unwrap_or(0)
    }
}
