use circuit::{Circuit, CircuitError, Dependency, Wire};
use sha2::{Digest, Sha256};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DescriptorError {
    #[error("descriptor bytes are truncated")]
    Truncated,

    #[error("descriptor bytes are malformed")]
    Malformed,
}

/// Compact record of one embedded GKR circuit, registered with the outer
/// constraint system so its setup and verification keys pin the exact
/// circuit, hints and transcript hash that were used. Setup and proving must
/// see byte-identical descriptors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CircuitDescriptor {
    pub wires: Vec<Wire>,
    pub nb_instances: usize,
    pub dependencies: Vec<Dependency>,
    pub fs_hash_name: String,
    pub solve_hint_id: String,
    pub prove_hint_id: String,
}

impl CircuitDescriptor {
    /// Build the structural part at solve time; the Fiat-Shamir fields are
    /// filled by [`CircuitDescriptor::finalize`] when verification begins.
    pub fn new(circuit: &Circuit, nb_instances: usize, dependencies: Vec<Dependency>) -> Self {
        let mut descriptor = Self {
            wires: circuit.wires().to_vec(),
            nb_instances,
            dependencies,
            fs_hash_name: String::new(),
            solve_hint_id: String::new(),
            prove_hint_id: String::new(),
        };
        let digest = hex(&descriptor.structural_digest());
        descriptor.solve_hint_id = format!("gkr.solve.{digest}");
        descriptor
    }

    /// Pin the transcript hash and derive the prove-hint identity. The seed
    /// width participates: a prover fed a different number of initial
    /// challenges is a different hint.
    pub fn finalize(&mut self, fs_hash_name: &str, nb_seed_elems: usize) {
        self.fs_hash_name = fs_hash_name.to_string();
        let digest = hex(&self.structural_digest());
        self.prove_hint_id = format!("gkr.prove.{digest}.{fs_hash_name}.{nb_seed_elems}");
    }

    pub fn circuit(&self) -> Result<Circuit, CircuitError> {
        Circuit::from_wires(self.wires.clone())
    }

    fn write_structural(&self, out: &mut Vec<u8>) {
        write_usize(out, self.wires.len());
        for wire in &self.wires {
            match &wire.gate {
                None => out.push(0),
                Some(name) => {
                    out.push(1);
                    write_str(out, name);
                }
            }
            write_usize(out, wire.inputs.len());
            for &input in &wire.inputs {
                write_usize(out, input);
            }
        }
        write_usize(out, self.nb_instances);
        write_usize(out, self.dependencies.len());
        for dep in &self.dependencies {
            write_usize(out, dep.input_wire);
            write_usize(out, dep.input_instance);
            write_usize(out, dep.output_wire);
            write_usize(out, dep.output_instance);
        }
    }

    fn structural_digest(&self) -> [u8; 32] {
        let mut bytes = Vec::new();
        self.write_structural(&mut bytes);
        let mut hasher = Sha256::new();
        hasher.update(&bytes);
        hasher.finalize().into()
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        self.write_structural(&mut out);
        write_str(&mut out, &self.fs_hash_name);
        write_str(&mut out, &self.solve_hint_id);
        write_str(&mut out, &self.prove_hint_id);
        out
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, DescriptorError> {
        let mut cursor = Cursor { bytes, at: 0 };

        let nb_wires = cursor.read_usize()?;
        let mut wires = Vec::with_capacity(nb_wires.min(1 << 20));
        for _ in 0..nb_wires {
            let gate = match cursor.read_u8()? {
                0 => None,
                1 => Some(cursor.read_str()?),
                _ => return Err(DescriptorError::Malformed),
            };
            let nb_inputs = cursor.read_usize()?;
            let mut inputs = Vec::with_capacity(nb_inputs.min(1 << 20));
            for _ in 0..nb_inputs {
                inputs.push(cursor.read_usize()?);
            }
            wires.push(Wire { gate, inputs });
        }
        let nb_instances = cursor.read_usize()?;
        let nb_deps = cursor.read_usize()?;
        let mut dependencies = Vec::with_capacity(nb_deps.min(1 << 20));
        for _ in 0..nb_deps {
            dependencies.push(Dependency {
                input_wire: cursor.read_usize()?,
                input_instance: cursor.read_usize()?,
                output_wire: cursor.read_usize()?,
                output_instance: cursor.read_usize()?,
            });
        }
        let fs_hash_name = cursor.read_str()?;
        let solve_hint_id = cursor.read_str()?;
        let prove_hint_id = cursor.read_str()?;
        if cursor.at != bytes.len() {
            return Err(DescriptorError::Malformed);
        }

        Ok(Self {
            wires,
            nb_instances,
            dependencies,
            fs_hash_name,
            solve_hint_id,
            prove_hint_id,
        })
    }

    /// Digest of the full record, for setup/proving consistency checks.
    pub fn digest(&self) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update(self.to_bytes());
        hasher.finalize().into()
    }
}

fn write_usize(out: &mut Vec<u8>, v: usize) {
    out.extend_from_slice(&(v as u64).to_le_bytes());
}

fn write_str(out: &mut Vec<u8>, s: &str) {
    write_usize(out, s.len());
    out.extend_from_slice(s.as_bytes());
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

struct Cursor<'a> {
    bytes: &'a [u8],
    at: usize,
}

impl Cursor<'_> {
    fn read_u8(&mut self) -> Result<u8, DescriptorError> {
        let b = *self
            .bytes
            .get(self.at)
            .ok_or(DescriptorError::Truncated)?;
        self.at += 1;
        Ok(b)
    }

    fn read_usize(&mut self) -> Result<usize, DescriptorError> {
        let end = self.at.checked_add(8).ok_or(DescriptorError::Truncated)?;
        let slice = self
            .bytes
            .get(self.at..end)
            .ok_or(DescriptorError::Truncated)?;
        self.at = end;
        let v = u64::from_le_bytes(slice.try_into().expect("slice of length 8"));
        usize::try_from(v).map_err(|_| DescriptorError::Malformed)
    }

    fn read_str(&mut self) -> Result<String, DescriptorError> {
        let len = self.read_usize()?;
        let end = self.at.checked_add(len).ok_or(DescriptorError::Truncated)?;
        let slice = self
            .bytes
            .get(self.at..end)
            .ok_or(DescriptorError::Truncated)?;
        self.at = end;
        String::from_utf8(slice.to_vec()).map_err(|_| DescriptorError::Malformed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> CircuitDescriptor {
        let mut circuit = Circuit::new();
        let a = circuit.add_input();
        let b = circuit.add_input();
        let m = circuit.add_gate("mul", &[a, b]).unwrap();
        let deps = vec![Dependency {
            input_wire: a,
            input_instance: 1,
            output_wire: m,
            output_instance: 0,
        }];
        let mut descriptor = CircuitDescriptor::new(&circuit, 2, deps);
        descriptor.finalize("mimc", 1);
        descriptor
    }

    #[test]
    fn byte_round_trip_preserves_everything() {
        let descriptor = sample();
        let bytes = descriptor.to_bytes();
        let back = CircuitDescriptor::from_bytes(&bytes).unwrap();
        assert_eq!(back, descriptor);
        assert_eq!(back.digest(), descriptor.digest());
    }

    #[test]
    fn hint_identities_pin_the_structure_and_the_hash() {
        let descriptor = sample();
        assert!(descriptor.solve_hint_id.starts_with("gkr.solve."));
        assert!(descriptor.prove_hint_id.ends_with(".mimc.1"));

        let mut other = sample();
        other.finalize("poseidon2", 1);
        assert_eq!(other.solve_hint_id, descriptor.solve_hint_id);
        assert_ne!(other.prove_hint_id, descriptor.prove_hint_id);
        assert_ne!(other.digest(), descriptor.digest());
    }

    #[test]
    fn truncated_bytes_are_rejected() {
        let bytes = sample().to_bytes();
        assert!(CircuitDescriptor::from_bytes(&bytes[..bytes.len() - 1]).is_err());
    }
}
