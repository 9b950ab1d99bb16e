use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use arith::{NativeRing, Ring};
use ark_ff::{PrimeField, UniformRand};
use rand::SeedableRng;
use rand_chacha::ChaCha12Rng;
use thiserror::Error;

/// Largest polynomial degree the auto-detection probes for.
pub const MAX_AUTO_DEGREE: usize = 32;

const DETECTION_SEED: u64 = 0x676b_7267_6174_6573;
const SOLVABLE_SAMPLES: usize = 8;

pub type EvalFn<R> = Box<dyn Fn(&mut R, &[<R as Ring>::Elem]) -> <R as Ring>::Elem + Send + Sync>;

#[derive(Debug, Error)]
pub enum GateError {
    #[error("gate `{0}` is already registered")]
    Duplicate(String),

    #[error("gate `{0}` is not registered")]
    Unknown(String),

    #[error("gate `{0}` must take at least one input")]
    NoInputs(String),

    #[error("gate `{name}` evaluates to a constant")]
    ConstantGate { name: String },

    #[error("no degree <= {cap} fits gate `{name}`")]
    DegreeNotDetected { name: String, cap: usize },

    #[error("gate `{name}` was registered with degree {claimed} but evaluates with degree {detected}")]
    DegreeMismatch {
        name: String,
        claimed: usize,
        detected: usize,
    },

    #[error("input {var} of gate `{name}` cannot be recovered from the output and the other inputs")]
    NotSolvable { name: String, var: usize },

    #[error("gate `{name}` needs a pinned degree in a symbolic registry")]
    MissingDegree { name: String },
}

/// A fixed-arity polynomial function over a ring, identified by name.
pub struct Gate<R: Ring> {
    name: String,
    eval: EvalFn<R>,
    arity: usize,
    degree: usize,
    solvable_var: Option<usize>,
}

impl<R: Ring> Gate<R> {
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn arity(&self) -> usize {
        self.arity
    }

    /// Total degree of the gate polynomial.
    #[inline]
    pub fn degree(&self) -> usize {
        self.degree
    }

    /// Index of an input that is uniquely determined by the output and the
    /// remaining inputs, if one was registered.
    #[inline]
    pub fn solvable_var(&self) -> Option<usize> {
        self.solvable_var
    }

    #[inline]
    pub fn evaluate(&self, ring: &mut R, inputs: &[R::Elem]) -> R::Elem {
        debug_assert_eq!(inputs.len(), self.arity);
        (self.eval)(ring, inputs)
    }
}

impl<R: Ring> fmt::Debug for Gate<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Gate")
            .field("name", &self.name)
            .field("arity", &self.arity)
            .field("degree", &self.degree)
            .field("solvable_var", &self.solvable_var)
            .finish()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct GateOptions {
    /// Pin the degree instead of detecting it. Mandatory in symbolic
    /// registries, verified in native ones.
    pub degree: Option<usize>,
    /// Declare an input recoverable from the output and the other inputs.
    /// Verified in native registries.
    pub solvable_var: Option<usize>,
}

/// Insert-only table of gates, shared read-only while solving and proving.
///
/// Registration takes `&mut self`, lookups take `&self`; holding the registry
/// in an `Arc` after setup gives the concurrent-read / serialized-write
/// discipline without a lock.
pub struct GateRegistry<R: Ring> {
    gates: HashMap<String, Arc<Gate<R>>>,
}

impl<R: Ring> fmt::Debug for GateRegistry<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GateRegistry")
            .field("gates", &self.gates)
            .finish()
    }
}

impl<R: Ring> Default for GateRegistry<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Ring> GateRegistry<R> {
    pub fn new() -> Self {
        Self {
            gates: HashMap::new(),
        }
    }

    /// A registry pre-populated with the built-in gates.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry
            .register_defaults()
            .expect("fresh registry cannot collide");
        registry
    }

    pub fn get(&self, name: &str) -> Result<&Arc<Gate<R>>, GateError> {
        self.gates
            .get(name)
            .ok_or_else(|| GateError::Unknown(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.gates.contains_key(name)
    }

    /// Register a gate whose degree is pinned by the caller. This is the only
    /// registration path for symbolic rings, which cannot be probed.
    pub fn register(
        &mut self,
        name: &str,
        arity: usize,
        options: GateOptions,
        eval: EvalFn<R>,
    ) -> Result<(), GateError> {
        let degree = options.degree.ok_or_else(|| GateError::MissingDegree {
            name: name.to_string(),
        })?;
        self.insert(name, arity, degree, options.solvable_var, eval)
    }

    /// identity / neg / add / sub / mul / square, with their known degrees.
    /// One generic body, so native and symbolic registries cannot drift.
    pub fn register_defaults(&mut self) -> Result<(), GateError> {
        let linear = |solvable| GateOptions {
            degree: Some(1),
            solvable_var: Some(solvable),
        };
        let quadratic = GateOptions {
            degree: Some(2),
            solvable_var: None,
        };

        self.register("identity", 1, linear(0), Box::new(|_, xs| xs[0].clone()))?;
        self.register("neg", 1, linear(0), Box::new(|ring, xs| ring.neg(&xs[0])))?;
        self.register(
            "add",
            2,
            linear(0),
            Box::new(|ring, xs| ring.add(&xs[0], &xs[1])),
        )?;
        self.register(
            "sub",
            2,
            linear(0),
            Box::new(|ring, xs| ring.sub(&xs[0], &xs[1])),
        )?;
        self.register(
            "mul",
            2,
            quadratic,
            Box::new(|ring, xs| ring.mul(&xs[0], &xs[1])),
        )?;
        self.register(
            "square",
            1,
            quadratic,
            Box::new(|ring, xs| ring.mul(&xs[0], &xs[0])),
        )?;
        Ok(())
    }

    fn insert(
        &mut self,
        name: &str,
        arity: usize,
        degree: usize,
        solvable_var: Option<usize>,
        eval: EvalFn<R>,
    ) -> Result<(), GateError> {
        if arity == 0 {
            return Err(GateError::NoInputs(name.to_string()));
        }
        if self.gates.contains_key(name) {
            return Err(GateError::Duplicate(name.to_string()));
        }
        self.gates.insert(
            name.to_string(),
            Arc::new(Gate {
                name: name.to_string(),
                eval,
                arity,
                degree,
                solvable_var,
            }),
        );
        Ok(())
    }
}

impl<F: PrimeField> GateRegistry<NativeRing<F>> {
    /// Register a gate over the native field, detecting (or verifying) its
    /// degree and verifying a declared solvable variable by random probing.
    pub fn register_auto(
        &mut self,
        name: &str,
        arity: usize,
        options: GateOptions,
        eval: EvalFn<NativeRing<F>>,
    ) -> Result<(), GateError> {
        if arity == 0 {
            return Err(GateError::NoInputs(name.to_string()));
        }
        if self.gates.contains_key(name) {
            return Err(GateError::Duplicate(name.to_string()));
        }

        // deterministic probing: registration must not depend on ambient state
        let mut rng = ChaCha12Rng::seed_from_u64(DETECTION_SEED);

        let detected = detect_degree(name, &eval, arity, &mut rng)?;
        if let Some(claimed) = options.degree {
            if claimed != detected {
                return Err(GateError::DegreeMismatch {
                    name: name.to_string(),
                    claimed,
                    detected,
                });
            }
        }
        if let Some(var) = options.solvable_var {
            verify_solvable(name, &eval, arity, var, &mut rng)?;
        }

        self.insert(name, arity, detected, options.solvable_var, eval)
    }
}

/// Probe the gate along two random affine lines and take finite differences
/// until they vanish. The restriction of a total-degree-d polynomial to a
/// random line has degree d except with negligible probability.
fn detect_degree<F: PrimeField>(
    name: &str,
    eval: &EvalFn<NativeRing<F>>,
    arity: usize,
    rng: &mut ChaCha12Rng,
) -> Result<usize, GateError> {
    let mut ring = NativeRing::<F>::new();
    let mut detected = 0usize;

    for _ in 0..2 {
        let base: Vec<F> = (0..arity).map(|_| F::rand(rng)).collect();
        let dir: Vec<F> = (0..arity).map(|_| F::rand(rng)).collect();

        let mut diffs: Vec<F> = (0..MAX_AUTO_DEGREE + 2)
            .map(|t| {
                let t = F::from(t as u64);
                let point: Vec<F> = base
                    .iter()
                    .zip(dir.iter())
                    .map(|(b, d)| *b + t * d)
                    .collect();
                eval(&mut ring, &point)
            })
            .collect();

        let mut order = 0usize;
        while !diffs.iter().all(|v| v.is_zero()) {
            order += 1;
            if order > MAX_AUTO_DEGREE + 1 {
                return Err(GateError::DegreeNotDetected {
                    name: name.to_string(),
                    cap: MAX_AUTO_DEGREE,
                });
            }
            diffs = diffs.windows(2).map(|w| w[1] - w[0]).collect();
        }
        detected = detected.max(order.saturating_sub(1));
    }

    if detected == 0 {
        return Err(GateError::ConstantGate {
            name: name.to_string(),
        });
    }
    Ok(detected)
}

/// An input is solvable when the gate is affine in it with one fixed nonzero
/// slope: then output and remaining inputs determine it uniquely.
fn verify_solvable<F: PrimeField>(
    name: &str,
    eval: &EvalFn<NativeRing<F>>,
    arity: usize,
    var: usize,
    rng: &mut ChaCha12Rng,
) -> Result<(), GateError> {
    let fail = || GateError::NotSolvable {
        name: name.to_string(),
        var,
    };
    if var >= arity {
        return Err(fail());
    }

    let mut ring = NativeRing::<F>::new();
    let mut slope: Option<F> = None;

    for _ in 0..SOLVABLE_SAMPLES {
        let mut point: Vec<F> = (0..arity).map(|_| F::rand(rng)).collect();
        let f0 = eval(&mut ring, &point);
        point[var] += F::one();
        let f1 = eval(&mut ring, &point);
        point[var] += F::one();
        let f2 = eval(&mut ring, &point);

        let d1 = f1 - f0;
        if f2 - f1 != d1 {
            return Err(fail());
        }
        match slope {
            None => slope = Some(d1),
            Some(s) if s != d1 => return Err(fail()),
            Some(_) => {}
        }
    }

    match slope {
        Some(s) if !s.is_zero() => Ok(()),
        _ => Err(fail()),
    }
}

#[cfg(test)]
mod tests {
    use ark_bn254::Fr;

    use super::*;

    fn native() -> GateRegistry<NativeRing<Fr>> {
        GateRegistry::with_defaults()
    }

    #[test]
    fn defaults_are_registered_with_expected_metadata() {
        let registry = native();
        for (name, arity, degree, solvable) in [
            ("identity", 1, 1, Some(0)),
            ("add", 2, 1, Some(0)),
            ("sub", 2, 1, Some(0)),
            ("neg", 1, 1, Some(0)),
            ("mul", 2, 2, None),
            ("square", 1, 2, None),
        ] {
            let gate = registry.get(name).unwrap();
            assert_eq!(gate.arity(), arity, "{name}");
            assert_eq!(gate.degree(), degree, "{name}");
            assert_eq!(gate.solvable_var(), solvable, "{name}");
        }
    }

    #[test]
    fn degree_detection_finds_high_degrees() {
        let mut registry = native();
        registry
            .register_auto(
                "pow5",
                1,
                GateOptions::default(),
                Box::new(|ring, xs| {
                    let x2 = ring.mul(&xs[0], &xs[0]);
                    let x4 = ring.mul(&x2, &x2);
                    ring.mul(&x4, &xs[0])
                }),
            )
            .unwrap();
        assert_eq!(registry.get("pow5").unwrap().degree(), 5);
    }

    #[test]
    fn degree_above_cap_fails_loudly() {
        let mut registry = native();
        let err = registry
            .register_auto(
                "pow33",
                1,
                GateOptions::default(),
                Box::new(|ring, xs| {
                    let mut acc = xs[0];
                    for _ in 0..32 {
                        acc = ring.mul(&acc, &xs[0]);
                    }
                    acc
                }),
            )
            .unwrap_err();
        assert!(matches!(err, GateError::DegreeNotDetected { .. }));
    }

    #[test]
    fn pinned_degree_is_verified() {
        let mut registry = native();
        let err = registry
            .register_auto(
                "not-cubic",
                2,
                GateOptions {
                    degree: Some(3),
                    solvable_var: None,
                },
                Box::new(|ring, xs| ring.mul(&xs[0], &xs[1])),
            )
            .unwrap_err();
        assert!(matches!(
            err,
            GateError::DegreeMismatch {
                claimed: 3,
                detected: 2,
                ..
            }
        ));
    }

    #[test]
    fn mul_inputs_are_not_solvable() {
        let mut registry = native();
        let err = registry
            .register_auto(
                "mul-solvable",
                2,
                GateOptions {
                    degree: None,
                    solvable_var: Some(0),
                },
                Box::new(|ring, xs| ring.mul(&xs[0], &xs[1])),
            )
            .unwrap_err();
        assert!(matches!(err, GateError::NotSolvable { var: 0, .. }));
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let mut registry = native();
        let err = registry
            .register_auto(
                "mul",
                2,
                GateOptions::default(),
                Box::new(|ring, xs| ring.mul(&xs[0], &xs[1])),
            )
            .unwrap_err();
        assert!(matches!(err, GateError::Duplicate(_)));
    }

    #[test]
    fn constant_gate_is_rejected() {
        let mut registry = native();
        let err = registry
            .register_auto(
                "const-one",
                1,
                GateOptions::default(),
                Box::new(|ring, _| ring.one()),
            )
            .unwrap_err();
        assert!(matches!(err, GateError::ConstantGate { .. }));
    }
}
