use std::collections::HashMap;
use std::fmt;

use arith::Ring;
use thiserror::Error;

use crate::MimcSponge;

#[derive(Debug, Error)]
pub enum HashError {
    #[error("hash `{0}` is not registered for Fiat-Shamir")]
    Unknown(String),

    #[error("hash `{0}` is already registered")]
    Duplicate(String),
}

/// Stateful sponge over ring elements, consumed by the transcript.
pub trait RingSponge<R: Ring> {
    fn update(&mut self, ring: &mut R, elems: &[R::Elem]);
    fn squeeze(&mut self, ring: &mut R) -> R::Elem;
}

pub type SpongeFactory<R> = Box<dyn Fn(&mut R) -> Box<dyn RingSponge<R>> + Send + Sync>;

/// Named Fiat-Shamir sponges. Like the gate registry this is an explicit
/// value: populated at setup, read-only afterwards.
pub struct HashRegistry<R: Ring> {
    sponges: HashMap<String, SpongeFactory<R>>,
}

impl<R: Ring> fmt::Debug for HashRegistry<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HashRegistry")
            .field("sponges", &self.sponges.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl<R: Ring> Default for HashRegistry<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Ring> HashRegistry<R> {
    pub fn new() -> Self {
        Self {
            sponges: HashMap::new(),
        }
    }

    /// A registry with the built-in `"mimc"` sponge.
    pub fn with_defaults() -> Self
    where
        R: 'static,
    {
        let mut registry = Self::new();
        registry
            .register("mimc", Box::new(|ring| Box::new(MimcSponge::new(ring))))
            .expect("fresh registry cannot collide");
        registry
    }

    pub fn register(&mut self, name: &str, factory: SpongeFactory<R>) -> Result<(), HashError> {
        if self.sponges.contains_key(name) {
            return Err(HashError::Duplicate(name.to_string()));
        }
        self.sponges.insert(name.to_string(), factory);
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.sponges.contains_key(name)
    }

    pub fn sponge(&self, name: &str, ring: &mut R) -> Result<Box<dyn RingSponge<R>>, HashError> {
        let factory = self
            .sponges
            .get(name)
            .ok_or_else(|| HashError::Unknown(name.to_string()))?;
        Ok(factory(ring))
    }
}
