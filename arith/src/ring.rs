use std::fmt::Debug;
use std::marker::PhantomData;

use ark_ff::{One, PrimeField, Zero};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RingError {
    /// An equality assertion did not hold. Deliberately carries no detail.
    #[error("assertion unsatisfied")]
    Unsatisfied,
}

/// Arithmetic capability over which gates, the transcript and the verifier
/// are written.
///
/// Two kinds of implementations exist: [`NativeRing`] evaluates directly over
/// a prime field, while an outer constraint builder implements the trait over
/// its own variable type so that the same code emits constraints instead of
/// values. Methods take `&mut self` because symbolic rings allocate.
pub trait Ring {
    /// The concrete scalar field every element reduces to at witness time.
    type Base: PrimeField;
    type Elem: Clone + Debug + 'static;

    fn constant(&mut self, value: Self::Base) -> Self::Elem;
    fn add(&mut self, a: &Self::Elem, b: &Self::Elem) -> Self::Elem;
    fn sub(&mut self, a: &Self::Elem, b: &Self::Elem) -> Self::Elem;
    fn mul(&mut self, a: &Self::Elem, b: &Self::Elem) -> Self::Elem;
    fn neg(&mut self, a: &Self::Elem) -> Self::Elem;

    /// Assert equality of two elements. Native rings compare and fail fast;
    /// symbolic rings add a constraint and always succeed here.
    fn assert_eq(&mut self, a: &Self::Elem, b: &Self::Elem) -> Result<(), RingError>;

    #[inline]
    fn zero(&mut self) -> Self::Elem {
        self.constant(Self::Base::zero())
    }

    #[inline]
    fn one(&mut self) -> Self::Elem {
        self.constant(Self::Base::one())
    }

    /// a * b + c
    #[inline]
    fn mul_add(&mut self, a: &Self::Elem, b: &Self::Elem, c: &Self::Elem) -> Self::Elem {
        let ab = self.mul(a, b);
        self.add(&ab, c)
    }
}

/// The trivial ring: elements are field values, operations are field
/// operations, assertions are comparisons.
#[derive(Debug, Clone, Default)]
pub struct NativeRing<F: PrimeField>(PhantomData<F>);

impl<F: PrimeField> NativeRing<F> {
    #[inline]
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

impl<F: PrimeField> Ring for NativeRing<F> {
    type Base = F;
    type Elem = F;

    #[inline]
    fn constant(&mut self, value: F) -> F {
        value
    }

    #[inline]
    fn add(&mut self, a: &F, b: &F) -> F {
        *a + b
    }

    #[inline]
    fn sub(&mut self, a: &F, b: &F) -> F {
        *a - b
    }

    #[inline]
    fn mul(&mut self, a: &F, b: &F) -> F {
        *a * b
    }

    #[inline]
    fn neg(&mut self, a: &F) -> F {
        -*a
    }

    #[inline]
    fn assert_eq(&mut self, a: &F, b: &F) -> Result<(), RingError> {
        if a == b {
            Ok(())
        } else {
            Err(RingError::Unsatisfied)
        }
    }
}
