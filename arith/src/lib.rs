mod ring;
pub use ring::*;

mod mle;
pub use mle::*;

mod eq;
pub use eq::*;

mod univariate;
pub use univariate::*;
