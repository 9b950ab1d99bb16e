mod gates;
pub use gates::*;

mod circuit;
pub use circuit::*;

mod topology;
pub use topology::*;

mod solver;
pub use solver::*;
