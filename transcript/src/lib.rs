mod mimc;
pub use mimc::*;

mod registry;
pub use registry::*;

mod transcript;
pub use transcript::*;
