mod category;
mod signature;
mod validation;

pub use category::*;
pub use signature::*;
pub use validation::*;
