pub mod detector;
pub mod digest;
pub mod model;

pub use detector::*;
pub use digest::*;
pub use model::*;
