pub mod analyzer;
pub mod builder;
pub mod graph;
pub mod posture;

pub use analyzer::*;
pub use builder::*;
pub use graph::*;
pub use posture::*;
