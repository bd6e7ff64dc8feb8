pub mod anomaly;
pub mod config;
pub mod error;
pub mod record;
pub mod relationship;
pub mod traits;
pub mod types;

pub use anomaly::*;
pub use config::*;
pub use error::*;
pub use record::*;
pub use relationship::*;
pub use traits::*;
pub use types::*;
