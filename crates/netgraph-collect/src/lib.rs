pub mod collectors;
pub mod manager;
pub mod provider;
pub mod rate_limit;
pub mod retry;

pub use collectors::*;
pub use manager::*;
pub use provider::*;
pub use rate_limit::*;
pub use retry::*;
