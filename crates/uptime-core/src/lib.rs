pub mod config;
pub mod env;
pub mod types;

pub use config::{DEFAULT_LIFECYCLE_POLICY, LifecyclePolicy, UptimeConfig};
pub use env::is_development;
pub use types::*;
