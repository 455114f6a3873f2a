//! Layered TOML configuration (user config, then project config) with
//! defaults applied last. Secrets never live in these files; they come from
//! the environment at startup.

mod loader;
mod types;

pub use loader::ConfigLoader;
pub use types::{AulaConfig, DEFAULT_HOST, DEFAULT_PORT};
