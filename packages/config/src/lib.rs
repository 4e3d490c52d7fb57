// ABOUTME: Configuration helpers shared by the Hill binaries
// ABOUTME: Environment variable names, defaults, and strict parsing

pub mod constants;
pub mod env;

pub use env::{env_or, parse_env, parse_env_with_fallback, ConfigError};
