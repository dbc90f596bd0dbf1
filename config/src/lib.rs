//! Env and TOML configuration for Cadenza.
//!
//! Precedence: environment variables override the TOML file
//! (`~/.cadenza/config.toml` by default), which overrides built-in defaults.
//! `.env` is loaded once via [`load_env`] before reading the environment.

mod settings;

pub use settings::{ConfigError, Settings, DEFAULT_MODEL};

/// Loads `.env` from the current directory into the process environment.
/// Missing file is not an error; existing variables are never overwritten.
pub fn load_env() {
    let _ = dotenv::dotenv();
}
