//! Environment-variable configuration helpers.
//!
//! Services read their configuration through a [`VarSource`] so that
//! production code uses the process environment while tests pass a map.

use std::collections::HashMap;
use std::fmt::Display;
use std::str::FromStr;

use thiserror::Error;

/// Environment parsing errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EnvError {
    /// Variable was set but could not be parsed
    #[error("Failed to parse environment variable {name}: {reason}")]
    Parse {
        /// Variable name
        name: String,
        /// Parser message
        reason: String,
    },
}

/// A source of configuration variables.
pub trait VarSource {
    /// Returns the raw value of `name`, if set.
    fn var(&self, name: &str) -> Option<String>;
}

/// The process environment, with `.env` support via [`load_dotenv`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl VarSource for ProcessEnv {
    fn var(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }
}

impl VarSource for HashMap<String, String> {
    fn var(&self, name: &str) -> Option<String> {
        self.get(name).cloned()
    }
}

impl VarSource for HashMap<&str, &str> {
    fn var(&self, name: &str) -> Option<String> {
        self.get(name).map(|v| (*v).to_string())
    }
}

/// Loads a `.env` file from the working directory if one exists.
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

/// Reads a variable, treating blank values as unset.
pub fn read_string(source: &dyn VarSource, name: &str) -> Option<String> {
    source
        .var(name)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Parses a variable, falling back to `default` when unset.
///
/// # Errors
///
/// Returns [`EnvError::Parse`] when the variable is set but malformed.
pub fn parse_or<T>(source: &dyn VarSource, name: &str, default: T) -> Result<T, EnvError>
where
    T: FromStr,
    T::Err: Display,
{
    match read_string(source, name) {
        Some(val) => val.parse().map_err(|e: T::Err| EnvError::Parse {
            name: name.to_string(),
            reason: e.to_string(),
        }),
        None => Ok(default),
    }
}

/// Parses a variable, falling back to `default` with a warning when the
/// value is malformed instead of failing.
pub fn parse_or_warn<T>(source: &dyn VarSource, name: &str, default: T) -> T
where
    T: FromStr + Display,
    T::Err: Display,
{
    let Some(val) = read_string(source, name) else {
        return default;
    };

    match val.parse() {
        Ok(parsed) => parsed,
        Err(e) => {
            tracing::warn!(
                variable = %name,
                reason = %e,
                default = %default,
                "unparseable configuration value, using default"
            );
            default
        }
    }
}
