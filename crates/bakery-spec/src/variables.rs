//! Layered variable resolution.
//!
//! Precedence is fixed: explicit override > process environment > document
//! default. An empty value at any layer means "unset" and falls through to
//! the next layer, so an operator can leave a field blank for environment
//! supply without propagating empty strings into generated names or tags.

use std::collections::BTreeMap;

use bakery_common::error::Result;

use crate::template;

/// Source of environment lookups consulted during resolution.
///
/// Production code uses [`ProcessEnv`]; tests inject a map so resolution
/// stays a pure function of (document, environment, overrides).
pub trait EnvSource {
    /// Returns the value of the named environment variable, if set.
    fn get(&self, name: &str) -> Option<String>;
}

/// [`EnvSource`] backed by the real process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl EnvSource for ProcessEnv {
    fn get(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }
}

impl EnvSource for BTreeMap<String, String> {
    fn get(&self, name: &str) -> Option<String> {
        BTreeMap::get(self, name).cloned()
    }
}

/// The variable set after all precedence layers have been merged.
///
/// Only variables that resolved to a non-empty value are present; a lookup
/// miss during expansion is what surfaces as `UnresolvedVariable`.
#[derive(Debug, Clone, Default)]
pub struct ResolvedVariables {
    values: BTreeMap<String, String>,
}

impl ResolvedVariables {
    /// Wraps an already-merged value map. Intended for tests.
    #[must_use]
    pub const fn from_values(values: BTreeMap<String, String>) -> Self {
        Self { values }
    }

    /// Returns the resolved value of a variable, if it has one.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

/// Merges the default, environment, and override layers.
///
/// Every declared variable is resolved to the first non-empty value among
/// its explicit override, an environment variable of the same name, and its
/// expanded document default. Overrides for undeclared names are kept as
/// well, so required-field backfill and ad-hoc `-var` supply both work.
///
/// # Errors
///
/// Returns an error if a document default contains anything other than
/// literals and `env` lookups.
pub fn resolve(
    defaults: &BTreeMap<String, String>,
    env: &dyn EnvSource,
    overrides: &BTreeMap<String, String>,
) -> Result<ResolvedVariables> {
    tracing::debug!(declared = defaults.len(), overrides = overrides.len(), "resolving variables");
    let mut values = BTreeMap::new();

    for (name, default) in defaults {
        let resolved = non_empty(overrides.get(name).cloned())
            .or_else(|| non_empty(env.get(name)));
        let resolved = match resolved {
            Some(v) => Some(v),
            None => non_empty(Some(template::expand_default(default, env, name)?)),
        };
        if let Some(value) = resolved {
            let _ = values.insert(name.clone(), value);
        }
    }

    for (name, value) in overrides {
        if !values.contains_key(name) && !value.is_empty() {
            let _ = values.insert(name.clone(), value.clone());
        }
    }

    Ok(ResolvedVariables { values })
}
