//! Credential store for the pipeline.
//!
//! Values come from the CI platform's secret store (surfaced here as
//! process environment variables) and are handed to exactly the step that
//! declares a binding. Output masking is the platform's job, not duplicated
//! here.

use std::collections::HashMap;
use std::fmt;

use crate::ci::workflow::EnvBinding;

/// Name-to-value map of resolved secrets.
#[derive(Default, Clone)]
pub struct SecretStore {
    values: HashMap<String, String>,
}

impl SecretStore {
    /// Source the named secrets from the process environment. Unset names
    /// are simply absent — resolution reports them per step.
    #[must_use]
    pub fn from_env<I>(names: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        let values = names
            .into_iter()
            .filter_map(|name| std::env::var(&name).ok().map(|value| (name, value)))
            .collect();
        Self { values }
    }

    /// Add a secret programmatically (tests, local runs).
    #[must_use]
    pub fn with(mut self, name: &str, value: &str) -> Self {
        self.values.insert(name.to_string(), value.to_string());
        self
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    /// Resolve a step's bindings into environment pairs. Missing secrets
    /// resolve to an empty value (matching the platform's behavior) and are
    /// returned separately so the caller can warn.
    #[must_use]
    pub fn resolve(&self, bindings: &[EnvBinding]) -> (Vec<(String, String)>, Vec<String>) {
        let mut envs = Vec::with_capacity(bindings.len());
        let mut missing = Vec::new();
        for binding in bindings {
            match self.get(&binding.secret) {
                Some(value) => envs.push((binding.name.clone(), value.to_string())),
                None => {
                    missing.push(binding.secret.clone());
                    envs.push((binding.name.clone(), String::new()));
                }
            }
        }
        (envs, missing)
    }
}

impl fmt::Debug for SecretStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecretStore({} entries)", self.values.len())
    }
}
