//! Experiment metadata supplied by the caller.
//!
//! Metadata arrives as a structured record produced by an external parsing
//! step (natural-language extraction is out of scope here). It names the
//! experiment, describes it, lists the named parameters with their meanings,
//! the variables to vary, and the objective.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Structured description of a computational experiment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExperimentMetadata {
    /// Designated name, e.g. "Pendulum period"
    pub name: String,

    /// Free-text description of what the simulation should compute
    pub description: String,

    /// Named parameters with human-readable descriptions
    #[serde(default)]
    pub parameters: BTreeMap<String, String>,

    /// Parameter names the caller intends to vary across runs
    #[serde(default)]
    pub vary: Vec<String>,

    /// What the experiment is trying to measure or optimize
    #[serde(default)]
    pub objective: String,
}

impl ExperimentMetadata {
    /// Filesystem- and id-safe slug derived from the designated name.
    ///
    /// Lowercases, maps every non-alphanumeric run to a single underscore,
    /// and trims leading/trailing underscores. "Pendulum period (v2)"
    /// becomes "pendulum_period_v2".
    pub fn slug(&self) -> String {
        let mut slug = String::with_capacity(self.name.len());
        let mut last_was_sep = true;
        for ch in self.name.chars() {
            if ch.is_ascii_alphanumeric() {
                slug.push(ch.to_ascii_lowercase());
                last_was_sep = false;
            } else if !last_was_sep {
                slug.push('_');
                last_was_sep = true;
            }
        }
        while slug.ends_with('_') {
            slug.pop();
        }
        if slug.is_empty() {
            slug.push_str("experiment");
        }
        slug
    }
}
