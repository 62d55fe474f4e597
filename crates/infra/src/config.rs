//! Planning configuration loaded from the environment.

use serde::{Deserialize, Serialize};

use bakeplan_catalog::DEFAULT_MAX_DEPTH;

use crate::recorder::ShortfallPolicy;

pub const MAX_NESTING_DEPTH_ENV: &str = "BAKEPLAN_MAX_NESTING_DEPTH";
pub const SHORTFALL_POLICY_ENV: &str = "BAKEPLAN_SHORTFALL_POLICY";

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanningConfig {
    /// Deepest assembly nesting a traversal may reach.
    pub max_nesting_depth: usize,
    /// Policy used when a recording request does not name one.
    pub shortfall_policy: ShortfallPolicy,
}

impl Default for PlanningConfig {
    fn default() -> Self {
        Self {
            max_nesting_depth: DEFAULT_MAX_DEPTH,
            shortfall_policy: ShortfallPolicy::Abort,
        }
    }
}

impl PlanningConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Unparseable values fall back to the
    /// default with a warning.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(raw) = lookup(MAX_NESTING_DEPTH_ENV) {
            match raw.trim().parse::<usize>() {
                Ok(depth) if depth > 0 => config.max_nesting_depth = depth,
                _ => tracing::warn!(
                    value = %raw,
                    default = config.max_nesting_depth,
                    "{MAX_NESTING_DEPTH_ENV} is not a positive integer; using default"
                ),
            }
        }

        if let Some(raw) = lookup(SHORTFALL_POLICY_ENV) {
            match raw.parse::<ShortfallPolicy>() {
                Ok(policy) => config.shortfall_policy = policy,
                Err(_) => tracing::warn!(
                    value = %raw,
                    default = %config.shortfall_policy,
                    "{SHORTFALL_POLICY_ENV} must be 'abort' or 'tolerate'; using default"
                ),
            }
        }

        config
    }

    pub fn with_max_nesting_depth(mut self, depth: usize) -> Self {
        self.max_nesting_depth = depth;
        self
    }

    pub fn with_shortfall_policy(mut self, policy: ShortfallPolicy) -> Self {
        self.shortfall_policy = policy;
        self
    }
}
