//! Section configuration

use serde::{Deserialize, Serialize};

/// Parallel section configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionConfig {
    /// Max concurrently executing items
    #[serde(rename = "concurrency-limit", default = "default_concurrency_limit")]
    pub concurrency_limit: usize,

    /// Spread dispatch across groups instead of draining one group first
    #[serde(rename = "fairness-across-groups", default = "default_fairness_across_groups")]
    pub fairness_across_groups: bool,
}

fn default_concurrency_limit() -> usize {
    4
}

fn default_fairness_across_groups() -> bool {
    true
}

impl Default for SectionConfig {
    fn default() -> Self {
        Self {
            concurrency_limit: default_concurrency_limit(),
            fairness_across_groups: default_fairness_across_groups(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SectionConfig::default();
        assert_eq!(config.concurrency_limit, 4);
        assert!(config.fairness_across_groups);
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let config: SectionConfig = serde_yaml::from_str("concurrency-limit: 7").unwrap();
        assert_eq!(config.concurrency_limit, 7);
        assert!(config.fairness_across_groups);
    }
}
