use serde::{Deserialize, Serialize};

/// Configuration for a patch
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PatchConfig {
    /// Maximum nesting of propagation hops before a chain is failed
    pub max_propagation_depth: usize,
    /// Capacity of the port event broadcast channel
    pub event_buffer_size: usize,
}

impl Default for PatchConfig {
    fn default() -> Self {
        Self {
            max_propagation_depth: 256,
            event_buffer_size: 1000,
        }
    }
}

impl PatchConfig {
    pub fn with_max_propagation_depth(mut self, depth: usize) -> Self {
        self.max_propagation_depth = depth;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: PatchConfig = serde_json::from_str(r#"{"max_propagation_depth": 8}"#).unwrap();
        assert_eq!(config.max_propagation_depth, 8);
        assert_eq!(config.event_buffer_size, 1000);
    }
}
