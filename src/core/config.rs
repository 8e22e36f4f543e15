//! Kernel configuration with documented defaults
//!
//! Every knob that trades memory for speed lives here. Scenario files embed
//! this struct under a `[config]` table; omitted fields take the defaults.

use serde::{Deserialize, Serialize};

/// How an entity→members relation is indexed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReverseIndexPolicy {
    /// No reverse index; membership queries scan every live person
    None,
    /// One vector of members per entity
    #[default]
    Array,
    /// One hash set of members per entity
    Hash,
}

/// Configuration for the kernel's storage and delivery policies
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KernelConfig {
    // === MEMBERSHIP INDICES ===
    /// Reverse index for region → people
    ///
    /// `None` saves one entry per person but turns every "people in region"
    /// query into a scan of the whole population. Counters are kept either way.
    pub region_members: ReverseIndexPolicy,

    /// Reverse index for compartment → people
    pub compartment_members: ReverseIndexPolicy,

    /// Reverse index for group → people
    ///
    /// The person → groups direction is always stored. With `Array`, leaving
    /// a large group costs a linear search of that group's members; `Hash`
    /// makes removal O(1) at roughly 2x the memory.
    pub group_members: ReverseIndexPolicy,

    // === ARRIVAL TIMES ===
    /// Record the time each person entered their current region
    pub track_region_arrival: bool,

    /// Record the time each person entered their current compartment
    pub track_compartment_arrival: bool,

    // === NOTIFICATION QUEUE ===
    /// High-water mark above which the notification queue's storage is
    /// released once it drains
    ///
    /// A single turn can enqueue a very large burst (mass property writes).
    /// Without shrinking, that peak capacity would be held for the rest of
    /// the run. Below the threshold the storage is simply reused.
    pub notification_shrink_threshold: usize,

    // === SAMPLING ===
    /// Seed for the kernel's random stream
    ///
    /// All sampling draws from one `ChaCha8Rng`, so a run is reproducible
    /// given the scenario, the seed and the order of component calls.
    pub seed: u64,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            region_members: ReverseIndexPolicy::Array,
            compartment_members: ReverseIndexPolicy::Array,
            group_members: ReverseIndexPolicy::Array,
            track_region_arrival: false,
            track_compartment_arrival: false,
            notification_shrink_threshold: 100,
            seed: 12345,
        }
    }
}

impl KernelConfig {
    /// Create a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate configuration for internal consistency
    pub fn validate(&self) -> Result<(), String> {
        if self.notification_shrink_threshold == 0 {
            return Err("notification_shrink_threshold must be at least 1".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(KernelConfig::default().validate().is_ok());
    }

    #[test]
    fn test_zero_threshold_rejected() {
        let config = KernelConfig {
            notification_shrink_threshold: 0,
            ..KernelConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: KernelConfig = toml::from_str(
            r#"
            region_members = "hash"
            track_region_arrival = true
            "#,
        )
        .unwrap();
        assert_eq!(config.region_members, ReverseIndexPolicy::Hash);
        assert_eq!(config.compartment_members, ReverseIndexPolicy::Array);
        assert!(config.track_region_arrival);
        assert_eq!(config.notification_shrink_threshold, 100);
    }
}
