//! Runtime configuration for the mapping service.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Where a lookup searches when both northbound (operator-provisioned) and
/// southbound (device-registered) mappings exist for a prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LookupPolicy {
    /// Northbound wins outright when present.
    NbFirst,
    /// Northbound is returned only if consistent with southbound; the
    /// intersection of the two is computed otherwise.
    NbAndSb,
}

/// How explicit locator paths in a mapping are rendered into replies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ElpPolicy {
    /// Leave ELP locators as registered.
    Default,
    /// Replace each ELP locator with its last usable hop.
    Replace,
    /// Keep the ELP locator and append its last hop as an extra locator.
    Both,
}

/// Configuration knobs of the mapping service.
///
/// Merge mode and subscription tracking are global switches: flipping them
/// changes registration and lookup behavior for every prefix.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MappingServiceConfig {
    /// Merge registrations from multiple devices into one mapping, keyed by
    /// xTR-ID, instead of last-writer-wins.
    pub mapping_merge: bool,
    /// Track which requesters were told about each mapping and notify them
    /// on change.
    pub subscriptions: bool,
    /// Widen lookups by iterating candidate mask lengths instead of a
    /// single exact-prefix probe.
    pub iterate_mask: bool,
    pub lookup_policy: LookupPolicy,
    /// Attempts per subscriber when soliciting a re-request after a change.
    pub smr_retry_count: u32,
    /// Delay between those attempts.
    pub smr_timeout: Duration,
    pub elp_policy: ElpPolicy,
    /// TTL put on negative ("no mapping here") answers.
    pub negative_mapping_ttl: Duration,
    /// How long a device registration stays valid without a refresh.
    pub registration_validity: Duration,
}

impl Default for MappingServiceConfig {
    fn default() -> Self {
        Self {
            mapping_merge: false,
            subscriptions: true,
            iterate_mask: true,
            lookup_policy: LookupPolicy::NbFirst,
            smr_retry_count: 5,
            smr_timeout: Duration::from_secs(3),
            elp_policy: ElpPolicy::Default,
            negative_mapping_ttl: Duration::from_secs(15 * 60),
            registration_validity: Duration::from_secs(200),
        }
    }
}

impl MappingServiceConfig {
    pub fn with_merge(mut self, merge: bool) -> Self {
        self.mapping_merge = merge;
        self
    }

    pub fn with_subscriptions(mut self, subscriptions: bool) -> Self {
        self.subscriptions = subscriptions;
        self
    }

    pub fn with_lookup_policy(mut self, policy: LookupPolicy) -> Self {
        self.lookup_policy = policy;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = MappingServiceConfig::default();
        assert!(!config.mapping_merge);
        assert!(config.subscriptions);
        assert!(config.iterate_mask);
        assert_eq!(config.lookup_policy, LookupPolicy::NbFirst);
        assert_eq!(config.smr_retry_count, 5);
        assert_eq!(config.negative_mapping_ttl, Duration::from_secs(900));
    }

    #[test]
    fn builder_style_overrides() {
        let config = MappingServiceConfig::default()
            .with_merge(true)
            .with_lookup_policy(LookupPolicy::NbAndSb);
        assert!(config.mapping_merge);
        assert_eq!(config.lookup_policy, LookupPolicy::NbAndSb);
    }
}
