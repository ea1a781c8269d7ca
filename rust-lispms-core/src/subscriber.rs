//! Subscribers: requesters to be told when a mapping changes.

use rust_lispms_proto::{Eid, Rloc};
use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};
use std::time::{Duration, SystemTime};

/// Slack added on top of a record's TTL so a subscription outlives the
/// cache entry it fed.
pub const SUBSCRIPTION_TTL_SLACK: Duration = Duration::from_secs(10 * 60);

/// Subscription lifetime when the mapping carried no usable TTL.
pub const DEFAULT_SUBSCRIPTION_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// A device that asked about an EID and is owed a solicit on change.
///
/// Identity is the (locator, source-EID) pair; the expiry timestamp is
/// bookkeeping and takes no part in equality or hashing, so refreshing a
/// subscription replaces the old entry in a set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subscriber {
    pub rloc: Rloc,
    pub src_eid: Eid,
    expires_at: SystemTime,
}

impl Subscriber {
    pub fn new(rloc: Rloc, src_eid: Eid, record_ttl: Option<u32>) -> Self {
        Self {
            rloc,
            src_eid,
            expires_at: SystemTime::now() + Self::lifetime(record_ttl),
        }
    }

    fn lifetime(record_ttl: Option<u32>) -> Duration {
        match record_ttl {
            Some(ttl) if ttl > 0 && ttl < rust_lispms_proto::msg::TTL_INDEFINITE => {
                Duration::from_secs(u64::from(ttl)) + SUBSCRIPTION_TTL_SLACK
            }
            _ => DEFAULT_SUBSCRIPTION_TTL,
        }
    }

    pub fn has_expired(&self) -> bool {
        self.expires_at <= SystemTime::now()
    }

    /// Extend the subscription after answering this requester again.
    pub fn refresh(&mut self, record_ttl: Option<u32>) {
        self.expires_at = SystemTime::now() + Self::lifetime(record_ttl);
    }

    #[cfg(test)]
    pub(crate) fn expired_for_test(rloc: Rloc, src_eid: Eid) -> Self {
        Self {
            rloc,
            src_eid,
            expires_at: SystemTime::UNIX_EPOCH,
        }
    }
}

impl PartialEq for Subscriber {
    fn eq(&self, other: &Self) -> bool {
        self.rloc == other.rloc && self.src_eid == other.src_eid
    }
}

impl Eq for Subscriber {}

impl Hash for Subscriber {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.rloc.hash(state);
        self.src_eid.hash(state);
    }
}
