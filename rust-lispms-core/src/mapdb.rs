//! The in-memory mapping database.
//!
//! Longest-prefix-match storage of EID-to-locator-set bindings, plus the
//! authentication keys and subscriber interest sets hanging off the same
//! prefixes. Northbound (operator-provisioned) and southbound
//! (device-registered) mappings live in separate tables and can coexist
//! for one EID; the lookup policy decides how they combine.

use crate::config::LookupPolicy;
use crate::merge;
use crate::subscriber::Subscriber;
use log::debug;
use rust_lispms_proto::addr::{is_maskable, max_mask};
use rust_lispms_proto::auth::AuthKey;
use rust_lispms_proto::{Eid, MappingRecord, XtrId};
use std::collections::{HashMap, HashSet};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{Duration, SystemTime};

/// Who put a mapping into the database.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MappingOrigin {
    Northbound,
    Southbound,
}

/// A lookup hit.
///
/// `record` is a copy whose EID may have been rewritten to destination-only
/// form; `lookup_key` is the true stored key (possibly source-dest), which
/// is what subscriptions must attach to.
#[derive(Debug, Clone)]
pub struct MappingLookup {
    pub record: MappingRecord,
    pub lookup_key: Eid,
}

#[derive(Debug)]
struct MappingEntry {
    record: MappingRecord,
    /// Per-registrant records, populated only in merge mode.
    xtr_records: HashMap<XtrId, MappingRecord>,
}

impl MappingEntry {
    fn new(record: MappingRecord) -> Self {
        Self {
            record,
            xtr_records: HashMap::new(),
        }
    }
}

/// The database proper. Interior locking; all operations take `&self`.
pub struct MappingDb {
    iterate_mask: bool,
    registration_validity: Duration,
    northbound: RwLock<HashMap<Eid, MappingEntry>>,
    southbound: RwLock<HashMap<Eid, MappingEntry>>,
    /// Full source-dest keys grouped by their destination-only prefix, so a
    /// plain destination query can find them. Several sources may share one
    /// destination prefix.
    src_dst_index: RwLock<HashMap<Eid, HashSet<Eid>>>,
    auth_keys: RwLock<HashMap<Eid, AuthKey>>,
    subscribers: RwLock<HashMap<Eid, HashSet<Subscriber>>>,
}

// Poisoning only happens if a writer panicked; the data is still the best
// copy there is, so recover instead of propagating the panic.
fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|e| e.into_inner())
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|e| e.into_inner())
}

impl MappingDb {
    pub fn new(iterate_mask: bool, registration_validity: Duration) -> Self {
        Self {
            iterate_mask,
            registration_validity,
            northbound: RwLock::new(HashMap::new()),
            southbound: RwLock::new(HashMap::new()),
            src_dst_index: RwLock::new(HashMap::new()),
            auth_keys: RwLock::new(HashMap::new()),
            subscribers: RwLock::new(HashMap::new()),
        }
    }

    fn table(&self, origin: MappingOrigin) -> &RwLock<HashMap<Eid, MappingEntry>> {
        match origin {
            MappingOrigin::Northbound => &self.northbound,
            MappingOrigin::Southbound => &self.southbound,
        }
    }

    /* ------------------------------------------------------------ *
     * Mappings
     * ------------------------------------------------------------ */

    /// Store (or overwrite) a mapping. Per-registrant records for the key
    /// survive an overwrite; they are managed separately.
    pub fn add_mapping(&self, origin: MappingOrigin, record: MappingRecord) {
        let key = record.eid.normalized();
        debug!("storing {:?} mapping for {}", origin, key);
        if key.is_src_dst() {
            write(&self.src_dst_index)
                .entry(key.to_dst_only().normalized())
                .or_default()
                .insert(key.clone());
        }
        let mut table = write(self.table(origin));
        match table.get_mut(&key) {
            Some(entry) => entry.record = record,
            None => {
                table.insert(key, MappingEntry::new(record));
            }
        }
    }

    /// Exact fetch, no mask iteration, no rewriting.
    pub fn get_mapping_exact(&self, origin: MappingOrigin, eid: &Eid) -> Option<MappingRecord> {
        read(self.table(origin))
            .get(&eid.normalized())
            .map(|e| e.record.clone())
    }

    pub fn remove_mapping(&self, origin: MappingOrigin, eid: &Eid) {
        let key = eid.normalized();
        if key.is_src_dst() {
            // only this mapping's own index entry; siblings sharing the
            // destination prefix stay reachable
            let dst = key.to_dst_only().normalized();
            let mut index = write(&self.src_dst_index);
            if let Some(keys) = index.get_mut(&dst) {
                keys.remove(&key);
                if keys.is_empty() {
                    index.remove(&dst);
                }
            }
        }
        write(self.table(origin)).remove(&key);
    }

    /// Longest-prefix lookup combining both origins under `policy`.
    ///
    /// `src` participates only when the stored mapping is source-dest keyed:
    /// the stored source component must cover it.
    pub fn get_mapping(
        &self,
        src: Option<&Eid>,
        dst: &Eid,
        policy: LookupPolicy,
    ) -> Option<MappingLookup> {
        let nb = self.lookup_origin(MappingOrigin::Northbound, src, dst);
        let sb = self.lookup_origin(MappingOrigin::Southbound, src, dst);
        match policy {
            LookupPolicy::NbFirst => nb.or(sb),
            LookupPolicy::NbAndSb => match (nb, sb) {
                (Some(nb), Some(sb)) => {
                    let record = merge::compute_nb_sb_intersection(&nb.record, &sb.record);
                    let lookup_key = if sb.record.eid.dst_mask() > nb.record.eid.dst_mask() {
                        sb.lookup_key
                    } else {
                        nb.lookup_key
                    };
                    Some(MappingLookup { record, lookup_key })
                }
                (nb, sb) => nb.or(sb),
            },
        }
    }

    /// Lookup in one origin table, with mask iteration and the source-dest
    /// secondary index.
    pub fn lookup_origin(
        &self,
        origin: MappingOrigin,
        src: Option<&Eid>,
        dst: &Eid,
    ) -> Option<MappingLookup> {
        // A source-dest query probes its own full key first; on a miss the
        // query's own source component constrains the destination fallback.
        if dst.is_src_dst() {
            if let Some(hit) = self.probe(origin, &dst.normalized(), None) {
                return Some(hit);
            }
            let query_src = dst.src_component();
            return self.lookup_origin(origin, query_src.as_ref().or(src), &dst.to_dst_only());
        }

        if !is_maskable(&dst.addr) {
            return self.probe(origin, &dst.normalized(), src);
        }

        let start = dst.mask.unwrap_or_else(|| max_mask(&dst.addr));
        if !self.iterate_mask {
            return self.probe(origin, &dst.normalized_at(start), src);
        }
        for mask in (0..=start).rev() {
            if let Some(hit) = self.probe(origin, &dst.normalized_at(mask), src) {
                return Some(hit);
            }
        }
        None
    }

    /// One probe at one key: the plain table first, then the source-dest
    /// index for the same destination prefix. Among index entries whose
    /// source component covers the queried source, the most specific source
    /// wins.
    fn probe(&self, origin: MappingOrigin, key: &Eid, src: Option<&Eid>) -> Option<MappingLookup> {
        if let Some(record) = self.fetch_live(origin, key) {
            return Some(MappingLookup {
                record,
                lookup_key: key.clone(),
            });
        }
        let candidates: Vec<Eid> = match read(&self.src_dst_index).get(key) {
            Some(keys) => keys.iter().cloned().collect(),
            None => return None,
        };
        let mut best: Option<Eid> = None;
        for full_key in candidates {
            if !src_component_covers(&full_key, src) {
                continue;
            }
            if best
                .as_ref()
                .map_or(true, |b| src_mask_of(&full_key) > src_mask_of(b))
            {
                best = Some(full_key);
            }
        }
        let full_key = best?;
        let mut record = self.fetch_live(origin, &full_key)?;
        record.eid = full_key.to_dst_only();
        Some(MappingLookup {
            record,
            lookup_key: full_key,
        })
    }

    /// Fetch a record, dropping it first if its registration has lapsed.
    fn fetch_live(&self, origin: MappingOrigin, key: &Eid) -> Option<MappingRecord> {
        let expired = {
            let table = read(self.table(origin));
            let entry = table.get(key)?;
            origin == MappingOrigin::Southbound && self.is_lapsed(&entry.record)
        };
        if expired {
            debug!("registration for {} lapsed, dropping", key);
            write(self.table(origin)).remove(key);
            return None;
        }
        read(self.table(origin)).get(key).map(|e| e.record.clone())
    }

    fn is_lapsed(&self, record: &MappingRecord) -> bool {
        match record.timestamp {
            Some(ts) => ts + self.registration_validity <= SystemTime::now(),
            None => false,
        }
    }

    /// Refresh a southbound record's registration timestamp.
    pub fn update_timestamp(&self, eid: &Eid, timestamp: SystemTime) {
        if let Some(entry) = write(&self.southbound).get_mut(&eid.normalized()) {
            entry.record.timestamp = Some(timestamp);
        }
    }

    /* ------------------------------------------------------------ *
     * Per-registrant records (merge mode)
     * ------------------------------------------------------------ */

    pub fn add_xtr_record(&self, eid: &Eid, record: MappingRecord) {
        if let Some(xtr_id) = record.xtr_id {
            let mut table = write(&self.southbound);
            let entry = table
                .entry(eid.normalized())
                .or_insert_with(|| MappingEntry::new(record.clone()));
            entry.xtr_records.insert(xtr_id, record);
        }
    }

    /// All live per-registrant records for an EID.
    pub fn get_xtr_records(&self, eid: &Eid) -> Vec<MappingRecord> {
        let key = eid.normalized();
        let mut table = write(&self.southbound);
        let entry = match table.get_mut(&key) {
            Some(entry) => entry,
            None => return Vec::new(),
        };
        let validity = self.registration_validity;
        entry.xtr_records.retain(|_, record| match record.timestamp {
            Some(ts) => ts + validity > SystemTime::now(),
            None => true,
        });
        entry.xtr_records.values().cloned().collect()
    }

    pub fn remove_xtr_record(&self, eid: &Eid, xtr_id: &XtrId) {
        if let Some(entry) = write(&self.southbound).get_mut(&eid.normalized()) {
            entry.xtr_records.remove(xtr_id);
        }
    }

    /// Drop every registrant's record except `keep`. Used when a non-merge
    /// re-registration changes hands.
    pub fn clear_other_xtr_records(&self, eid: &Eid, keep: &XtrId) {
        if let Some(entry) = write(&self.southbound).get_mut(&eid.normalized()) {
            entry.xtr_records.retain(|id, _| id == keep);
        }
    }

    /* ------------------------------------------------------------ *
     * Authentication keys
     * ------------------------------------------------------------ */

    pub fn add_auth_key(&self, eid: Eid, key: AuthKey) {
        write(&self.auth_keys).insert(eid.normalized(), key);
    }

    pub fn remove_auth_key(&self, eid: &Eid) {
        write(&self.auth_keys).remove(&eid.normalized());
    }

    /// Key lookup follows the same mask-iteration policy as mappings.
    pub fn get_auth_key(&self, eid: &Eid) -> Option<AuthKey> {
        let probe_for = |key: &Eid| read(&self.auth_keys).get(key).cloned();
        let eid = if eid.is_src_dst() {
            eid.to_dst_only()
        } else {
            eid.clone()
        };
        if !is_maskable(&eid.addr) {
            return probe_for(&eid.normalized());
        }
        let start = eid.mask.unwrap_or_else(|| max_mask(&eid.addr));
        if !self.iterate_mask {
            return probe_for(&eid.normalized_at(start));
        }
        for mask in (0..=start).rev() {
            if let Some(key) = probe_for(&eid.normalized_at(mask)) {
                return Some(key);
            }
        }
        None
    }

    /* ------------------------------------------------------------ *
     * Subscribers
     * ------------------------------------------------------------ */

    /// Add or refresh a subscription on an EID. Replaces an existing entry
    /// for the same (locator, source-EID) identity.
    pub fn add_subscriber(&self, eid: &Eid, subscriber: Subscriber) {
        write(&self.subscribers)
            .entry(eid.normalized())
            .or_default()
            .replace(subscriber);
    }

    /// Subscribers of an EID; expired ones are pruned here, never swept
    /// proactively.
    pub fn get_subscribers(&self, eid: &Eid) -> Vec<Subscriber> {
        let key = eid.normalized();
        let mut table = write(&self.subscribers);
        let Some(set) = table.get_mut(&key) else {
            return Vec::new();
        };
        set.retain(|s| !s.has_expired());
        if set.is_empty() {
            table.remove(&key);
            return Vec::new();
        }
        set.iter().cloned().collect()
    }

    pub fn remove_subscriber(&self, eid: &Eid, subscriber: &Subscriber) {
        let key = eid.normalized();
        let mut table = write(&self.subscribers);
        if let Some(set) = table.get_mut(&key) {
            set.remove(subscriber);
            if set.is_empty() {
                table.remove(&key);
            }
        }
    }
}

fn src_component_covers(full_key: &Eid, src: Option<&Eid>) -> bool {
    let key_src = match full_key.src_component() {
        Some(key_src) => key_src,
        None => return true,
    };
    match src {
        Some(src) => {
            let mask = key_src.mask.unwrap_or(0);
            src.normalized_at(mask).addr == key_src.normalized().addr
        }
        None => true,
    }
}

fn src_mask_of(full_key: &Eid) -> u8 {
    full_key.src_component().and_then(|s| s.mask).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_lispms_proto::{LocatorRecord, Rloc};
    use std::net::Ipv4Addr;

    fn db() -> MappingDb {
        MappingDb::new(true, Duration::from_secs(200))
    }

    fn v4(octets: [u8; 4], mask: u8) -> Eid {
        Eid::from_ipv4_prefix(Ipv4Addr::from(octets), mask)
    }

    fn record(eid: Eid, last_octet: u8) -> MappingRecord {
        MappingRecord::new(
            eid,
            1440,
            vec![LocatorRecord::new(
                Rloc::ipv4(Ipv4Addr::new(192, 0, 2, last_octet)),
                1,
                100,
            )],
        )
    }

    #[test]
    fn exact_match_wins() {
        let db = db();
        db.add_mapping(MappingOrigin::Southbound, record(v4([10, 0, 0, 0], 8), 1));
        db.add_mapping(MappingOrigin::Southbound, record(v4([10, 0, 0, 0], 24), 2));
        let hit = db
            .get_mapping(None, &v4([10, 0, 0, 0], 24), LookupPolicy::NbFirst)
            .unwrap();
        assert_eq!(hit.record.locators[0].rloc, Rloc::ipv4(Ipv4Addr::new(192, 0, 2, 2)));
    }

    #[test]
    fn longest_prefix_match_prefers_more_specific() {
        let db = db();
        db.add_mapping(MappingOrigin::Southbound, record(v4([10, 0, 0, 0], 8), 1));
        db.add_mapping(MappingOrigin::Southbound, record(v4([10, 0, 0, 0], 24), 2));
        // /32 query: no exact match, iteration must stop at /24, not /8
        let hit = db
            .get_mapping(None, &v4([10, 0, 0, 5], 32), LookupPolicy::NbFirst)
            .unwrap();
        assert_eq!(hit.record.eid, v4([10, 0, 0, 0], 24));
        assert_eq!(hit.lookup_key, v4([10, 0, 0, 0], 24));
    }

    #[test]
    fn iteration_disabled_misses_covering_prefix() {
        let db = MappingDb::new(false, Duration::from_secs(200));
        db.add_mapping(MappingOrigin::Southbound, record(v4([10, 0, 0, 0], 24), 1));
        assert!(db
            .get_mapping(None, &v4([10, 0, 0, 5], 32), LookupPolicy::NbFirst)
            .is_none());
        assert!(db
            .get_mapping(None, &v4([10, 0, 0, 0], 24), LookupPolicy::NbFirst)
            .is_some());
    }

    #[test]
    fn source_dest_rewritten_for_plain_query() {
        let db = db();
        let sd = Eid::from_ipv4_src_dst(
            Ipv4Addr::new(10, 0, 0, 0),
            24,
            Ipv4Addr::new(20, 0, 0, 0),
            24,
        );
        db.add_mapping(MappingOrigin::Southbound, record(sd.clone(), 1));

        let hit = db
            .get_mapping(None, &v4([20, 0, 0, 0], 24), LookupPolicy::NbFirst)
            .unwrap();
        assert_eq!(hit.record.eid, v4([20, 0, 0, 0], 24));
        assert_eq!(hit.lookup_key, sd);
    }

    #[test]
    fn source_dest_query_returns_full_key() {
        let db = db();
        let sd = Eid::from_ipv4_src_dst(
            Ipv4Addr::new(10, 0, 0, 0),
            24,
            Ipv4Addr::new(20, 0, 0, 0),
            24,
        );
        db.add_mapping(MappingOrigin::Southbound, record(sd.clone(), 1));
        let hit = db.get_mapping(None, &sd, LookupPolicy::NbFirst).unwrap();
        assert_eq!(hit.record.eid, sd);
    }

    #[test]
    fn source_component_must_cover_queried_src() {
        let db = db();
        let sd = Eid::from_ipv4_src_dst(
            Ipv4Addr::new(10, 0, 0, 0),
            24,
            Ipv4Addr::new(20, 0, 0, 0),
            24,
        );
        db.add_mapping(MappingOrigin::Southbound, record(sd, 1));

        let inside = v4([10, 0, 0, 7], 32);
        let outside = v4([99, 0, 0, 7], 32);
        assert!(db
            .get_mapping(Some(&inside), &v4([20, 0, 0, 1], 32), LookupPolicy::NbFirst)
            .is_some());
        assert!(db
            .get_mapping(Some(&outside), &v4([20, 0, 0, 1], 32), LookupPolicy::NbFirst)
            .is_none());
    }

    #[test]
    fn shared_destination_keeps_all_source_dest_keys() {
        let db = db();
        let sd1 = Eid::from_ipv4_src_dst(
            Ipv4Addr::new(10, 0, 0, 0),
            24,
            Ipv4Addr::new(20, 0, 0, 0),
            24,
        );
        let sd2 = Eid::from_ipv4_src_dst(
            Ipv4Addr::new(11, 0, 0, 0),
            24,
            Ipv4Addr::new(20, 0, 0, 0),
            24,
        );
        db.add_mapping(MappingOrigin::Southbound, record(sd1.clone(), 1));
        db.add_mapping(MappingOrigin::Southbound, record(sd2.clone(), 2));

        let hit = db
            .get_mapping(
                Some(&v4([10, 0, 0, 7], 32)),
                &v4([20, 0, 0, 1], 32),
                LookupPolicy::NbFirst,
            )
            .unwrap();
        assert_eq!(hit.lookup_key, sd1);
        let hit = db
            .get_mapping(
                Some(&v4([11, 0, 0, 7], 32)),
                &v4([20, 0, 0, 1], 32),
                LookupPolicy::NbFirst,
            )
            .unwrap();
        assert_eq!(hit.lookup_key, sd2);
    }

    #[test]
    fn removing_one_source_dest_mapping_spares_its_sibling() {
        let db = db();
        let sd1 = Eid::from_ipv4_src_dst(
            Ipv4Addr::new(10, 0, 0, 0),
            24,
            Ipv4Addr::new(20, 0, 0, 0),
            24,
        );
        let sd2 = Eid::from_ipv4_src_dst(
            Ipv4Addr::new(11, 0, 0, 0),
            24,
            Ipv4Addr::new(20, 0, 0, 0),
            24,
        );
        db.add_mapping(MappingOrigin::Southbound, record(sd1.clone(), 1));
        db.add_mapping(MappingOrigin::Southbound, record(sd2.clone(), 2));
        db.remove_mapping(MappingOrigin::Southbound, &sd1);

        assert!(db
            .get_mapping(
                Some(&v4([10, 0, 0, 7], 32)),
                &v4([20, 0, 0, 1], 32),
                LookupPolicy::NbFirst,
            )
            .is_none());
        let hit = db
            .get_mapping(
                Some(&v4([11, 0, 0, 7], 32)),
                &v4([20, 0, 0, 1], 32),
                LookupPolicy::NbFirst,
            )
            .unwrap();
        assert_eq!(hit.lookup_key, sd2);
    }

    #[test]
    fn most_specific_source_component_wins() {
        let db = db();
        let wide = Eid::from_ipv4_src_dst(
            Ipv4Addr::new(10, 0, 0, 0),
            8,
            Ipv4Addr::new(20, 0, 0, 0),
            24,
        );
        let narrow = Eid::from_ipv4_src_dst(
            Ipv4Addr::new(10, 1, 0, 0),
            16,
            Ipv4Addr::new(20, 0, 0, 0),
            24,
        );
        db.add_mapping(MappingOrigin::Southbound, record(wide.clone(), 1));
        db.add_mapping(MappingOrigin::Southbound, record(narrow.clone(), 2));

        let hit = db
            .get_mapping(
                Some(&v4([10, 1, 0, 5], 32)),
                &v4([20, 0, 0, 1], 32),
                LookupPolicy::NbFirst,
            )
            .unwrap();
        assert_eq!(hit.lookup_key, narrow);
        let hit = db
            .get_mapping(
                Some(&v4([10, 2, 0, 5], 32)),
                &v4([20, 0, 0, 1], 32),
                LookupPolicy::NbFirst,
            )
            .unwrap();
        assert_eq!(hit.lookup_key, wide);
    }

    #[test]
    fn source_dest_query_source_constrains_fallback() {
        let db = db();
        let stored = Eid::from_ipv4_src_dst(
            Ipv4Addr::new(11, 0, 0, 0),
            24,
            Ipv4Addr::new(20, 0, 0, 0),
            24,
        );
        db.add_mapping(MappingOrigin::Southbound, record(stored.clone(), 1));

        // full-key miss must not fall through to a foreign source's mapping
        let foreign = Eid::from_ipv4_src_dst(
            Ipv4Addr::new(10, 0, 0, 0),
            24,
            Ipv4Addr::new(20, 0, 0, 0),
            24,
        );
        assert!(db
            .get_mapping(None, &foreign, LookupPolicy::NbFirst)
            .is_none());
        assert!(db
            .get_mapping(None, &stored, LookupPolicy::NbFirst)
            .is_some());
    }

    #[test]
    fn nb_first_shadows_southbound() {
        let db = db();
        db.add_mapping(MappingOrigin::Northbound, record(v4([10, 0, 0, 0], 24), 1));
        db.add_mapping(MappingOrigin::Southbound, record(v4([10, 0, 0, 0], 24), 2));
        let hit = db
            .get_mapping(None, &v4([10, 0, 0, 0], 24), LookupPolicy::NbFirst)
            .unwrap();
        assert_eq!(hit.record.locators[0].rloc, Rloc::ipv4(Ipv4Addr::new(192, 0, 2, 1)));
    }

    #[test]
    fn nb_and_sb_intersects_locators() {
        let db = db();
        let mut nb = record(v4([10, 0, 0, 0], 24), 1);
        nb.locators.push(LocatorRecord::new(
            Rloc::ipv4(Ipv4Addr::new(192, 0, 2, 9)),
            1,
            1,
        ));
        db.add_mapping(MappingOrigin::Northbound, nb);
        db.add_mapping(MappingOrigin::Southbound, record(v4([10, 0, 0, 0], 24), 1));
        let hit = db
            .get_mapping(None, &v4([10, 0, 0, 0], 24), LookupPolicy::NbAndSb)
            .unwrap();
        assert_eq!(hit.record.locators.len(), 1);
        assert_eq!(hit.record.locators[0].rloc, Rloc::ipv4(Ipv4Addr::new(192, 0, 2, 1)));
    }

    #[test]
    fn lapsed_registration_dropped_on_lookup() {
        let db = MappingDb::new(true, Duration::from_secs(60));
        let mut old = record(v4([10, 0, 0, 0], 24), 1);
        old.timestamp = Some(SystemTime::now() - Duration::from_secs(600));
        db.add_mapping(MappingOrigin::Southbound, old);
        assert!(db
            .get_mapping(None, &v4([10, 0, 0, 0], 24), LookupPolicy::NbFirst)
            .is_none());
        // dropped, not just hidden
        assert!(db
            .get_mapping_exact(MappingOrigin::Southbound, &v4([10, 0, 0, 0], 24))
            .is_none());
    }

    #[test]
    fn auth_key_follows_mask_iteration() {
        let db = db();
        db.add_auth_key(v4([10, 0, 0, 0], 16), rust_lispms_proto::auth::AuthKey::new("pw"));
        assert!(db.get_auth_key(&v4([10, 0, 1, 0], 24)).is_some());
        assert!(db.get_auth_key(&v4([11, 0, 0, 0], 24)).is_none());

        let strict = MappingDb::new(false, Duration::from_secs(200));
        strict.add_auth_key(v4([10, 0, 0, 0], 16), rust_lispms_proto::auth::AuthKey::new("pw"));
        assert!(strict.get_auth_key(&v4([10, 0, 1, 0], 24)).is_none());
    }

    #[test]
    fn subscribers_refresh_and_prune() {
        let db = db();
        let eid = v4([10, 0, 0, 0], 24);
        let rloc = Rloc::ipv4(Ipv4Addr::new(203, 0, 113, 1));
        let src = v4([10, 9, 0, 1], 32);

        db.add_subscriber(&eid, Subscriber::new(rloc.clone(), src.clone(), Some(60)));
        db.add_subscriber(&eid, Subscriber::new(rloc.clone(), src.clone(), Some(120)));
        assert_eq!(db.get_subscribers(&eid).len(), 1);

        db.add_subscriber(&eid, Subscriber::expired_for_test(rloc.clone(), src.clone()));
        assert!(db.get_subscribers(&eid).is_empty());

        db.add_subscriber(&eid, Subscriber::new(rloc.clone(), src.clone(), None));
        let sub = db.get_subscribers(&eid).pop().unwrap();
        db.remove_subscriber(&eid, &sub);
        assert!(db.get_subscribers(&eid).is_empty());
    }

    #[test]
    fn xtr_records_roundtrip_and_clear() {
        let db = db();
        let eid = v4([10, 0, 0, 0], 24);
        db.add_mapping(MappingOrigin::Southbound, record(eid.clone(), 1));

        let mut a = record(eid.clone(), 1);
        a.xtr_id = Some(XtrId([1; 16]));
        a.timestamp = Some(SystemTime::now());
        let mut b = record(eid.clone(), 2);
        b.xtr_id = Some(XtrId([2; 16]));
        b.timestamp = Some(SystemTime::now());
        db.add_xtr_record(&eid, a);
        db.add_xtr_record(&eid, b);
        assert_eq!(db.get_xtr_records(&eid).len(), 2);

        db.clear_other_xtr_records(&eid, &XtrId([2; 16]));
        let left = db.get_xtr_records(&eid);
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].xtr_id, Some(XtrId([2; 16])));

        db.remove_xtr_record(&eid, &XtrId([2; 16]));
        assert!(db.get_xtr_records(&eid).is_empty());
    }
}
