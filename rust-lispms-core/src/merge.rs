//! Locator-set and mapping merge rules.
//!
//! Pure functions over the data model: the ordered locator union used in
//! merge-mode registration, the cross-registrant fold, and the
//! northbound/southbound intersection.

use log::warn;
use rust_lispms_proto::addr::LcafAddr;
use rust_lispms_proto::{Eid, LispAddr, LocatorRecord, MappingRecord};
use std::time::{Duration, SystemTime};

/// Union of two locator lists keyed by RLOC bytes.
///
/// Both inputs are expected in ascending RLOC byte order and the output
/// preserves it via an ordered merge pass. Where the same RLOC appears on
/// both sides with differing attributes, the existing entry survives if its
/// `local` flag is set, otherwise the incoming one replaces it in place.
pub fn merge_locator_records(
    existing: &[LocatorRecord],
    incoming: &[LocatorRecord],
) -> Vec<LocatorRecord> {
    let mut merged = Vec::with_capacity(existing.len() + incoming.len());
    let (mut e, mut i) = (0, 0);
    while e < existing.len() && i < incoming.len() {
        let old = &existing[e];
        let new = &incoming[i];
        let old_key = old.rloc.0.comparison_bytes();
        let new_key = new.rloc.0.comparison_bytes();
        if old_key == new_key {
            merged.push(if old.local { old.clone() } else { new.clone() });
            e += 1;
            i += 1;
        } else if old_key < new_key {
            merged.push(old.clone());
            e += 1;
        } else {
            merged.push(new.clone());
            i += 1;
        }
    }
    merged.extend_from_slice(&existing[e..]);
    merged.extend_from_slice(&incoming[i..]);
    merged
}

/// Fold the scalar fields of `incoming` into `base`.
///
/// TTL becomes the minimum; identity and timestamp follow the most recent
/// input. Mismatched action, authoritative flag or EID are tolerated with a
/// warning, the base value stands.
pub fn merge_common_fields(base: &mut MappingRecord, incoming: &MappingRecord) {
    base.ttl = base.ttl.min(incoming.ttl);
    if base.action != incoming.action {
        warn!(
            "action mismatch while merging mappings for {}: {:?} vs {:?}",
            base.eid, base.action, incoming.action
        );
    }
    if base.authoritative != incoming.authoritative {
        warn!("authoritative mismatch while merging mappings for {}", base.eid);
    }
    if base.eid != incoming.eid {
        warn!("EID mismatch while merging mappings: {} vs {}", base.eid, incoming.eid);
    }
    base.xtr_id = incoming.xtr_id;
    base.site_id = incoming.site_id;
    base.timestamp = incoming.timestamp;
    base.source_rloc = incoming.source_rloc.clone();
}

/// Merge two records for the same EID into one.
pub fn merge_mappings(existing: &MappingRecord, incoming: &MappingRecord) -> MappingRecord {
    let mut merged = existing.clone();
    merged.locators = merge_locator_records(&existing.locators, &incoming.locators);
    merge_common_fields(&mut merged, incoming);
    merged
}

/// The merged view across every live registrant of an EID.
#[derive(Debug, Clone)]
pub struct MergedView {
    pub record: MappingRecord,
    /// Source transport addresses of the contributing registrants, used as
    /// the unicast destination list for acknowledgments.
    pub source_rlocs: Vec<LispAddr>,
}

/// Fold the per-registrant records of an EID into one merged view.
///
/// Registrants whose record timestamp is older than `validity` are skipped.
/// The merged record keeps the earliest-seen timestamp among survivors so
/// expiry of the merged mapping tracks its stalest contributor.
pub fn merge_xtr_records(
    records: &[MappingRecord],
    now: SystemTime,
    validity: Duration,
) -> Option<MergedView> {
    let mut merged: Option<MappingRecord> = None;
    let mut earliest: Option<SystemTime> = None;
    let mut source_rlocs = Vec::new();
    for record in records {
        let expired = match record.timestamp {
            Some(ts) => ts + validity <= now,
            None => false,
        };
        if expired {
            continue;
        }
        if let Some(ts) = record.timestamp {
            if earliest.map_or(true, |e| ts < e) {
                earliest = Some(ts);
            }
        }
        if let Some(src) = &record.source_rloc {
            if !source_rlocs.contains(src) {
                source_rlocs.push(src.clone());
            }
        }
        merged = Some(match merged {
            Some(base) => merge_mappings(&base, record),
            None => record.clone(),
        });
    }
    let mut record = merged?;
    record.timestamp = earliest.or(record.timestamp);
    Some(MergedView {
        record,
        source_rlocs,
    })
}

/// Combine a northbound (operator) and southbound (registered) record for
/// the same prefix into the view a requester may see.
///
/// The more specific EID wins, source-dest prefixes being compared on their
/// destination component; when the southbound destination is more specific
/// and the northbound EID is source-dest, a new source-dest EID is built
/// from the northbound source and the southbound destination. Locators are
/// intersected by RLOC value with the northbound attributes, except that a
/// southbound priority of 255 forces 255. An empty intersection returns the
/// northbound record unchanged.
pub fn compute_nb_sb_intersection(nb: &MappingRecord, sb: &MappingRecord) -> MappingRecord {
    let mut result = nb.clone();

    if sb.eid.dst_mask() > nb.eid.dst_mask() {
        result.eid = match (&nb.eid.addr, &sb.eid.addr) {
            (LispAddr::Lcaf(LcafAddr::SourceDest { src, src_mask, .. }), _) => {
                let sb_dst = sb.eid.to_dst_only();
                Eid {
                    addr: LispAddr::Lcaf(LcafAddr::SourceDest {
                        src: src.clone(),
                        src_mask: *src_mask,
                        dst: Box::new(sb_dst.addr),
                        dst_mask: sb.eid.dst_mask(),
                    }),
                    mask: None,
                    vni: nb.eid.vni,
                }
            }
            _ => sb.eid.clone(),
        };
    }

    let mut locators = Vec::new();
    for nb_locator in &nb.locators {
        let key = nb_locator.rloc.0.comparison_bytes();
        if let Some(sb_locator) = sb
            .locators
            .iter()
            .find(|l| l.rloc.0.comparison_bytes() == key)
        {
            let mut merged = nb_locator.clone();
            if sb_locator.priority == 255 {
                merged.priority = 255;
            }
            locators.push(merged);
        }
    }
    if locators.is_empty() {
        return nb.clone();
    }
    result.locators = locators;
    result
}
