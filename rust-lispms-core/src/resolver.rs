//! The map-resolver: answers lookup queries.

use crate::config::{ElpPolicy, MappingServiceConfig};
use crate::mapdb::{MappingDb, MappingLookup, MappingOrigin};
use crate::smr::SmrScheduler;
use crate::subscriber::Subscriber;
use log::debug;
use rust_lispms_proto::addr::{ElpHop, LcafAddr};
use rust_lispms_proto::{
    Eid, LispAddr, LocatorRecord, MapReply, MapRequest, MapReplyAction, MappingRecord, Rloc,
};
use std::sync::Arc;
use std::time::SystemTime;

pub struct MapResolver {
    db: Arc<MappingDb>,
    config: MappingServiceConfig,
    scheduler: SmrScheduler,
}

impl MapResolver {
    pub fn new(db: Arc<MappingDb>, config: MappingServiceConfig, scheduler: SmrScheduler) -> Self {
        Self {
            db,
            config,
            scheduler,
        }
    }

    /// Answer a Map-Request. Returns `None` for traffic that is not
    /// resolver business (solicitations and probes).
    pub fn handle_map_request(&self, request: &MapRequest) -> Option<MapReply> {
        if request.smr || request.probe {
            debug!("ignoring SMR/probe request with nonce {:#x}", request.nonce);
            return None;
        }
        if request.smr_invoked {
            // the requester is answering an earlier solicitation: cancel
            // its retries before anything else
            self.acknowledge_solicitations(request);
        }
        let records = request
            .eid_items
            .iter()
            .map(|eid| self.resolve_eid(request, eid))
            .collect();
        Some(MapReply::new(request.nonce, records))
    }

    fn acknowledge_solicitations(&self, request: &MapRequest) {
        let src_eid = request
            .source_eid
            .clone()
            .unwrap_or_else(|| Eid::new(LispAddr::NoAddress));
        for eid in &request.eid_items {
            let subscribers: Vec<Subscriber> = request
                .itr_rlocs
                .iter()
                .map(|rloc| Subscriber::new(rloc.clone(), src_eid.clone(), None))
                .collect();
            self.scheduler.acknowledge(eid, &subscribers);
        }
    }

    fn resolve_eid(&self, request: &MapRequest, eid: &Eid) -> MappingRecord {
        let src = request.source_eid.as_ref();
        let hit = match self.db.get_mapping(src, eid, self.config.lookup_policy) {
            Some(hit) => hit,
            None => self.synthesize_negative(eid),
        };

        if self.config.subscriptions && !request.itr_rlocs.is_empty() {
            let rloc = select_interest_rloc(&request.itr_rlocs, request.source_rloc.as_ref());
            let src_eid = request
                .source_eid
                .clone()
                .unwrap_or_else(|| Eid::new(LispAddr::NoAddress));
            // subscribe on the true stored key, not the rewritten one
            self.db.add_subscriber(
                &hit.lookup_key,
                Subscriber::new(rloc, src_eid, Some(hit.record.ttl)),
            );
        }

        let mut record = hit.record;
        if !eid.is_src_dst() {
            record.eid = record.eid.to_dst_only();
        }
        if request.smr_invoked && record.is_negative() {
            // a re-query hitting a negative mapping acknowledges a
            // deletion; tell the requester to purge
            record.ttl = 0;
        }
        self.apply_elp_policy(&mut record, request);
        record
    }

    /// A miss is not an error: synthesize a negative mapping, persist it
    /// southbound so the next lookup sees it, and answer with it.
    fn synthesize_negative(&self, eid: &Eid) -> MappingLookup {
        let ttl = self.config.negative_mapping_ttl.as_secs() as u32;
        let mut record = MappingRecord::negative(eid.normalized(), ttl, MapReplyAction::NoAction);
        record.timestamp = Some(SystemTime::now());
        debug!("synthesized negative mapping for {}", record.eid);
        self.db.add_mapping(MappingOrigin::Southbound, record.clone());
        MappingLookup {
            record,
            lookup_key: eid.normalized(),
        }
    }

    fn apply_elp_policy(&self, record: &mut MappingRecord, request: &MapRequest) {
        if self.config.elp_policy == ElpPolicy::Default {
            return;
        }
        let mut rewritten = Vec::with_capacity(record.locators.len());
        for locator in record.locators.drain(..) {
            match elp_hops(&locator) {
                Some(hops) => {
                    let hop = next_hop_for(hops, &request.itr_rlocs);
                    match self.config.elp_policy {
                        ElpPolicy::Replace => {
                            let mut simple = locator.clone();
                            simple.rloc = Rloc(hop);
                            rewritten.push(simple);
                        }
                        ElpPolicy::Both => {
                            let mut simple = locator.clone();
                            simple.rloc = Rloc(hop);
                            let mut elp = locator;
                            if elp.priority != 255 {
                                elp.priority = elp.priority.saturating_add(1);
                            }
                            rewritten.push(elp);
                            rewritten.push(simple);
                        }
                        ElpPolicy::Default => unreachable!(),
                    }
                }
                None => rewritten.push(locator),
            }
        }
        record.locators = rewritten;
    }
}

fn elp_hops(locator: &LocatorRecord) -> Option<&[ElpHop]> {
    match &locator.rloc.0 {
        LispAddr::Lcaf(LcafAddr::ExplicitLocatorPath(hops)) if !hops.is_empty() => Some(hops),
        _ => None,
    }
}

/// The hop after the requester's own position in the path, or the first
/// hop if the requester does not appear in it.
fn next_hop_for(hops: &[ElpHop], itr_rlocs: &[Rloc]) -> LispAddr {
    for (i, hop) in hops.iter().enumerate() {
        if itr_rlocs.iter().any(|r| r.0 == hop.address) {
            if let Some(next) = hops.get(i + 1) {
                return next.address.clone();
            }
            return hops[0].address.clone();
        }
    }
    hops[0].address.clone()
}

/// Which of the requester's candidate locators to remember as its interest
/// locator: exact byte match with the transport source first, then first
/// family match, then the first candidate.
fn select_interest_rloc(itr_rlocs: &[Rloc], source_rloc: Option<&LispAddr>) -> Rloc {
    if let Some(src) = source_rloc {
        if let Some(exact) = itr_rlocs
            .iter()
            .find(|r| r.0.comparison_bytes() == src.comparison_bytes())
        {
            return exact.clone();
        }
        if let Some(family) = itr_rlocs.iter().find(|r| r.0.same_family(src)) {
            return family.clone();
        }
    }
    itr_rlocs[0].clone()
}
