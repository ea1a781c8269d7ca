//! The map-server: accepts registrations and drives change notification.

use crate::config::MappingServiceConfig;
use crate::mapdb::{MappingDb, MappingOrigin};
use crate::merge;
use crate::smr::SmrScheduler;
use log::{debug, warn};
use rust_lispms_proto::auth;
use rust_lispms_proto::{Eid, LispAddr, MapNotify, MapRegister, MappingRecord};
use std::sync::Arc;
use std::time::SystemTime;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Whether this instance is the elected writer. Supplied externally in
/// clustered deployments; standalone instances always answer yes.
pub trait WriteAuthority: Send + Sync {
    fn is_master(&self) -> bool;
}

/// Always-master authority for standalone deployments.
pub struct Standalone;

impl WriteAuthority for Standalone {
    fn is_master(&self) -> bool {
        true
    }
}

/// Outcome of a successful registration.
#[derive(Debug)]
pub struct RegistrationResult {
    /// The acknowledgment, present when the registration asked for one.
    pub notify: Option<MapNotify>,
    /// Unicast destinations for the notify in merge mode: source transport
    /// addresses of every registrant of a changed EID. Empty outside merge
    /// mode (the notify goes back to the sender).
    pub notify_destinations: Vec<LispAddr>,
    /// EIDs whose effective content changed.
    pub changed: Vec<Eid>,
}

pub struct MapServer {
    db: Arc<MappingDb>,
    config: MappingServiceConfig,
    authority: Arc<dyn WriteAuthority>,
    scheduler: SmrScheduler,
}

impl MapServer {
    pub fn new(
        db: Arc<MappingDb>,
        config: MappingServiceConfig,
        authority: Arc<dyn WriteAuthority>,
        scheduler: SmrScheduler,
    ) -> Self {
        Self {
            db,
            config,
            authority,
            scheduler,
        }
    }

    /// Process a registration. Returns `None` when the batch is rejected;
    /// rejection is silent on the wire, the sender learns nothing.
    pub fn handle_map_register(&self, register: &MapRegister) -> Option<RegistrationResult> {
        let first = register.records.first()?;
        let key = match self.db.get_auth_key(&first.eid) {
            Some(key) => key,
            None => {
                warn!("no authentication key covers {}, dropping registration", first.eid);
                return None;
            }
        };
        // every record must be provisioned under the very same key
        for record in &register.records[1..] {
            if self.db.get_auth_key(&record.eid).as_ref() != Some(&key) {
                warn!(
                    "registration mixes key domains ({} vs {}), dropping batch",
                    first.eid, record.eid
                );
                return None;
            }
        }
        if let Err(e) = auth::validate_register(register, &key) {
            debug!("registration failed authentication: {}", e);
            return None;
        }

        let merge_mode = self.merge_mode(register);
        let now = SystemTime::now();
        let mut changed = Vec::new();
        let mut notify_records = Vec::new();
        let mut notify_destinations = Vec::new();

        // records commit one by one; a bad record does not roll back the
        // ones before it
        for incoming in &register.records {
            let mut record = incoming.clone();
            record.timestamp = Some(now);
            record.source_rloc = register.source_rloc.clone();
            let eid = record.eid.normalized();

            if record.ttl == rust_lispms_proto::msg::TTL_DELETE {
                debug!("TTL 0 registration removes mapping for {}", eid);
                if self.db.get_mapping_exact(MappingOrigin::Southbound, &eid).is_some() {
                    self.db.remove_mapping(MappingOrigin::Southbound, &eid);
                    changed.push(eid.clone());
                }
                notify_records.push(record);
                continue;
            }

            let previous = self.db.get_mapping_exact(MappingOrigin::Southbound, &eid);
            let record_changed = if merge_mode {
                self.commit_merged(&eid, record, previous.as_ref(), now)
            } else {
                self.commit_plain(&eid, record, previous.as_ref())
            };
            if record_changed {
                changed.push(eid.clone());
            }

            if merge_mode {
                match merge::merge_xtr_records(
                    &self.db.get_xtr_records(&eid),
                    now,
                    self.config.registration_validity,
                ) {
                    Some(view) => {
                        if record_changed {
                            for src in view.source_rlocs.iter() {
                                if !notify_destinations.contains(src) {
                                    notify_destinations.push(src.clone());
                                }
                            }
                        }
                        notify_records.push(view.record);
                    }
                    None => notify_records.push(incoming.clone()),
                }
            } else {
                notify_records.push(incoming.clone());
            }
        }

        for eid in &changed {
            self.mapping_changed(eid);
        }

        let notify = if register.want_map_notify {
            Some(self.build_notify(register, notify_records, &key)?)
        } else {
            None
        };
        Some(RegistrationResult {
            notify,
            notify_destinations,
            changed,
        })
    }

    /// Merge mode needs the global flag, the message bit and a usable
    /// registrant identity all at once.
    fn merge_mode(&self, register: &MapRegister) -> bool {
        if !self.config.mapping_merge || !register.merge_enabled {
            return false;
        }
        match register.xtr_id {
            None => {
                debug!("merge bit set without an xTR-ID, downgrading to non-merge");
                false
            }
            Some(xtr_id) => {
                if xtr_id.is_zero() {
                    warn!("merge registration with the reserved all-zero xTR-ID");
                }
                true
            }
        }
    }

    /// Store a non-merge registration. A handover to a different
    /// registrant discards the other registrants' per-xTR records.
    fn commit_plain(&self, eid: &Eid, record: MappingRecord, previous: Option<&MappingRecord>) -> bool {
        if let (Some(prev), Some(xtr_id)) = (previous, record.xtr_id) {
            if prev.xtr_id.is_some() && prev.xtr_id != Some(xtr_id) {
                self.db.clear_other_xtr_records(eid, &xtr_id);
            }
        }
        match previous {
            Some(prev) if prev.same_content(&record) => {
                self.db.update_timestamp(eid, record.timestamp.unwrap_or_else(SystemTime::now));
                false
            }
            _ => {
                self.db.add_mapping(MappingOrigin::Southbound, record);
                true
            }
        }
    }

    /// Merge-mode commit: union the previous stored view with the incoming
    /// record, keeping the earliest-seen timestamp.
    fn commit_merged(
        &self,
        eid: &Eid,
        record: MappingRecord,
        previous: Option<&MappingRecord>,
        now: SystemTime,
    ) -> bool {
        self.db.add_xtr_record(eid, record.clone());
        let merged = match previous {
            Some(prev) => {
                let mut merged = merge::merge_mappings(prev, &record);
                merged.timestamp = match (prev.timestamp, record.timestamp) {
                    (Some(a), Some(b)) => Some(a.min(b)),
                    (a, b) => a.or(b),
                };
                merged
            }
            None => record,
        };
        let changed = previous.map_or(true, |prev| !prev.same_content(&merged));
        if changed {
            self.db.add_mapping(MappingOrigin::Southbound, merged);
        } else {
            self.db.update_timestamp(eid, now);
        }
        changed
    }

    fn build_notify(
        &self,
        register: &MapRegister,
        records: Vec<MappingRecord>,
        key: &rust_lispms_proto::auth::AuthKey,
    ) -> Option<MapNotify> {
        let mut notify = MapNotify {
            merge_enabled: register.merge_enabled,
            nonce: register.nonce,
            key_id: register.key_id,
            authentication_data: Vec::new(),
            records,
            xtr_id: register.xtr_id,
            site_id: register.site_id,
        };
        match auth::sign_notify(&mut notify, key) {
            Ok(()) => Some(notify),
            Err(e) => {
                warn!("failed to sign Map-Notify: {}", e);
                None
            }
        }
    }

    /// Fan out solicitations for a changed EID. Only the elected writer
    /// talks to the network; standby instances stay quiet.
    pub fn mapping_changed(&self, eid: &Eid) {
        if !self.authority.is_master() {
            debug!("not master, suppressing notifications for {}", eid);
            return;
        }
        let subscribers = self.db.get_subscribers(eid);
        if !subscribers.is_empty() {
            self.scheduler.schedule(eid, subscribers);
        }
        if eid.is_src_dst() {
            // the destination-only prefix has its own audience
            let dst_only = eid.to_dst_only().normalized();
            let dst_subscribers = self.db.get_subscribers(&dst_only);
            if !dst_subscribers.is_empty() {
                self.scheduler.schedule(&dst_only, dst_subscribers);
            }
        }
    }

    /// Consume mapping-changed events from external producers (datastore
    /// listeners, administrative edits) without knowing who they are.
    pub fn spawn_change_listener(self: Arc<Self>, mut rx: mpsc::Receiver<Eid>) -> JoinHandle<()> {
        tokio::spawn(async move {
            while let Some(eid) = rx.recv().await {
                debug!("external change notification for {}", eid);
                self.mapping_changed(&eid);
            }
        })
    }
}
