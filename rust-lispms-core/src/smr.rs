//! Solicit-Map-Request scheduling.
//!
//! When a mapping changes, every subscriber gets a solicitation asking it
//! to re-query. Each subscriber is retried at a fixed interval up to a
//! bounded attempt count, until the subscriber answers with an smr-invoked
//! Map-Request (acknowledgment) or the attempts run out.

use crate::subscriber::Subscriber;
use async_trait::async_trait;
use log::{debug, warn};
use rust_lispms_proto::{Eid, LispAddr, MapRequest, Rloc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::task::JoinHandle;

/// Outbound path for solicitations. Fire-and-forget to the transport.
#[async_trait]
pub trait SmrSender: Send + Sync {
    async fn send(&self, request: MapRequest, dst: &Rloc) -> anyhow::Result<()>;
}

/// A scheduled retry task, tagged with the generation it was spawned
/// under so a stale task's self-cleanup cannot remove its successor.
struct TaskSlot {
    generation: u64,
    handle: JoinHandle<()>,
}

type TaskMap = HashMap<Eid, HashMap<Subscriber, TaskSlot>>;

/// Per-EID retry bookkeeping.
///
/// Cheaply cloneable; all clones share one task table.
#[derive(Clone)]
pub struct SmrScheduler {
    sender: Arc<dyn SmrSender>,
    retry_count: u32,
    interval: Duration,
    tasks: Arc<Mutex<TaskMap>>,
    generation: Arc<AtomicU64>,
}

fn lock(tasks: &Mutex<TaskMap>) -> MutexGuard<'_, TaskMap> {
    tasks.lock().unwrap_or_else(|e| e.into_inner())
}

impl SmrScheduler {
    pub fn new(sender: Arc<dyn SmrSender>, retry_count: u32, interval: Duration) -> Self {
        Self {
            sender,
            retry_count,
            interval,
            tasks: Arc::new(Mutex::new(HashMap::new())),
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Start soliciting the given subscribers about a change to `eid`.
    ///
    /// Any retries already outstanding for this EID are cancelled first: a
    /// new solicitation supersedes the old one wholesale, including retries
    /// for subscribers not in the new batch. That matches the historical
    /// behavior and is pinned by a test; it can cancel legitimate in-flight
    /// retries when batches overlap partially.
    ///
    /// The cancel-then-reschedule sequence holds the table lock throughout
    /// so a concurrent [`acknowledge`](Self::acknowledge) cannot interleave
    /// and leak a handle.
    pub fn schedule(&self, eid: &Eid, subscribers: Vec<Subscriber>) {
        let mut tasks = lock(&self.tasks);
        if let Some(old) = tasks.remove(eid) {
            debug!("superseding {} outstanding solicitations for {}", old.len(), eid);
            for slot in old.into_values() {
                slot.handle.abort();
            }
        }
        let mut handles = HashMap::new();
        for subscriber in subscribers {
            if subscriber.has_expired() {
                debug!("skipping expired subscriber {} for {}", subscriber.rloc, eid);
                continue;
            }
            let generation = self.generation.fetch_add(1, Ordering::Relaxed);
            let handle = tokio::spawn(retry_loop(
                self.sender.clone(),
                Arc::clone(&self.tasks),
                eid.clone(),
                subscriber.clone(),
                self.retry_count,
                self.interval,
                generation,
            ));
            handles.insert(subscriber, TaskSlot { generation, handle });
        }
        if !handles.is_empty() {
            tasks.insert(eid.clone(), handles);
        }
    }

    /// Stop retrying the given subscribers for `eid`; called when their
    /// smr-invoked re-query arrives. Best-effort: an attempt already in
    /// flight may still complete.
    pub fn acknowledge(&self, eid: &Eid, subscribers: &[Subscriber]) {
        let mut tasks = lock(&self.tasks);
        let Some(handles) = tasks.get_mut(eid) else {
            return;
        };
        for subscriber in subscribers {
            if let Some(slot) = handles.remove(subscriber) {
                debug!("solicitation for {} acknowledged by {}", eid, subscriber.rloc);
                slot.handle.abort();
            }
        }
        if handles.is_empty() {
            tasks.remove(eid);
        }
    }

    /// Number of EIDs with outstanding retries.
    pub fn pending_eids(&self) -> usize {
        lock(&self.tasks).len()
    }
}

/// One subscriber's retry task. Sends immediately, then at the configured
/// interval until the attempt budget is spent, then removes itself. A send
/// failure cancels this subscriber only.
async fn retry_loop(
    sender: Arc<dyn SmrSender>,
    tasks: Arc<Mutex<TaskMap>>,
    eid: Eid,
    subscriber: Subscriber,
    retry_count: u32,
    interval: Duration,
    generation: u64,
) {
    for attempt in 0..retry_count {
        if attempt > 0 {
            tokio::time::sleep(interval).await;
        }
        // fresh request per attempt; nothing outbound is shared or reused
        let request = build_solicitation(&eid, &subscriber);
        if let Err(e) = sender.send(request, &subscriber.rloc).await {
            warn!(
                "solicitation to {} for {} failed (attempt {}): {}",
                subscriber.rloc,
                eid,
                attempt + 1,
                e
            );
            break;
        }
        debug!(
            "solicited {} about {} (attempt {}/{})",
            subscriber.rloc,
            eid,
            attempt + 1,
            retry_count
        );
    }
    remove_if_current(&tasks, &eid, &subscriber, generation);
}

/// Self-cleanup at the end of a retry task. Removes the slot only when it
/// still belongs to this task's generation; a superseding `schedule` may
/// already have installed a successor under the same key.
fn remove_if_current(tasks: &Mutex<TaskMap>, eid: &Eid, subscriber: &Subscriber, generation: u64) {
    let mut tasks = lock(tasks);
    if let Some(handles) = tasks.get_mut(eid) {
        let current = handles
            .get(subscriber)
            .map_or(false, |slot| slot.generation == generation);
        if current {
            handles.remove(subscriber);
        }
        if handles.is_empty() {
            tasks.remove(eid);
        }
    }
}

/// The solicitation queries the subscriber's own declared source EID, not
/// the (possibly broader) prefix being notified about; the changed EID
/// rides in the source-EID field.
fn build_solicitation(changed: &Eid, subscriber: &Subscriber) -> MapRequest {
    MapRequest {
        authoritative: false,
        map_data_present: false,
        probe: false,
        smr: true,
        pitr: false,
        smr_invoked: false,
        nonce: rand::random(),
        source_eid: Some(changed.clone()),
        itr_rlocs: vec![Rloc(LispAddr::NoAddress)],
        eid_items: vec![subscriber.src_eid.clone()],
        source_rloc: None,
    }
}
