//! Roster: the auditor's table of musicians heard recently.
//!
//! Keyed on the musician's uuid. Written by the ingestion loop, pruned by
//! whoever asks for a snapshot. There is no background expiry unless the
//! auditor enables its sweeper, so with no queries and no sweeper an entry
//! lives until the process exits.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tokio::sync::Mutex;

use orchestra_core::wire::{ActiveMusician, Instrument};

/// A musician as last seen by the auditor.
#[derive(Debug, Clone, PartialEq)]
pub struct MusicianEntry {
    pub uuid: String,
    /// `None` when the announced sound is not in the instrument table.
    pub instrument: Option<Instrument>,
    /// Timestamp carried by the latest announcement (musician's clock).
    pub last_seen: DateTime<Utc>,
}

impl MusicianEntry {
    /// Strictly older than `threshold`. An entry exactly `threshold` old is still active.
    ///
    /// The age is compared at full timestamp precision, not rounded down to
    /// whole seconds, so with a 5 s threshold an entry 5.001 s old is stale.
    pub fn is_stale(&self, now: DateTime<Utc>, threshold: Duration) -> bool {
        now.signed_duration_since(self.last_seen) > threshold
    }
}

impl From<MusicianEntry> for ActiveMusician {
    fn from(entry: MusicianEntry) -> Self {
        ActiveMusician {
            uuid: entry.uuid,
            instrument: entry.instrument,
            active_since: entry.last_seen,
        }
    }
}

/// What `upsert` did with an announcement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// First announcement from this uuid.
    Inserted,
    /// Existing entry overwritten.
    Refreshed,
    /// Older than the recorded entry; only with out-of-order rejection enabled.
    Ignored,
}

/// Shared handle to the roster. Cloning shares the same table.
///
/// One mutex guards the whole map so an upsert can never interleave with a
/// prune pass, and two prune passes never race on the same entry.
#[derive(Debug, Clone, Default)]
pub struct Roster {
    entries: Arc<Mutex<HashMap<String, MusicianEntry>>>,
    reject_out_of_order: bool,
}

impl Roster {
    /// Last-write-wins roster: every announcement overwrites, even an older one.
    pub fn new() -> Self {
        Self::default()
    }

    /// Roster that keeps the newest timestamp per musician when `reject` is set.
    pub fn with_out_of_order_rejection(reject: bool) -> Self {
        Self {
            entries: Arc::default(),
            reject_out_of_order: reject,
        }
    }

    /// Insert or overwrite the entry for `uuid`. Never fails.
    pub async fn upsert(
        &self,
        uuid: impl Into<String>,
        instrument: Option<Instrument>,
        timestamp: DateTime<Utc>,
    ) -> UpsertOutcome {
        let mut entries = self.entries.lock().await;
        match entries.entry(uuid.into()) {
            Entry::Vacant(slot) => {
                let uuid = slot.key().clone();
                slot.insert(MusicianEntry {
                    uuid,
                    instrument,
                    last_seen: timestamp,
                });
                UpsertOutcome::Inserted
            }
            Entry::Occupied(mut slot) => {
                let entry = slot.get_mut();
                if self.reject_out_of_order && timestamp < entry.last_seen {
                    return UpsertOutcome::Ignored;
                }
                entry.instrument = instrument;
                entry.last_seen = timestamp;
                UpsertOutcome::Refreshed
            }
        }
    }

    /// Drop every entry older than `threshold` and return the survivors.
    ///
    /// Order of the returned entries is unspecified.
    pub async fn prune_and_list(&self, now: DateTime<Utc>, threshold: Duration) -> Vec<MusicianEntry> {
        let mut entries = self.entries.lock().await;
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_stale(now, threshold));

        let removed = before - entries.len();
        if removed > 0 {
            tracing::debug!(removed, remaining = entries.len(), "pruned stale musicians");
        }

        entries.values().cloned().collect()
    }

    /// `prune_and_list` shaped for the query wire format.
    pub async fn snapshot(&self, now: DateTime<Utc>, threshold: Duration) -> Vec<ActiveMusician> {
        self.prune_and_list(now, threshold)
            .await
            .into_iter()
            .map(ActiveMusician::from)
            .collect()
    }

    /// Drop stale entries without listing. Returns how many were removed.
    pub async fn sweep(&self, now: DateTime<Utc>, threshold: Duration) -> usize {
        let mut entries = self.entries.lock().await;
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_stale(now, threshold));
        before - entries.len()
    }

    /// Number of entries, stale ones included.
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }

    pub async fn get(&self, uuid: &str) -> Option<MusicianEntry> {
        self.entries.lock().await.get(uuid).cloned()
    }
}
