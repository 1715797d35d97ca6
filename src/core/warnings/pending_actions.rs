// Pending moderator decisions (ban vs. keep warning).
//
// Entries live only in memory and only for the length of one interactive
// confirmation. Each insert schedules its own eviction; reads also check the
// deadline so an entry is never handed out past its TTL even if the eviction
// task has not run yet.

use super::warning_models::PendingAction;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// How long a moderator has to resolve a confirmation.
pub const PENDING_ACTION_TTL: Duration = Duration::from_secs(15 * 60);

struct PendingEntry {
    action: PendingAction,
    expires_at: Instant,
}

pub struct PendingActions {
    entries: Arc<DashMap<String, PendingEntry>>,
    ttl: Duration,
}

impl PendingActions {
    pub fn new() -> Self {
        Self::with_ttl(PENDING_ACTION_TTL)
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
            ttl,
        }
    }

    /// Store an action and return its opaque id. Must be called inside a
    /// Tokio runtime (the eviction timer is a spawned task).
    pub fn insert(&self, action: PendingAction) -> String {
        let expires_at = Instant::now() + self.ttl;
        let id = loop {
            let candidate = format!("{:08x}", rand::random::<u32>());
            if !self.entries.contains_key(&candidate) {
                break candidate;
            }
        };

        self.entries
            .insert(id.clone(), PendingEntry { action, expires_at });

        let entries = Arc::clone(&self.entries);
        let key = id.clone();
        let ttl = self.ttl;
        tokio::spawn(async move {
            tokio::time::sleep(ttl).await;
            entries.remove_if(&key, |_, entry| entry.expires_at <= Instant::now());
        });

        id
    }

    /// Look at an unexpired action without resolving it.
    pub fn get(&self, id: &str) -> Option<PendingAction> {
        self.entries
            .get(id)
            .filter(|entry| entry.expires_at > Instant::now())
            .map(|entry| entry.action.clone())
    }

    /// Remove and return an unexpired action. At most one caller gets it.
    pub fn take(&self, id: &str) -> Option<PendingAction> {
        self.entries
            .remove(id)
            .filter(|(_, entry)| entry.expires_at > Instant::now())
            .map(|(_, entry)| entry.action)
    }

    /// Drop an action; no-op if it is already gone.
    pub fn remove(&self, id: &str) -> bool {
        self.entries.remove(id).is_some()
    }

    /// Evict everything past its deadline. Returns how many were dropped.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.expires_at > now);
        before.saturating_sub(self.entries.len())
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

impl Default for PendingActions {
    fn default() -> Self {
        Self::new()
    }
}
