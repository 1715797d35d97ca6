// Warning service - records, counts and clears warnings, and runs the
// threshold check for manual warns.
//
// Consumed by the crosspost detector (automated warnings) and by the
// moderator commands. NO Discord dependencies here.

use super::pending_actions::PendingActions;
use super::warning_models::{
    ManualWarnOutcome, ManualWarning, NewWarning, PendingAction, PendingClaim, Warning, WarningKind,
};
use crate::core::page::{page_offset, Page, PAGE_SIZE};
use async_trait::async_trait;
use chrono::Utc;
use thiserror::Error;

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Error)]
pub enum WarningError {
    #[error("Storage error: {0}")]
    StorageError(String),
}

// ============================================================================
// STORAGE TRAIT (PORT)
// ============================================================================

/// Persistence for warnings. Every operation is scoped to a guild.
#[async_trait]
pub trait WarningStore: Send + Sync {
    async fn add(&self, warning: NewWarning) -> Result<Warning, WarningError>;

    /// Oldest first (warning #1 is the first one received).
    async fn list(&self, guild_id: u64, user_id: u64) -> Result<Vec<Warning>, WarningError>;

    async fn count(&self, guild_id: u64, user_id: u64) -> Result<u64, WarningError>;

    /// Delete one warning by id within `guild_id`. Returns whether a row went away.
    async fn delete_one(&self, warning_id: i64, guild_id: u64) -> Result<bool, WarningError>;

    /// Delete all of a user's warnings in a guild. Returns how many went away.
    async fn clear_all(&self, guild_id: u64, user_id: u64) -> Result<u64, WarningError>;

    /// Newest first, for the guild-wide history view.
    async fn list_guild(
        &self,
        guild_id: u64,
        limit: u32,
        offset: u32,
    ) -> Result<(Vec<Warning>, u64), WarningError>;
}

// ============================================================================
// CORE SERVICE
// ============================================================================

pub struct WarningService<S: WarningStore> {
    store: S,
    pending: PendingActions,
}

impl<S: WarningStore> WarningService<S> {
    pub fn new(store: S) -> Self {
        Self::with_pending(store, PendingActions::new())
    }

    pub fn with_pending(store: S, pending: PendingActions) -> Self {
        Self { store, pending }
    }

    pub async fn add(
        &self,
        guild_id: u64,
        user_id: u64,
        moderator_id: u64,
        reason: &str,
        kind: WarningKind,
    ) -> Result<Warning, WarningError> {
        let warning = self
            .store
            .add(NewWarning {
                guild_id,
                user_id,
                moderator_id,
                reason: reason.to_string(),
                kind,
                created_at: Utc::now(),
            })
            .await?;

        tracing::info!(
            guild_id,
            user_id,
            moderator_id,
            warning_id = warning.id,
            kind = kind.as_str(),
            "Warning recorded"
        );
        Ok(warning)
    }

    pub async fn list(&self, guild_id: u64, user_id: u64) -> Result<Vec<Warning>, WarningError> {
        self.store.list(guild_id, user_id).await
    }

    pub async fn count(&self, guild_id: u64, user_id: u64) -> Result<u64, WarningError> {
        self.store.count(guild_id, user_id).await
    }

    pub async fn delete_one(&self, warning_id: i64, guild_id: u64) -> Result<bool, WarningError> {
        self.store.delete_one(warning_id, guild_id).await
    }

    pub async fn clear_all(&self, guild_id: u64, user_id: u64) -> Result<u64, WarningError> {
        self.store.clear_all(guild_id, user_id).await
    }

    pub async fn guild_history(
        &self,
        guild_id: u64,
        page: Option<u32>,
    ) -> Result<Page<Warning>, WarningError> {
        let (page, offset) = page_offset(page);
        let (items, total) = self.store.list_guild(guild_id, PAGE_SIZE, offset).await?;
        Ok(Page::new(items, total, page))
    }

    /// Warn a user on a moderator's behalf.
    ///
    /// When the user already has `threshold` or more warnings nothing is
    /// written; the request is parked as a pending action instead so the
    /// moderator can choose between banning and warning anyway.
    pub async fn issue_manual(
        &self,
        request: ManualWarning,
        threshold: u32,
    ) -> Result<ManualWarnOutcome, WarningError> {
        let existing = self.store.list(request.guild_id, request.target_id).await?;

        if existing.len() as u64 >= threshold as u64 {
            let action_id = self.pending.insert(PendingAction {
                guild_id: request.guild_id,
                target_id: request.target_id,
                moderator_id: request.moderator_id,
                reason: request.reason,
                source: request.source,
            });
            tracing::debug!(
                guild_id = request.guild_id,
                target_id = request.target_id,
                action_id = %action_id,
                "Warning threshold reached, awaiting moderator decision"
            );
            return Ok(ManualWarnOutcome::NeedsConfirmation {
                action_id,
                existing,
                threshold,
            });
        }

        let warning = self
            .add(
                request.guild_id,
                request.target_id,
                request.moderator_id,
                &request.reason,
                WarningKind::Manual,
            )
            .await?;
        let total = self.store.count(request.guild_id, request.target_id).await?;
        Ok(ManualWarnOutcome::Issued { warning, total })
    }

    /// Peek at a pending action for `actor_id` without resolving it.
    pub fn pending_for(&self, action_id: &str, actor_id: u64) -> PendingClaim<PendingAction> {
        match self.pending.get(action_id) {
            None => PendingClaim::Expired,
            Some(action) if action.moderator_id != actor_id => PendingClaim::NotOwner,
            Some(action) => PendingClaim::Claimed(action),
        }
    }

    /// "Continue with warning": issue the parked warning exactly once.
    pub async fn confirm_pending(
        &self,
        action_id: &str,
        actor_id: u64,
    ) -> Result<PendingClaim<(PendingAction, Warning, u64)>, WarningError> {
        match self.pending_for(action_id, actor_id) {
            PendingClaim::Expired => return Ok(PendingClaim::Expired),
            PendingClaim::NotOwner => return Ok(PendingClaim::NotOwner),
            PendingClaim::Claimed(_) => {}
        }

        // A concurrent click may have taken it between the peek and here.
        let Some(action) = self.pending.take(action_id) else {
            return Ok(PendingClaim::Expired);
        };

        let warning = self
            .add(
                action.guild_id,
                action.target_id,
                action.moderator_id,
                &action.reason,
                WarningKind::Manual,
            )
            .await?;
        let total = self.store.count(action.guild_id, action.target_id).await?;
        Ok(PendingClaim::Claimed((action, warning, total)))
    }

    /// Drop a pending action once it has been resolved (ban) or cancelled.
    pub fn resolve_pending(&self, action_id: &str) -> bool {
        self.pending.remove(action_id)
    }

    /// Periodic maintenance hook; returns how many confirmations lapsed.
    pub fn purge_expired_pending(&self) -> usize {
        self.pending.purge_expired()
    }
}
