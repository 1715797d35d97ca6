// Crosspost detector - the per-message pipeline.
//
// For every guild message:
// - filter out bots, DMs, empty and very short content
// - skip exempt channels and staff (their messages are still cached)
// - compare against the author's recent messages in *other* channels
// - on a match, remove both copies, record an incident, and either post a
//   first-offense notice or escalate to a formal warning
//
// NO Discord dependencies here. Side effects on the chat platform go through
// the `ModerationGateway` port; persistence through `MessageCache` and
// `IncidentLedger`.

use super::crosspost_models::{
    CachedMessage, CrosspostIncident, CrosspostOutcome, CrosspostVerdict, IgnoreReason,
    InboundMessage, IncidentAction, NewIncident, Notice,
};
use super::normalizer::{normalized_len, MIN_MESSAGE_LENGTH};
use super::similarity::similarity;
use crate::core::access::is_exempt;
use crate::core::page::{page_offset, Page, PAGE_SIZE};
use crate::core::settings::{SettingsError, SettingsService, SettingsStore};
use crate::core::warnings::{WarningError, WarningKind, WarningService, WarningStore};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use thiserror::Error;

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Error)]
pub enum CrosspostError {
    #[error("Storage error: {0}")]
    StorageError(String),

    #[error(transparent)]
    Settings(#[from] SettingsError),

    #[error(transparent)]
    Warnings(#[from] WarningError),
}

/// A chat-platform call that failed (missing permission, message gone, ...).
#[derive(Debug, Error)]
#[error("{0}")]
pub struct GatewayError(pub String);

// ============================================================================
// STORAGE TRAITS (PORTS)
// ============================================================================

/// Short-lived store of recent messages.
#[async_trait]
pub trait MessageCache: Send + Sync {
    /// Insert or replace by message id.
    async fn put(&self, message: CachedMessage) -> Result<(), CrosspostError>;

    /// The user's messages in `guild_id` from channels other than
    /// `exclude_channel`, created strictly after `since`, newest first.
    async fn recent(
        &self,
        guild_id: u64,
        user_id: u64,
        exclude_channel: u64,
        since: DateTime<Utc>,
    ) -> Result<Vec<CachedMessage>, CrosspostError>;

    async fn remove(&self, message_id: u64) -> Result<(), CrosspostError>;

    /// Drop everything created before `older_than`. Returns the number removed.
    async fn expire(&self, older_than: DateTime<Utc>) -> Result<u64, CrosspostError>;
}

/// Append-only incident history.
#[async_trait]
pub trait IncidentLedger: Send + Sync {
    async fn record(&self, incident: NewIncident) -> Result<CrosspostIncident, CrosspostError>;

    /// Incidents for the user created strictly after `since`.
    async fn count_since(
        &self,
        guild_id: u64,
        user_id: u64,
        since: DateTime<Utc>,
    ) -> Result<u64, CrosspostError>;

    /// Newest first, plus the guild total.
    async fn list_guild(
        &self,
        guild_id: u64,
        limit: u32,
        offset: u32,
    ) -> Result<(Vec<CrosspostIncident>, u64), CrosspostError>;
}

/// Chat-platform side effects the detector needs.
#[async_trait]
pub trait ModerationGateway: Send + Sync {
    /// Recorded as the moderator on automated warnings.
    fn bot_user_id(&self) -> u64;

    async fn delete_message(&self, channel_id: u64, message_id: u64) -> Result<(), GatewayError>;

    async fn send_notice(&self, channel_id: u64, notice: &Notice) -> Result<(), GatewayError>;
}

// ============================================================================
// CORE SERVICE
// ============================================================================

pub struct CrosspostDetector<C, L, S, W>
where
    C: MessageCache,
    L: IncidentLedger,
    S: SettingsStore,
    W: WarningStore,
{
    cache: C,
    ledger: L,
    settings: Arc<SettingsService<S>>,
    warnings: Arc<WarningService<W>>,
}

impl<C, L, S, W> CrosspostDetector<C, L, S, W>
where
    C: MessageCache,
    L: IncidentLedger,
    S: SettingsStore,
    W: WarningStore,
{
    pub fn new(
        cache: C,
        ledger: L,
        settings: Arc<SettingsService<S>>,
        warnings: Arc<WarningService<W>>,
    ) -> Self {
        Self {
            cache,
            ledger,
            settings,
            warnings,
        }
    }

    /// Run one message through the pipeline.
    ///
    /// Platform failures (deleting, posting) are logged and reported in the
    /// outcome; only storage failures are returned as errors.
    pub async fn on_message<G: ModerationGateway>(
        &self,
        msg: &InboundMessage,
        gateway: &G,
    ) -> Result<CrosspostVerdict, CrosspostError> {
        if msg.author_is_bot {
            return Ok(CrosspostVerdict::Ignored(IgnoreReason::Bot));
        }
        let Some(guild_id) = msg.guild_id else {
            return Ok(CrosspostVerdict::Ignored(IgnoreReason::DirectMessage));
        };
        if msg.content.trim().is_empty() {
            return Ok(CrosspostVerdict::Ignored(IgnoreReason::EmptyContent));
        }
        if normalized_len(&msg.content) < MIN_MESSAGE_LENGTH {
            return Ok(CrosspostVerdict::Ignored(IgnoreReason::TooShort));
        }

        let settings = self.settings.get(guild_id).await?;
        let cached = CachedMessage {
            guild_id,
            channel_id: msg.channel_id,
            user_id: msg.author_id,
            message_id: msg.message_id,
            content: msg.content.clone(),
            created_at: msg.received_at,
        };

        if settings.is_exempt_channel(msg.channel_id) {
            self.cache.put(cached).await?;
            return Ok(CrosspostVerdict::Ignored(IgnoreReason::ExemptChannel));
        }

        let Some(member) = &msg.member else {
            return Ok(CrosspostVerdict::Ignored(IgnoreReason::MemberUnavailable));
        };
        if is_exempt(member, &settings) {
            self.cache.put(cached).await?;
            return Ok(CrosspostVerdict::Ignored(IgnoreReason::ExemptMember));
        }

        let since = msg.received_at - Duration::seconds(settings.detection_window_secs as i64);
        let candidates = self
            .cache
            .recent(guild_id, msg.author_id, msg.channel_id, since)
            .await?;

        let threshold = settings.crosspost_threshold as f64;
        let mut best: Option<(f64, CachedMessage)> = None;
        for candidate in candidates {
            let score = similarity(&msg.content, &candidate.content);
            if score < threshold {
                continue;
            }
            // Candidates arrive newest first, so ties keep the most recent.
            if best.as_ref().map_or(true, |(best_score, _)| score > *best_score) {
                best = Some((score, candidate));
            }
        }

        self.cache.put(cached).await?;

        let Some((score, original)) = best else {
            return Ok(CrosspostVerdict::Clean);
        };

        tracing::info!(
            guild_id,
            user_id = msg.author_id,
            duplicate_channel = msg.channel_id,
            original_channel = original.channel_id,
            similarity = score,
            "Crosspost detected"
        );

        let deleted_duplicate = delete_logged(gateway, msg.channel_id, msg.message_id).await;
        let deleted_original =
            delete_logged(gateway, original.channel_id, original.message_id).await;

        self.cache.remove(msg.message_id).await?;
        self.cache.remove(original.message_id).await?;

        let prior = self
            .count_recent_incidents(
                guild_id,
                msg.author_id,
                settings.repeat_window_hours,
                msg.received_at,
            )
            .await?;
        let action = if prior > 0 {
            IncidentAction::Warned
        } else {
            IncidentAction::Deleted
        };

        let incident = self
            .ledger
            .record(NewIncident {
                guild_id,
                user_id: msg.author_id,
                original_message_id: original.message_id,
                duplicate_message_id: msg.message_id,
                original_channel_id: original.channel_id,
                duplicate_channel_id: msg.channel_id,
                original_content: original.content.clone(),
                duplicate_content: msg.content.clone(),
                similarity: score,
                action,
                created_at: msg.received_at,
            })
            .await?;

        let (notice, warning_count) = match action {
            IncidentAction::Deleted => (
                Notice {
                    content: settings.first_offense_notice(msg.author_id),
                    view_warnings_for: None,
                },
                None,
            ),
            IncidentAction::Warned => {
                let reason = format!(
                    "Repeated crossposting between channels (similarity: {:.1}%)",
                    score
                );
                self.warnings
                    .add(
                        guild_id,
                        msg.author_id,
                        gateway.bot_user_id(),
                        &reason,
                        WarningKind::Crosspost,
                    )
                    .await?;
                let count = self.warnings.count(guild_id, msg.author_id).await?;
                (
                    Notice {
                        content: settings.repeat_offense_notice(msg.author_id, count),
                        view_warnings_for: Some(msg.author_id),
                    },
                    Some(count),
                )
            }
        };

        let notice_sent = match gateway.send_notice(msg.channel_id, &notice).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(channel_id = msg.channel_id, "Failed to send crosspost notice: {}", e);
                false
            }
        };

        Ok(CrosspostVerdict::Crosspost(CrosspostOutcome {
            incident,
            warning_count,
            deleted_duplicate,
            deleted_original,
            notice_sent,
        }))
    }

    /// Drop cached messages older than `retention`. Returns the number removed.
    pub async fn expire_cache(
        &self,
        now: DateTime<Utc>,
        retention: Duration,
    ) -> Result<u64, CrosspostError> {
        let removed = self.cache.expire(now - retention).await?;
        if removed > 0 {
            tracing::debug!(removed, "Expired cached messages");
        }
        Ok(removed)
    }

    /// Incidents for a user in the `hours` before `now`.
    pub async fn count_recent_incidents(
        &self,
        guild_id: u64,
        user_id: u64,
        hours: u32,
        now: DateTime<Utc>,
    ) -> Result<u64, CrosspostError> {
        let since = now - Duration::hours(hours as i64);
        self.ledger.count_since(guild_id, user_id, since).await
    }

    pub async fn incident_history(
        &self,
        guild_id: u64,
        page: Option<u32>,
    ) -> Result<Page<CrosspostIncident>, CrosspostError> {
        let (page, offset) = page_offset(page);
        let (items, total) = self.ledger.list_guild(guild_id, PAGE_SIZE, offset).await?;
        Ok(Page::new(items, total, page))
    }
}

async fn delete_logged<G: ModerationGateway>(gateway: &G, channel_id: u64, message_id: u64) -> bool {
    match gateway.delete_message(channel_id, message_id).await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(channel_id, message_id, "Failed to delete crossposted message: {}", e);
            false
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::access::MemberAccess;
    use crate::core::settings::settings_service::tests::MockSettingsStore;
    use crate::core::settings::SettingUpdate;
    use crate::core::warnings::warning_service::tests::MockWarningStore;
    use chrono::TimeZone;
    use dashmap::DashMap;
    use std::sync::atomic::{AtomicI64, Ordering};
    use std::sync::Mutex;

    const GUILD: u64 = 1;
    const USER: u64 = 2;
    const BOT: u64 = 999;

    /// In-memory store for testing
    #[derive(Default)]
    struct MockCache {
        rows: DashMap<u64, CachedMessage>,
    }

    #[async_trait]
    impl MessageCache for MockCache {
        async fn put(&self, message: CachedMessage) -> Result<(), CrosspostError> {
            self.rows.insert(message.message_id, message);
            Ok(())
        }

        async fn recent(
            &self,
            guild_id: u64,
            user_id: u64,
            exclude_channel: u64,
            since: DateTime<Utc>,
        ) -> Result<Vec<CachedMessage>, CrosspostError> {
            let mut rows: Vec<CachedMessage> = self
                .rows
                .iter()
                .filter(|m| {
                    m.guild_id == guild_id
                        && m.user_id == user_id
                        && m.channel_id != exclude_channel
                        && m.created_at > since
                })
                .map(|m| m.clone())
                .collect();
            rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            Ok(rows)
        }

        async fn remove(&self, message_id: u64) -> Result<(), CrosspostError> {
            self.rows.remove(&message_id);
            Ok(())
        }

        async fn expire(&self, older_than: DateTime<Utc>) -> Result<u64, CrosspostError> {
            let before = self.rows.len();
            self.rows.retain(|_, m| m.created_at >= older_than);
            Ok((before - self.rows.len()) as u64)
        }
    }

    #[derive(Default)]
    struct MockLedger {
        rows: Mutex<Vec<CrosspostIncident>>,
        next_id: AtomicI64,
    }

    #[async_trait]
    impl IncidentLedger for MockLedger {
        async fn record(&self, incident: NewIncident) -> Result<CrosspostIncident, CrosspostError> {
            let stored = CrosspostIncident {
                id: self.next_id.fetch_add(1, Ordering::SeqCst) + 1,
                guild_id: incident.guild_id,
                user_id: incident.user_id,
                original_message_id: incident.original_message_id,
                duplicate_message_id: incident.duplicate_message_id,
                original_channel_id: incident.original_channel_id,
                duplicate_channel_id: incident.duplicate_channel_id,
                original_content: incident.original_content,
                duplicate_content: incident.duplicate_content,
                similarity: incident.similarity,
                action: incident.action,
                created_at: incident.created_at,
            };
            self.rows.lock().unwrap().push(stored.clone());
            Ok(stored)
        }

        async fn count_since(
            &self,
            guild_id: u64,
            user_id: u64,
            since: DateTime<Utc>,
        ) -> Result<u64, CrosspostError> {
            Ok(self
                .rows
                .lock()
                .unwrap()
                .iter()
                .filter(|i| i.guild_id == guild_id && i.user_id == user_id && i.created_at > since)
                .count() as u64)
        }

        async fn list_guild(
            &self,
            guild_id: u64,
            limit: u32,
            offset: u32,
        ) -> Result<(Vec<CrosspostIncident>, u64), CrosspostError> {
            let mut rows: Vec<CrosspostIncident> = self
                .rows
                .lock()
                .unwrap()
                .iter()
                .filter(|i| i.guild_id == guild_id)
                .cloned()
                .collect();
            rows.reverse();
            let total = rows.len() as u64;
            let page = rows
                .into_iter()
                .skip(offset as usize)
                .take(limit as usize)
                .collect();
            Ok((page, total))
        }
    }

    /// Records every platform call instead of performing it.
    #[derive(Default)]
    struct RecordingGateway {
        deleted: Mutex<Vec<(u64, u64)>>,
        notices: Mutex<Vec<(u64, Notice)>>,
        fail_deletes: bool,
    }

    #[async_trait]
    impl ModerationGateway for RecordingGateway {
        fn bot_user_id(&self) -> u64 {
            BOT
        }

        async fn delete_message(&self, channel_id: u64, message_id: u64) -> Result<(), GatewayError> {
            if self.fail_deletes {
                return Err(GatewayError("Missing Permissions".into()));
            }
            self.deleted.lock().unwrap().push((channel_id, message_id));
            Ok(())
        }

        async fn send_notice(&self, channel_id: u64, notice: &Notice) -> Result<(), GatewayError> {
            self.notices.lock().unwrap().push((channel_id, notice.clone()));
            Ok(())
        }
    }

    type TestDetector = CrosspostDetector<MockCache, MockLedger, MockSettingsStore, MockWarningStore>;

    fn detector() -> (TestDetector, Arc<SettingsService<MockSettingsStore>>, Arc<WarningService<MockWarningStore>>) {
        let settings = Arc::new(SettingsService::new(MockSettingsStore::default()));
        let warnings = Arc::new(WarningService::new(MockWarningStore::default()));
        let detector = CrosspostDetector::new(
            MockCache::default(),
            MockLedger::default(),
            Arc::clone(&settings),
            Arc::clone(&warnings),
        );
        (detector, settings, warnings)
    }

    fn base() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap()
    }

    fn message(channel_id: u64, message_id: u64, content: &str, at_secs: i64) -> InboundMessage {
        InboundMessage {
            guild_id: Some(GUILD),
            channel_id,
            message_id,
            author_id: USER,
            author_is_bot: false,
            content: content.to_string(),
            received_at: base() + Duration::seconds(at_secs),
            member: Some(MemberAccess::default()),
        }
    }

    const TEXT: &str = "Looking for a duo partner for ranked tonight";

    #[tokio::test]
    async fn test_first_offense_deletes_both_and_notifies() {
        let (detector, _, warnings) = detector();
        let gateway = RecordingGateway::default();

        let first = detector.on_message(&message(10, 100, TEXT, 0), &gateway).await.unwrap();
        assert_eq!(first, CrosspostVerdict::Clean);

        let verdict = detector.on_message(&message(11, 101, TEXT, 5), &gateway).await.unwrap();
        let CrosspostVerdict::Crosspost(outcome) = verdict else {
            panic!("expected crosspost, got {verdict:?}");
        };

        assert_eq!(outcome.incident.action, IncidentAction::Deleted);
        assert_eq!(outcome.incident.original_message_id, 100);
        assert_eq!(outcome.incident.duplicate_channel_id, 11);
        assert_eq!(outcome.incident.similarity, 100.0);
        assert_eq!(outcome.warning_count, None);
        assert!(outcome.deleted_duplicate && outcome.deleted_original && outcome.notice_sent);

        assert_eq!(*gateway.deleted.lock().unwrap(), vec![(11, 101), (10, 100)]);
        let notices = gateway.notices.lock().unwrap();
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].0, 11);
        assert!(notices[0].1.content.starts_with("<@2>, please do not crosspost"));
        assert_eq!(notices[0].1.view_warnings_for, None);

        assert!(detector.cache.rows.is_empty());
        assert_eq!(warnings.count(GUILD, USER).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_repeat_offense_issues_warning() {
        let (detector, _, warnings) = detector();
        let gateway = RecordingGateway::default();

        detector.on_message(&message(10, 100, TEXT, 0), &gateway).await.unwrap();
        detector.on_message(&message(11, 101, TEXT, 5), &gateway).await.unwrap();

        // An hour later, same thing again.
        detector.on_message(&message(10, 102, TEXT, 3600), &gateway).await.unwrap();
        let verdict = detector
            .on_message(&message(12, 103, TEXT, 3610), &gateway)
            .await
            .unwrap();
        let CrosspostVerdict::Crosspost(outcome) = verdict else {
            panic!("expected crosspost, got {verdict:?}");
        };

        assert_eq!(outcome.incident.action, IncidentAction::Warned);
        assert_eq!(outcome.warning_count, Some(1));

        let list = warnings.list(GUILD, USER).await.unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].kind, WarningKind::Crosspost);
        assert_eq!(list[0].moderator_id, BOT);
        assert_eq!(
            list[0].reason,
            "Repeated crossposting between channels (similarity: 100.0%)"
        );

        let notices = gateway.notices.lock().unwrap();
        let last = &notices.last().unwrap().1;
        assert!(last.content.contains("warning #1"));
        assert_eq!(last.view_warnings_for, Some(USER));
    }

    #[tokio::test]
    async fn test_near_duplicate_scores_below_100_and_escalates() {
        let (detector, _, warnings) = detector();
        let gateway = RecordingGateway::default();
        let original = "Please check out our new channel for announcements";
        let copy = "Please check out our new channel for announcement";

        detector.on_message(&message(10, 100, original, 0), &gateway).await.unwrap();
        let verdict = detector.on_message(&message(11, 101, copy, 5), &gateway).await.unwrap();
        let CrosspostVerdict::Crosspost(outcome) = verdict else {
            panic!("expected crosspost, got {verdict:?}");
        };

        assert_eq!(outcome.incident.action, IncidentAction::Deleted);
        assert!(outcome.incident.similarity >= 80.0 && outcome.incident.similarity < 100.0);
        assert_eq!(outcome.incident.original_content, original);
        assert_eq!(outcome.incident.duplicate_content, copy);
        assert_eq!(*gateway.deleted.lock().unwrap(), vec![(11, 101), (10, 100)]);
        assert!(detector.cache.rows.is_empty());

        let before = warnings.count(GUILD, USER).await.unwrap();
        detector.on_message(&message(10, 102, original, 3600), &gateway).await.unwrap();
        let verdict = detector
            .on_message(&message(11, 103, copy, 3605), &gateway)
            .await
            .unwrap();
        let CrosspostVerdict::Crosspost(outcome) = verdict else {
            panic!("expected crosspost, got {verdict:?}");
        };

        assert_eq!(outcome.incident.action, IncidentAction::Warned);
        assert!(outcome.incident.similarity < 100.0);
        assert_eq!(warnings.count(GUILD, USER).await.unwrap(), before + 1);
        assert_eq!(outcome.warning_count, Some(before + 1));
    }

    #[tokio::test]
    async fn test_same_channel_and_outside_window_not_matched() {
        let (detector, _, _) = detector();
        let gateway = RecordingGateway::default();

        detector.on_message(&message(10, 100, TEXT, 0), &gateway).await.unwrap();
        // Same channel.
        assert_eq!(
            detector.on_message(&message(10, 101, TEXT, 5), &gateway).await.unwrap(),
            CrosspostVerdict::Clean
        );
        // Different channel, but after the 30 second window.
        assert_eq!(
            detector.on_message(&message(11, 102, TEXT, 40), &gateway).await.unwrap(),
            CrosspostVerdict::Clean
        );
        assert!(gateway.deleted.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_dissimilar_content_is_clean() {
        let (detector, _, _) = detector();
        let gateway = RecordingGateway::default();

        detector.on_message(&message(10, 100, TEXT, 0), &gateway).await.unwrap();
        let verdict = detector
            .on_message(&message(11, 101, "Does anyone know when the patch drops?", 5), &gateway)
            .await
            .unwrap();
        assert_eq!(verdict, CrosspostVerdict::Clean);
        assert_eq!(detector.cache.rows.len(), 2);
    }

    #[tokio::test]
    async fn test_tie_prefers_most_recent_candidate() {
        let (detector, _, _) = detector();
        let gateway = RecordingGateway::default();

        for (channel, id, at) in [(20, 200, 10), (21, 201, 12)] {
            detector
                .cache
                .put(CachedMessage {
                    guild_id: GUILD,
                    channel_id: channel,
                    user_id: USER,
                    message_id: id,
                    content: TEXT.to_string(),
                    created_at: base() + Duration::seconds(at),
                })
                .await
                .unwrap();
        }

        let verdict = detector.on_message(&message(22, 202, TEXT, 15), &gateway).await.unwrap();
        let CrosspostVerdict::Crosspost(outcome) = verdict else {
            panic!("expected crosspost, got {verdict:?}");
        };
        assert_eq!(outcome.incident.original_message_id, 201);
    }

    #[tokio::test]
    async fn test_delete_failures_are_tolerated() {
        let (detector, _, _) = detector();
        let gateway = RecordingGateway {
            fail_deletes: true,
            ..Default::default()
        };

        detector.on_message(&message(10, 100, TEXT, 0), &gateway).await.unwrap();
        let verdict = detector.on_message(&message(11, 101, TEXT, 5), &gateway).await.unwrap();
        let CrosspostVerdict::Crosspost(outcome) = verdict else {
            panic!("expected crosspost, got {verdict:?}");
        };

        assert!(!outcome.deleted_duplicate);
        assert!(!outcome.deleted_original);
        assert!(outcome.notice_sent);
        assert_eq!(detector.ledger.rows.lock().unwrap().len(), 1);
        assert!(detector.cache.rows.is_empty());
    }

    #[tokio::test]
    async fn test_filters() {
        let (detector, _, _) = detector();
        let gateway = RecordingGateway::default();

        let mut bot = message(10, 1, TEXT, 0);
        bot.author_is_bot = true;
        let mut dm = message(10, 2, TEXT, 0);
        dm.guild_id = None;
        let empty = message(10, 3, "   ", 0);
        let short = message(10, 4, "**hi** <@123> https://x.y", 0);
        let mut no_member = message(10, 5, TEXT, 0);
        no_member.member = None;

        for (msg, reason) in [
            (bot, IgnoreReason::Bot),
            (dm, IgnoreReason::DirectMessage),
            (empty, IgnoreReason::EmptyContent),
            (short, IgnoreReason::TooShort),
            (no_member, IgnoreReason::MemberUnavailable),
        ] {
            assert_eq!(
                detector.on_message(&msg, &gateway).await.unwrap(),
                CrosspostVerdict::Ignored(reason)
            );
        }
        assert!(detector.cache.rows.is_empty());
    }

    #[tokio::test]
    async fn test_exempt_channel_and_member_are_cached_but_not_checked() {
        let (detector, settings, _) = detector();
        let gateway = RecordingGateway::default();
        settings.add_exempt_channel(GUILD, 10).await.unwrap();

        assert_eq!(
            detector.on_message(&message(10, 100, TEXT, 0), &gateway).await.unwrap(),
            CrosspostVerdict::Ignored(IgnoreReason::ExemptChannel)
        );

        let mut staff = message(11, 101, TEXT, 1);
        staff.member = Some(MemberAccess {
            administrator: true,
            ..Default::default()
        });
        assert_eq!(
            detector.on_message(&staff, &gateway).await.unwrap(),
            CrosspostVerdict::Ignored(IgnoreReason::ExemptMember)
        );
        assert_eq!(detector.cache.rows.len(), 2);

        // A later non-exempt post still matches the exempt-channel copy.
        let verdict = detector.on_message(&message(12, 102, TEXT, 2), &gateway).await.unwrap();
        assert!(matches!(verdict, CrosspostVerdict::Crosspost(_)));
    }

    #[tokio::test]
    async fn test_custom_threshold_and_template() {
        let (detector, settings, _) = detector();
        let gateway = RecordingGateway::default();
        settings
            .apply(GUILD, SettingUpdate::CrosspostThreshold(100))
            .await
            .unwrap();
        settings
            .apply(
                GUILD,
                SettingUpdate::FirstOffenseMessage(Some("{user} one channel please".into())),
            )
            .await
            .unwrap();

        detector.on_message(&message(10, 100, TEXT, 0), &gateway).await.unwrap();
        // One character off: no longer enough at 100.
        assert_eq!(
            detector
                .on_message(&message(11, 101, "Looking for a duo partner for ranked tonight?", 1), &gateway)
                .await
                .unwrap(),
            CrosspostVerdict::Clean
        );
        // Case differences normalize away.
        let verdict = detector
            .on_message(&message(12, 102, "LOOKING FOR A DUO PARTNER FOR RANKED TONIGHT", 2), &gateway)
            .await
            .unwrap();
        assert!(matches!(verdict, CrosspostVerdict::Crosspost(_)));
        assert_eq!(
            gateway.notices.lock().unwrap()[0].1.content,
            "<@2> one channel please"
        );
    }

    #[tokio::test]
    async fn test_expire_cache_and_history() {
        let (detector, _, _) = detector();
        let gateway = RecordingGateway::default();

        detector.on_message(&message(10, 100, TEXT, 0), &gateway).await.unwrap();
        detector
            .on_message(&message(11, 101, "Something entirely different here", 0), &gateway)
            .await
            .unwrap();
        let removed = detector
            .expire_cache(base() + Duration::hours(49), Duration::hours(48))
            .await
            .unwrap();
        assert_eq!(removed, 2);

        let history = detector.incident_history(GUILD, None).await.unwrap();
        assert_eq!(history.total, 0);
        assert_eq!(history.total_pages, 0);
    }
}
