use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, warn};

use crate::config::{StarboardChannelConfig, TierConfig};
use crate::db::{StarboardEntry, StarboardStore};

/// Sending side of the starboard channel. Implemented over the Discord REST
/// client at runtime and by in-memory fakes in tests.
#[async_trait]
pub trait HighlightGateway: Send + Sync {
    async fn send_highlight(&self, payload: &HighlightPayload) -> Result<String>;
    async fn edit_highlight(&self, highlight_message_id: &str, payload: &HighlightPayload)
    -> Result<()>;
    async fn delete_highlight(&self, highlight_message_id: &str) -> Result<()>;
}

/// A source message reduced to what highlight composition needs. Content is
/// expected to be mention-cleaned by the event layer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourceMessage {
    pub message_id: String,
    pub channel_id: String,
    pub guild_id: String,
    pub author_id: String,
    pub author_name: String,
    pub author_avatar_url: Option<String>,
    pub content: String,
    pub timestamp_secs: i64,
    pub nsfw_channel: bool,
    pub attachments: Vec<AttachmentLink>,
    pub embeds: Vec<serde_json::Value>,
    pub reply: Option<ReplySummary>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AttachmentLink {
    pub filename: String,
    pub url: String,
    pub is_image: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReplySummary {
    pub author_name: String,
    pub author_avatar_url: Option<String>,
    pub jump_url: String,
    pub content: String,
    pub image_url: Option<String>,
    pub timestamp_secs: i64,
}

/// Everything needed to render one highlight message, with named fields
/// instead of an ad-hoc payload merge.
#[derive(Debug, Clone, PartialEq)]
pub struct HighlightPayload {
    pub content: String,
    pub color: u32,
    pub author_name: String,
    pub author_icon_url: Option<String>,
    pub description: String,
    pub image_url: Option<String>,
    pub jump_url: String,
    pub timestamp_secs: i64,
    pub reply: Option<ReplySummary>,
    pub forwarded_embeds: Vec<serde_json::Value>,
    pub attachment_links: Vec<AttachmentLink>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum SyncAction {
    /// No row, below threshold: nothing to do and no row is created.
    Ignore,
    /// Send a fresh highlight (no row yet, or a row without a live highlight).
    Publish,
    /// Edit the existing highlight in place.
    Refresh { highlight_id: String },
    /// Delete the highlight, clear the id, zero the counter.
    Retract { highlight_id: String },
    /// Below threshold with no highlight: just zero the counter.
    Reset,
}

/// The decision table from the sync operation, as a pure function.
pub(crate) fn plan_sync(
    existing: Option<&StarboardEntry>,
    stars: u32,
    minimum: u32,
) -> SyncAction {
    let qualified = stars >= minimum;
    match existing {
        None if qualified => SyncAction::Publish,
        None => SyncAction::Ignore,
        Some(entry) => match (entry.highlight_message_id.as_deref(), qualified) {
            (Some(id), true) if !id.is_empty() => SyncAction::Refresh {
                highlight_id: id.to_string(),
            },
            (Some(id), false) if !id.is_empty() => SyncAction::Retract {
                highlight_id: id.to_string(),
            },
            (_, true) => SyncAction::Publish,
            (_, false) => SyncAction::Reset,
        },
    }
}

pub fn tier_for(tiers: &[TierConfig], stars: u32) -> &TierConfig {
    tiers
        .iter()
        .filter(|t| t.threshold <= stars)
        .max_by_key(|t| t.threshold)
        .unwrap_or(&tiers[0])
}

/// Whether a message may ever start a starboard entry.
pub fn is_processable(source: &SourceMessage, board_channel_id: &str) -> bool {
    if source.nsfw_channel || source.channel_id == board_channel_id {
        return false;
    }
    !source.content.is_empty() || !source.attachments.is_empty() || embed_image_url(&source.embeds).is_some()
}

/// Self-reactions and bot reactions never count toward the threshold.
pub fn counts_toward_board(reactor_id: &str, reactor_is_bot: bool, author_id: &str) -> bool {
    !reactor_is_bot && reactor_id != author_id
}

pub fn jump_url(guild_id: &str, channel_id: &str, message_id: &str) -> String {
    format!("https://discord.com/channels/{guild_id}/{channel_id}/{message_id}")
}

fn embed_image_url(embeds: &[serde_json::Value]) -> Option<String> {
    let first = embeds.first()?;
    if first.get("type").and_then(|t| t.as_str()) != Some("image") {
        return None;
    }
    first
        .get("image")
        .or_else(|| first.get("thumbnail"))
        .and_then(|i| i.get("url"))
        .and_then(|u| u.as_str())
        .map(str::to_string)
}

fn highlight_image_url(source: &SourceMessage) -> Option<String> {
    source
        .attachments
        .iter()
        .find(|a| a.is_image)
        .map(|a| a.url.clone())
        .or_else(|| embed_image_url(&source.embeds))
}

pub fn compose_highlight(
    tiers: &[TierConfig],
    source: &SourceMessage,
    stars: u32,
) -> HighlightPayload {
    let tier = tier_for(tiers, stars);

    HighlightPayload {
        content: format!("{} **{}** - <#{}>", tier.emoji, stars, source.channel_id),
        color: tier.color,
        author_name: source.author_name.clone(),
        author_icon_url: source.author_avatar_url.clone(),
        description: source.content.clone(),
        image_url: highlight_image_url(source),
        jump_url: jump_url(&source.guild_id, &source.channel_id, &source.message_id),
        timestamp_secs: source.timestamp_secs,
        reply: source.reply.clone(),
        forwarded_embeds: source.embeds.clone(),
        attachment_links: source.attachments.clone(),
    }
}

#[derive(Debug, Clone, Default)]
pub struct AuthorStats {
    pub total_stars: i64,
    pub times_on_board: usize,
    pub starred_messages: usize,
    pub most_starred: Option<StarboardEntry>,
}

pub fn summarize_author_entries(entries: &[StarboardEntry], minimum: u32) -> AuthorStats {
    let starred: Vec<&StarboardEntry> = entries.iter().filter(|e| e.star_count > 0).collect();
    AuthorStats {
        total_stars: starred.iter().map(|e| e.star_count).sum(),
        times_on_board: starred
            .iter()
            .filter(|e| e.star_count >= minimum as i64)
            .count(),
        starred_messages: starred.len(),
        most_starred: starred
            .iter()
            .max_by_key(|e| e.star_count)
            .map(|e| (*e).clone()),
    }
}

/// Keeps the highlight message for a source message consistent with its
/// current qualifying-reaction count. One instance per process; stateless
/// between calls apart from the backing store.
pub struct Starboard {
    channel_id: String,
    minimum: u32,
    emoji: String,
    tiers: Vec<TierConfig>,
    store: Arc<dyn StarboardStore>,
}

impl Starboard {
    pub fn new(config: &StarboardChannelConfig, store: Arc<dyn StarboardStore>) -> Self {
        Self {
            channel_id: config.channel_id.clone(),
            minimum: config.minimum,
            emoji: config.emoji.clone(),
            tiers: config.tiers.clone(),
            store,
        }
    }

    pub fn channel_id(&self) -> &str {
        &self.channel_id
    }

    pub fn minimum(&self) -> u32 {
        self.minimum
    }

    pub fn emoji(&self) -> &str {
        &self.emoji
    }

    pub fn eligible(&self, source: &SourceMessage) -> bool {
        is_processable(source, &self.channel_id)
    }

    /// Reconcile the highlight with a freshly read count. There is no mutual
    /// exclusion between concurrent calls for the same message; a stale read
    /// may clobber a fresher write until the next event recomputes state.
    pub async fn sync(
        &self,
        gateway: &dyn HighlightGateway,
        source: &SourceMessage,
        stars: u32,
    ) -> Result<()> {
        let existing = self.store.find_entry(&source.message_id).await?;
        let action = plan_sync(existing.as_ref(), stars, self.minimum);
        debug!(
            "starboard sync message_id={} stars={} action={:?}",
            source.message_id, stars, action
        );

        match action {
            SyncAction::Ignore => {}
            SyncAction::Publish => {
                let payload = compose_highlight(&self.tiers, source, stars);
                let highlight_id = gateway.send_highlight(&payload).await?;
                match existing {
                    Some(_) => {
                        self.store
                            .update_entry(&source.message_id, Some(&highlight_id), stars as i64)
                            .await?;
                    }
                    None => {
                        let now = Utc::now();
                        self.store
                            .create_entry(&StarboardEntry {
                                id: 0,
                                source_message_id: source.message_id.clone(),
                                source_channel_id: source.channel_id.clone(),
                                author_id: source.author_id.clone(),
                                highlight_message_id: Some(highlight_id),
                                star_count: stars as i64,
                                created_at: now,
                                updated_at: now,
                            })
                            .await?;
                    }
                }
            }
            SyncAction::Refresh { highlight_id } => {
                let payload = compose_highlight(&self.tiers, source, stars);
                if let Err(err) = gateway.edit_highlight(&highlight_id, &payload).await {
                    // The highlight may have been deleted out from under us;
                    // the next below-threshold event clears the id.
                    warn!(
                        "highlight edit failed for message {}: {err}",
                        source.message_id
                    );
                }
                self.store
                    .update_entry(&source.message_id, Some(&highlight_id), stars as i64)
                    .await?;
            }
            SyncAction::Retract { highlight_id } => {
                self.retract(gateway, &source.message_id, &highlight_id)
                    .await?;
            }
            SyncAction::Reset => {
                self.reset(&source.message_id, existing.as_ref()).await?;
            }
        }

        Ok(())
    }

    /// Source message deleted or all reactions cleared: the count is forced
    /// to 0 regardless of actual reaction state.
    pub async fn force_clear(
        &self,
        gateway: &dyn HighlightGateway,
        source_message_id: &str,
    ) -> Result<()> {
        let Some(entry) = self.store.find_entry(source_message_id).await? else {
            return Ok(());
        };

        match plan_sync(Some(&entry), 0, self.minimum) {
            SyncAction::Retract { highlight_id } => {
                self.retract(gateway, source_message_id, &highlight_id)
                    .await?;
            }
            SyncAction::Reset => {
                self.reset(source_message_id, Some(&entry)).await?;
            }
            _ => {}
        }

        Ok(())
    }

    pub async fn author_stats(&self, author_id: &str) -> Result<AuthorStats> {
        let entries = self.store.entries_by_author(author_id).await?;
        Ok(summarize_author_entries(&entries, self.minimum))
    }

    async fn retract(
        &self,
        gateway: &dyn HighlightGateway,
        source_message_id: &str,
        highlight_id: &str,
    ) -> Result<()> {
        if let Err(err) = gateway.delete_highlight(highlight_id).await {
            warn!(
                "highlight delete failed for message {}: {err}",
                source_message_id
            );
        }
        self.store.update_entry(source_message_id, None, 0).await?;
        Ok(())
    }

    async fn reset(
        &self,
        source_message_id: &str,
        existing: Option<&StarboardEntry>,
    ) -> Result<()> {
        // Already zeroed rows stay untouched so a repeat event is a no-op.
        if existing.is_some_and(|e| e.star_count == 0 && !e.has_highlight()) {
            return Ok(());
        }
        self.store.update_entry(source_message_id, None, 0).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

    use async_trait::async_trait;
    use chrono::Utc;
    use parking_lot::Mutex;
    use test_case::test_case;

    use super::{
        AttachmentLink, HighlightGateway, HighlightPayload, ReplySummary, SourceMessage,
        Starboard, SyncAction, compose_highlight, counts_toward_board, is_processable, jump_url,
        plan_sync, summarize_author_entries, tier_for,
    };
    use crate::config::{StarboardChannelConfig, TierConfig};
    use crate::db::{DatabaseError, StarboardEntry, StarboardStore};

    fn tiers() -> Vec<TierConfig> {
        vec![
            TierConfig {
                threshold: 0,
                emoji: "\u{2b50}".to_string(),
                color: 0xffffff,
            },
            TierConfig {
                threshold: 5,
                emoji: "\u{1f31f}".to_string(),
                color: 0xffffaa,
            },
            TierConfig {
                threshold: 10,
                emoji: "\u{1f4ab}".to_string(),
                color: 0xffff66,
            },
            TierConfig {
                threshold: 20,
                emoji: "\u{2728}".to_string(),
                color: 0xffff00,
            },
        ]
    }

    fn entry(highlight: Option<&str>, stars: i64) -> StarboardEntry {
        let now = Utc::now();
        StarboardEntry {
            id: 1,
            source_message_id: "msg-1".to_string(),
            source_channel_id: "chan-1".to_string(),
            author_id: "author-1".to_string(),
            highlight_message_id: highlight.map(str::to_string),
            star_count: stars,
            created_at: now,
            updated_at: now,
        }
    }

    fn source() -> SourceMessage {
        SourceMessage {
            message_id: "msg-1".to_string(),
            channel_id: "chan-1".to_string(),
            guild_id: "guild-1".to_string(),
            author_id: "author-1".to_string(),
            author_name: "alice".to_string(),
            author_avatar_url: Some("https://cdn.example/alice.png".to_string()),
            content: "hello world".to_string(),
            timestamp_secs: 1_700_000_000,
            nsfw_channel: false,
            attachments: Vec::new(),
            embeds: Vec::new(),
            reply: None,
        }
    }

    #[derive(Default)]
    struct MockStore {
        entries: Mutex<HashMap<String, StarboardEntry>>,
        fail: AtomicBool,
    }

    impl MockStore {
        fn get(&self, id: &str) -> Option<StarboardEntry> {
            self.entries.lock().get(id).cloned()
        }
    }

    #[async_trait]
    impl StarboardStore for MockStore {
        async fn find_entry(
            &self,
            source_message_id: &str,
        ) -> Result<Option<StarboardEntry>, DatabaseError> {
            if self.fail.load(Ordering::SeqCst) {
                return Err(DatabaseError::Query("mock failure".to_string()));
            }
            Ok(self.entries.lock().get(source_message_id).cloned())
        }

        async fn create_entry(&self, entry: &StarboardEntry) -> Result<(), DatabaseError> {
            if self.fail.load(Ordering::SeqCst) {
                return Err(DatabaseError::Query("mock failure".to_string()));
            }
            self.entries
                .lock()
                .insert(entry.source_message_id.clone(), entry.clone());
            Ok(())
        }

        async fn update_entry(
            &self,
            source_message_id: &str,
            highlight_message_id: Option<&str>,
            star_count: i64,
        ) -> Result<(), DatabaseError> {
            if self.fail.load(Ordering::SeqCst) {
                return Err(DatabaseError::Query("mock failure".to_string()));
            }
            let mut entries = self.entries.lock();
            if let Some(entry) = entries.get_mut(source_message_id) {
                entry.highlight_message_id = highlight_message_id.map(str::to_string);
                entry.star_count = star_count;
                entry.updated_at = Utc::now();
            }
            Ok(())
        }

        async fn entries_by_author(
            &self,
            author_id: &str,
        ) -> Result<Vec<StarboardEntry>, DatabaseError> {
            Ok(self
                .entries
                .lock()
                .values()
                .filter(|e| e.author_id == author_id)
                .cloned()
                .collect())
        }
    }

    #[derive(Default)]
    struct MockGateway {
        sent: Mutex<Vec<HighlightPayload>>,
        edited: Mutex<Vec<(String, HighlightPayload)>>,
        deleted: Mutex<Vec<String>>,
        next_id: AtomicU64,
        fail_send: AtomicBool,
        fail_edit: AtomicBool,
        fail_delete: AtomicBool,
    }

    #[async_trait]
    impl HighlightGateway for MockGateway {
        async fn send_highlight(&self, payload: &HighlightPayload) -> anyhow::Result<String> {
            if self.fail_send.load(Ordering::SeqCst) {
                anyhow::bail!("mock send failure");
            }
            self.sent.lock().push(payload.clone());
            let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(format!("highlight-{id}"))
        }

        async fn edit_highlight(
            &self,
            highlight_message_id: &str,
            payload: &HighlightPayload,
        ) -> anyhow::Result<()> {
            if self.fail_edit.load(Ordering::SeqCst) {
                anyhow::bail!("mock edit failure");
            }
            self.edited
                .lock()
                .push((highlight_message_id.to_string(), payload.clone()));
            Ok(())
        }

        async fn delete_highlight(&self, highlight_message_id: &str) -> anyhow::Result<()> {
            if self.fail_delete.load(Ordering::SeqCst) {
                anyhow::bail!("mock delete failure");
            }
            self.deleted.lock().push(highlight_message_id.to_string());
            Ok(())
        }
    }

    fn starboard(store: Arc<MockStore>) -> Starboard {
        let config = StarboardChannelConfig {
            channel_id: "board".to_string(),
            minimum: 3,
            emoji: "\u{2b50}".to_string(),
            tiers: tiers(),
        };
        Starboard::new(&config, store)
    }

    #[test_case(None, 2, SyncAction::Ignore; "no row below threshold")]
    #[test_case(None, 3, SyncAction::Publish; "no row at threshold")]
    #[test_case(Some(entry(None, 0)), 3, SyncAction::Publish; "row without highlight qualifies")]
    #[test_case(Some(entry(Some("h1"), 3)), 4, SyncAction::Refresh { highlight_id: "h1".to_string() }; "row with highlight qualifies")]
    #[test_case(Some(entry(Some("h1"), 3)), 2, SyncAction::Retract { highlight_id: "h1".to_string() }; "row with highlight drops out")]
    #[test_case(Some(entry(None, 2)), 1, SyncAction::Reset; "row without highlight stays out")]
    fn decision_table(existing: Option<StarboardEntry>, stars: u32, expected: SyncAction) {
        assert_eq!(plan_sync(existing.as_ref(), stars, 3), expected);
    }

    #[test]
    fn empty_string_highlight_id_counts_as_absent() {
        assert_eq!(plan_sync(Some(&entry(Some(""), 2)), 5, 3), SyncAction::Publish);
    }

    #[test_case(0, "\u{2b50}"; "floor tier")]
    #[test_case(4, "\u{2b50}"; "below first step")]
    #[test_case(5, "\u{1f31f}"; "exactly five")]
    #[test_case(19, "\u{1f4ab}"; "just under top")]
    #[test_case(21, "\u{2728}"; "past the top")]
    fn tier_selection(stars: u32, expected_emoji: &str) {
        assert_eq!(tier_for(&tiers(), stars).emoji, expected_emoji);
    }

    #[test]
    fn nsfw_and_board_channel_are_ineligible() {
        let mut nsfw = source();
        nsfw.nsfw_channel = true;
        assert!(!is_processable(&nsfw, "board"));

        let mut in_board = source();
        in_board.channel_id = "board".to_string();
        assert!(!is_processable(&in_board, "board"));
    }

    #[test]
    fn contentless_message_is_ineligible() {
        let mut empty = source();
        empty.content.clear();
        assert!(!is_processable(&empty, "board"));

        empty.embeds = vec![serde_json::json!({
            "type": "image",
            "image": { "url": "https://cdn.example/a.png" }
        })];
        assert!(is_processable(&empty, "board"));

        empty.embeds.clear();
        empty.attachments.push(AttachmentLink {
            filename: "a.bin".to_string(),
            url: "https://cdn.example/a.bin".to_string(),
            is_image: false,
        });
        assert!(is_processable(&empty, "board"));
    }

    #[test]
    fn self_and_bot_reactions_never_count() {
        assert!(!counts_toward_board("author-1", false, "author-1"));
        assert!(!counts_toward_board("user-2", true, "author-1"));
        assert!(counts_toward_board("user-2", false, "author-1"));
    }

    #[test]
    fn jump_url_format() {
        assert_eq!(
            jump_url("1", "2", "3"),
            "https://discord.com/channels/1/2/3"
        );
    }

    #[test]
    fn compose_prefers_attachment_image_over_embed() {
        let mut msg = source();
        msg.embeds = vec![serde_json::json!({
            "type": "image",
            "image": { "url": "https://cdn.example/embed.png" }
        })];
        msg.attachments = vec![AttachmentLink {
            filename: "photo.png".to_string(),
            url: "https://cdn.example/photo.png".to_string(),
            is_image: true,
        }];

        let payload = compose_highlight(&tiers(), &msg, 3);
        assert_eq!(
            payload.image_url.as_deref(),
            Some("https://cdn.example/photo.png")
        );
        assert_eq!(payload.content, "\u{2b50} **3** - <#chan-1>");
        assert_eq!(payload.attachment_links.len(), 1);
        assert_eq!(payload.forwarded_embeds.len(), 1);
    }

    #[test]
    fn compose_carries_reply_summary() {
        let mut msg = source();
        msg.reply = Some(ReplySummary {
            author_name: "bob".to_string(),
            author_avatar_url: None,
            jump_url: jump_url("guild-1", "chan-1", "msg-0"),
            content: "original".to_string(),
            image_url: None,
            timestamp_secs: 1_600_000_000,
        });

        let payload = compose_highlight(&tiers(), &msg, 6);
        assert_eq!(payload.reply.as_ref().map(|r| r.author_name.as_str()), Some("bob"));
        assert_eq!(payload.color, 0xffffaa);
    }

    #[tokio::test]
    async fn ratchet_creates_single_highlight() {
        let store = Arc::new(MockStore::default());
        let gateway = MockGateway::default();
        let board = starboard(store.clone());
        let msg = source();

        board.sync(&gateway, &msg, 1).await.expect("sync 1");
        board.sync(&gateway, &msg, 2).await.expect("sync 2");
        assert!(store.get("msg-1").is_none());
        assert!(gateway.sent.lock().is_empty());

        board.sync(&gateway, &msg, 3).await.expect("sync 3");
        assert_eq!(gateway.sent.lock().len(), 1);
        assert_eq!(
            gateway.sent.lock()[0].content,
            "\u{2b50} **3** - <#chan-1>"
        );

        let entry = store.get("msg-1").expect("entry created");
        assert_eq!(entry.star_count, 3);
        assert_eq!(entry.highlight_message_id.as_deref(), Some("highlight-1"));
    }

    #[tokio::test]
    async fn drop_below_threshold_retracts_but_keeps_row() {
        let store = Arc::new(MockStore::default());
        let gateway = MockGateway::default();
        let board = starboard(store.clone());
        let msg = source();

        board.sync(&gateway, &msg, 3).await.expect("publish");
        board.sync(&gateway, &msg, 2).await.expect("retract");

        assert_eq!(gateway.deleted.lock().as_slice(), ["highlight-1"]);
        let entry = store.get("msg-1").expect("row kept");
        assert_eq!(entry.star_count, 0);
        assert!(entry.highlight_message_id.is_none());
    }

    #[tokio::test]
    async fn jump_straight_to_top_tier() {
        let store = Arc::new(MockStore::default());
        let gateway = MockGateway::default();
        let board = starboard(store.clone());

        board.sync(&gateway, &source(), 21).await.expect("sync");
        let sent = gateway.sent.lock();
        assert_eq!(sent[0].content, "\u{2728} **21** - <#chan-1>");
        assert_eq!(sent[0].color, 0xffff00);
    }

    #[tokio::test]
    async fn force_clear_deletes_highlight_and_zeroes_count() {
        let store = Arc::new(MockStore::default());
        let gateway = MockGateway::default();
        let board = starboard(store.clone());

        board.sync(&gateway, &source(), 5).await.expect("publish");
        board.force_clear(&gateway, "msg-1").await.expect("clear");

        assert_eq!(gateway.deleted.lock().len(), 1);
        let entry = store.get("msg-1").expect("row kept");
        assert_eq!(entry.star_count, 0);
        assert!(entry.highlight_message_id.is_none());

        // Repeat clears are no-ops on the message side.
        board.force_clear(&gateway, "msg-1").await.expect("repeat clear");
        assert_eq!(gateway.deleted.lock().len(), 1);
    }

    #[tokio::test]
    async fn force_clear_without_entry_is_noop() {
        let store = Arc::new(MockStore::default());
        let gateway = MockGateway::default();
        let board = starboard(store);

        board.force_clear(&gateway, "unknown").await.expect("noop");
        assert!(gateway.deleted.lock().is_empty());
    }

    #[tokio::test]
    async fn repeated_sync_sends_nothing_new() {
        let store = Arc::new(MockStore::default());
        let gateway = MockGateway::default();
        let board = starboard(store.clone());
        let msg = source();

        board.sync(&gateway, &msg, 3).await.expect("publish");
        board.sync(&gateway, &msg, 3).await.expect("refresh");

        assert_eq!(gateway.sent.lock().len(), 1);
        let edited = gateway.edited.lock();
        assert_eq!(edited.len(), 1);
        // The repeat edit is a no-op: identical payload, same target.
        assert_eq!(edited[0].0, "highlight-1");
        assert_eq!(edited[0].1, gateway.sent.lock()[0]);
        assert_eq!(store.get("msg-1").expect("entry").star_count, 3);
    }

    #[tokio::test]
    async fn failed_send_persists_nothing() {
        let store = Arc::new(MockStore::default());
        let gateway = MockGateway::default();
        gateway.fail_send.store(true, Ordering::SeqCst);
        let board = starboard(store.clone());

        assert!(board.sync(&gateway, &source(), 3).await.is_err());
        assert!(store.get("msg-1").is_none());
    }

    #[tokio::test]
    async fn failed_edit_is_swallowed_and_count_persisted() {
        let store = Arc::new(MockStore::default());
        let gateway = MockGateway::default();
        let board = starboard(store.clone());
        let msg = source();

        board.sync(&gateway, &msg, 3).await.expect("publish");
        gateway.fail_edit.store(true, Ordering::SeqCst);
        board.sync(&gateway, &msg, 4).await.expect("refresh despite edit failure");

        let entry = store.get("msg-1").expect("entry");
        assert_eq!(entry.star_count, 4);
        assert_eq!(entry.highlight_message_id.as_deref(), Some("highlight-1"));
    }

    #[tokio::test]
    async fn failed_delete_still_clears_entry() {
        let store = Arc::new(MockStore::default());
        let gateway = MockGateway::default();
        let board = starboard(store.clone());
        let msg = source();

        board.sync(&gateway, &msg, 3).await.expect("publish");
        gateway.fail_delete.store(true, Ordering::SeqCst);
        board.sync(&gateway, &msg, 0).await.expect("retract despite delete failure");

        let entry = store.get("msg-1").expect("entry");
        assert_eq!(entry.star_count, 0);
        assert!(entry.highlight_message_id.is_none());
    }

    #[test]
    fn author_stats_aggregate() {
        let mut first = entry(Some("h1"), 7);
        first.source_message_id = "msg-1".to_string();
        let mut second = entry(None, 2);
        second.source_message_id = "msg-2".to_string();
        let mut zeroed = entry(None, 0);
        zeroed.source_message_id = "msg-3".to_string();

        let stats = summarize_author_entries(&[first, second, zeroed], 3);
        assert_eq!(stats.total_stars, 9);
        assert_eq!(stats.times_on_board, 1);
        assert_eq!(stats.starred_messages, 2);
        assert_eq!(
            stats
                .most_starred
                .as_ref()
                .map(|e| e.source_message_id.as_str()),
            Some("msg-1")
        );
    }
}
