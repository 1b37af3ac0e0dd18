use std::time::{Duration, Instant};

use parking_lot::Mutex;

const ZWS: char = '\u{200B}';

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnipeKind {
    Edit,
    Delete,
}

impl SnipeKind {
    pub fn label(self) -> &'static str {
        match self {
            SnipeKind::Edit => "edit",
            SnipeKind::Delete => "delete",
        }
    }
}

#[derive(Debug, Clone)]
pub struct SnipeRecord {
    pub author_tag: String,
    pub channel_name: String,
    pub content: String,
    pub kind: SnipeKind,
    recorded_at: Instant,
}

/// A zero-width space in front of `(` keeps sniped text from completing a
/// markdown link out of the surrounding embed.
pub fn sanitize_snipe_content(content: &str) -> String {
    if content.is_empty() {
        return "This message had no text content.".to_string();
    }
    content.replace('(', &format!("{ZWS}("))
}

/// Short-lived buffer of recently edited or deleted messages. Owned by the
/// process context; records expire after `lifetime` and the whole buffer is
/// emptied on every drain.
pub struct SnipeCache {
    records: Mutex<Vec<SnipeRecord>>,
    lifetime: Duration,
}

impl SnipeCache {
    pub fn new(lifetime: Duration) -> Self {
        Self {
            records: Mutex::new(Vec::new()),
            lifetime,
        }
    }

    pub fn lifetime_secs(&self) -> u64 {
        self.lifetime.as_secs()
    }

    pub fn record(&self, author_tag: &str, channel_name: &str, content: &str, kind: SnipeKind) {
        self.record_at(author_tag, channel_name, content, kind, Instant::now());
    }

    pub fn drain(&self) -> Vec<SnipeRecord> {
        self.drain_at(Instant::now())
    }

    pub fn clear(&self) {
        self.records.lock().clear();
    }

    pub(crate) fn record_at(
        &self,
        author_tag: &str,
        channel_name: &str,
        content: &str,
        kind: SnipeKind,
        now: Instant,
    ) {
        let mut records = self.records.lock();
        records.retain(|r| now.duration_since(r.recorded_at) < self.lifetime);
        records.push(SnipeRecord {
            author_tag: author_tag.to_string(),
            channel_name: channel_name.to_string(),
            content: sanitize_snipe_content(content),
            kind,
            recorded_at: now,
        });
    }

    pub(crate) fn drain_at(&self, now: Instant) -> Vec<SnipeRecord> {
        let mut records = self.records.lock();
        let drained = records
            .drain(..)
            .filter(|r| now.duration_since(r.recorded_at) < self.lifetime)
            .collect();
        drained
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use super::{SnipeCache, SnipeKind, sanitize_snipe_content};

    #[test]
    fn drain_returns_and_clears() {
        let cache = SnipeCache::new(Duration::from_secs(20));
        cache.record("alice#0", "general", "hello", SnipeKind::Delete);

        let drained = cache.drain();
        assert_eq!(drained.len(), 1);
        assert_eq!(drained[0].author_tag, "alice#0");
        assert_eq!(drained[0].kind, SnipeKind::Delete);

        assert!(cache.drain().is_empty());
    }

    #[test]
    fn expired_records_are_dropped() {
        let cache = SnipeCache::new(Duration::from_secs(20));
        let start = Instant::now();
        cache.record_at("alice#0", "general", "old", SnipeKind::Edit, start);
        cache.record_at(
            "bob#0",
            "general",
            "fresh",
            SnipeKind::Delete,
            start + Duration::from_secs(15),
        );

        let drained = cache.drain_at(start + Duration::from_secs(25));
        assert_eq!(drained.len(), 1);
        assert_eq!(drained[0].content, "fresh");
    }

    #[test]
    fn empty_content_gets_placeholder() {
        assert_eq!(
            sanitize_snipe_content(""),
            "This message had no text content."
        );
    }

    #[test]
    fn parens_are_escaped() {
        assert_eq!(
            sanitize_snipe_content("link](url) (x)"),
            "link]\u{200B}(url) \u{200B}(x)"
        );
    }

    #[test]
    fn clear_empties_the_buffer() {
        let cache = SnipeCache::new(Duration::from_secs(20));
        cache.record("alice#0", "general", "hello", SnipeKind::Edit);
        cache.clear();
        assert!(cache.drain().is_empty());
    }
}
