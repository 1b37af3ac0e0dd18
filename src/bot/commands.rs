use std::collections::HashMap;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::bot::menu::{MenuEmbed, MenuField, MenuPage};
use crate::bot::sniper::SnipeRecord;
use crate::bot::starboard::{AuthorStats, jump_url, tier_for};
use crate::config::TierConfig;

pub const SNIPE_COOLDOWN: Duration = Duration::from_secs(5);
pub const TAG_COOLDOWN: Duration = Duration::from_secs(3);
pub const STARSTATS_COOLDOWN: Duration = Duration::from_secs(10);

const MAX_EMBED_FIELDS: usize = 25;
const MAX_FIELD_VALUE: usize = 1024;
const EMBED_CHAR_BUDGET: usize = 5900;

const ANIMALS: [&str; 10] = [
    "\u{1f985}", "\u{1f426}", "\u{1f984}", "\u{1f419}", "\u{1f422}", "\u{1f40c}", "\u{1f42c}",
    "\u{1f420}", "\u{1f988}", "\u{1f98f}",
];

/// Per-user-per-command cooldowns, owned by the process context.
#[derive(Default)]
pub struct CooldownMap {
    slots: Mutex<HashMap<(String, String), Instant>>,
}

impl CooldownMap {
    /// Arm the cooldown if it is cold; return the remaining whole seconds if
    /// it is still hot.
    pub fn check(&self, command: &str, user_id: &str, window: Duration) -> Option<u64> {
        self.check_at(command, user_id, window, Instant::now())
    }

    pub(crate) fn check_at(
        &self,
        command: &str,
        user_id: &str,
        window: Duration,
        now: Instant,
    ) -> Option<u64> {
        let key = (command.to_string(), user_id.to_string());
        let mut slots = self.slots.lock();
        if let Some(armed_at) = slots.get(&key) {
            let elapsed = now.duration_since(*armed_at);
            if elapsed < window {
                return Some((window - elapsed).as_secs().max(1));
            }
        }
        slots.insert(key, now);
        None
    }

    pub fn clear(&self) {
        self.slots.lock().clear();
    }
}

/// Split `<prefix><command> [args...]` into a lowercased command name and its
/// raw arguments. Returns `None` for non-command messages.
pub fn parse_command(prefix: &str, content: &str) -> Option<(String, Vec<String>)> {
    let rest = content.strip_prefix(prefix)?;
    let mut parts = rest.split_whitespace();
    let name = parts.next()?.to_lowercase();
    if name.is_empty() {
        return None;
    }
    Some((name, parts.map(str::to_string).collect()))
}

pub fn empty_snipe_reply() -> String {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.subsec_nanos() as usize)
        .unwrap_or(0);
    format!("{} There is nothing to snipe.", ANIMALS[nanos % ANIMALS.len()])
}

/// Render drained snipe records into embed pages: at most 25 fields per
/// embed, 1024 characters per field value with continuation fields, and a
/// rough per-embed character budget below the API ceiling.
pub fn build_snipe_pages(
    records: &[SnipeRecord],
    requester_tag: &str,
    lifetime_secs: u64,
) -> Vec<MenuPage> {
    if records.is_empty() {
        return Vec::new();
    }

    let mut field_groups: Vec<Vec<MenuField>> = vec![Vec::new()];
    let mut cursor = 0;
    let mut length = 0;

    for record in records {
        let name = format!(
            "{} ({}) in #{}",
            record.author_tag,
            record.kind.label(),
            record.channel_name
        );
        let chunk_overhead = (record.content.len() / MAX_FIELD_VALUE) * 3;
        let projected = length + name.len() + chunk_overhead + record.content.len();

        if field_groups[cursor].len() >= MAX_EMBED_FIELDS - 1 || projected >= EMBED_CHAR_BUDGET {
            field_groups.push(Vec::new());
            length = 0;
            cursor += 1;
        }

        length += name.len() + record.content.len();

        let mut chars: Vec<char> = record.content.chars().collect();
        let first: String = chars.drain(..chars.len().min(MAX_FIELD_VALUE)).collect();
        field_groups[cursor].push(MenuField { name, value: first });

        while !chars.is_empty() {
            let chunk: String = chars.drain(..chars.len().min(MAX_FIELD_VALUE)).collect();
            field_groups[cursor].push(MenuField {
                name: "...".to_string(),
                value: chunk,
            });
        }
    }

    let page_count = field_groups.len();
    field_groups
        .into_iter()
        .enumerate()
        .map(|(i, fields)| {
            let description = (i == 0)
                .then(|| format!("Edits and deletes for the last {lifetime_secs} seconds"));
            let footer = (i + 1 == page_count).then(|| format!("Sniped by {requester_tag}"));
            MenuPage {
                content: None,
                embed: Some(MenuEmbed {
                    description,
                    fields,
                    footer,
                    color: None,
                }),
            }
        })
        .collect()
}

/// Starboard stats for one author, rendered the way the board renders tiers.
pub fn build_stats_page(
    stats: &AuthorStats,
    tiers: &[TierConfig],
    guild_id: &str,
) -> MenuPage {
    let tier = tier_for(tiers, stats.total_stars.max(0) as u32);

    let mut description = format!(
        "**{} Stars:** {}\n**Times On Starboard:** {}\n**Number of Starred Messages:** {}",
        tier.emoji, stats.total_stars, stats.times_on_board, stats.starred_messages
    );

    if let Some(most) = &stats.most_starred {
        description.push_str(&format!(
            "\n\n**Most Starred Message:** [{}]({})",
            most.star_count,
            jump_url(guild_id, &most.source_channel_id, &most.source_message_id)
        ));
    }

    MenuPage {
        content: None,
        embed: Some(MenuEmbed {
            description: Some(description),
            fields: Vec::new(),
            footer: Some("Starboard Stats".to_string()),
            color: Some(tier.color),
        }),
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use super::{
        CooldownMap, build_snipe_pages, build_stats_page, parse_command,
    };
    use crate::bot::sniper::{SnipeCache, SnipeKind};
    use crate::bot::starboard::summarize_author_entries;
    use crate::config::TierConfig;
    use crate::db::StarboardEntry;
    use chrono::Utc;

    fn records(specs: &[(&str, &str)]) -> Vec<crate::bot::sniper::SnipeRecord> {
        let cache = SnipeCache::new(Duration::from_secs(60));
        for (author, content) in specs {
            cache.record(author, "general", content, SnipeKind::Delete);
        }
        cache.drain()
    }

    #[test]
    fn cooldown_arms_then_reports_remaining() {
        let map = CooldownMap::default();
        let start = Instant::now();
        let window = Duration::from_secs(10);

        assert_eq!(map.check_at("snipe", "u1", window, start), None);
        assert!(
            map.check_at("snipe", "u1", window, start + Duration::from_secs(4))
                .is_some()
        );
        // Other users and other commands are independent.
        assert_eq!(map.check_at("snipe", "u2", window, start), None);
        assert_eq!(map.check_at("tag", "u1", window, start), None);
        // Expired windows re-arm.
        assert_eq!(
            map.check_at("snipe", "u1", window, start + Duration::from_secs(11)),
            None
        );
    }

    #[test]
    fn parse_command_splits_name_and_args() {
        assert_eq!(
            parse_command("!", "!Tag add Guide hello there"),
            Some((
                "tag".to_string(),
                vec![
                    "add".to_string(),
                    "Guide".to_string(),
                    "hello".to_string(),
                    "there".to_string()
                ]
            ))
        );
        assert_eq!(parse_command("!", "plain message"), None);
        assert_eq!(parse_command("!", "!"), None);
    }

    #[test]
    fn snipe_pages_empty_for_no_records() {
        assert!(build_snipe_pages(&[], "alice#0", 20).is_empty());
    }

    #[test]
    fn snipe_single_page_has_description_and_footer() {
        let pages = build_snipe_pages(&records(&[("alice#0", "hello")]), "bob#0", 20);
        assert_eq!(pages.len(), 1);

        let embed = pages[0].embed.as_ref().expect("embed");
        assert_eq!(
            embed.description.as_deref(),
            Some("Edits and deletes for the last 20 seconds")
        );
        assert_eq!(embed.footer.as_deref(), Some("Sniped by bob#0"));
        assert_eq!(embed.fields.len(), 1);
        assert_eq!(embed.fields[0].name, "alice#0 (delete) in #general");
    }

    #[test]
    fn long_content_gets_continuation_fields() {
        let long = "x".repeat(1500);
        let pages = build_snipe_pages(&records(&[("alice#0", &long)]), "bob#0", 20);
        let embed = pages[0].embed.as_ref().expect("embed");
        assert_eq!(embed.fields.len(), 2);
        assert_eq!(embed.fields[0].value.len(), 1024);
        assert_eq!(embed.fields[1].name, "...");
        assert_eq!(embed.fields[1].value.len(), 1500 - 1024);
    }

    #[test]
    fn many_records_spill_to_a_second_page() {
        let specs: Vec<(String, String)> = (0..30)
            .map(|i| (format!("user{i}#0"), "gone".to_string()))
            .collect();
        let borrowed: Vec<(&str, &str)> = specs
            .iter()
            .map(|(a, c)| (a.as_str(), c.as_str()))
            .collect();

        let pages = build_snipe_pages(&records(&borrowed), "bob#0", 20);
        assert_eq!(pages.len(), 2);

        let first = pages[0].embed.as_ref().expect("embed");
        let last = pages[1].embed.as_ref().expect("embed");
        assert!(first.description.is_some());
        assert!(first.footer.is_none());
        assert!(last.description.is_none());
        assert!(last.footer.is_some());
    }

    #[test]
    fn oversized_content_splits_by_budget() {
        let big = "y".repeat(3000);
        let specs = [("a#0", big.as_str()), ("b#0", big.as_str()), ("c#0", big.as_str())];
        let pages = build_snipe_pages(&records(&specs), "bob#0", 20);
        assert!(pages.len() >= 2);
    }

    #[test]
    fn stats_page_links_most_starred() {
        let now = Utc::now();
        let entry = StarboardEntry {
            id: 1,
            source_message_id: "m1".to_string(),
            source_channel_id: "c1".to_string(),
            author_id: "a1".to_string(),
            highlight_message_id: Some("h1".to_string()),
            star_count: 6,
            created_at: now,
            updated_at: now,
        };
        let tiers = vec![
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
        ];

        let stats = summarize_author_entries(std::slice::from_ref(&entry), 3);
        let page = build_stats_page(&stats, &tiers, "g1");
        let embed = page.embed.expect("embed");
        let description = embed.description.expect("description");

        assert!(description.contains("**\u{1f31f} Stars:** 6"));
        assert!(description.contains("https://discord.com/channels/g1/c1/m1"));
        assert_eq!(embed.color, Some(0xffffaa));
    }
}
