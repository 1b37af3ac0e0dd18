use std::collections::BTreeMap;

use anyhow::Result;

use crate::db::UserStore;

/// User-flag bits mirrored between the users table and guild roles.
pub mod flags {
    pub const CONTRIBUTOR: i64 = 1 << 0;
    pub const TRANSLATOR: i64 = 1 << 1;
    pub const BUG_HUNTER: i64 = 1 << 2;
    pub const EARLY_USER: i64 = 1 << 3;
    pub const SERVER_BOOSTER: i64 = 1 << 4;
    pub const STAFF: i64 = 1 << 5;
    /// Placeholder accounts that must never be touched by sync.
    pub const GHOST: i64 = 1 << 6;
}

/// Flags whose roles are granted from the database on join and on message.
pub const SYNC_DB_TO_GUILD: [&str; 4] = ["contributor", "translator", "bug_hunter", "early_user"];

/// Flags rewritten from the member's live role list on member update.
pub const SYNC_GUILD_TO_DB: [&str; 5] = [
    "contributor",
    "translator",
    "bug_hunter",
    "early_user",
    "server_booster",
];

/// Flags cleared when the member leaves the guild.
pub const CLEAR_ON_LEAVE: [&str; 1] = ["server_booster"];

pub fn flag_bit(name: &str) -> Option<i64> {
    match name {
        "contributor" => Some(flags::CONTRIBUTOR),
        "translator" => Some(flags::TRANSLATOR),
        "bug_hunter" => Some(flags::BUG_HUNTER),
        "early_user" => Some(flags::EARLY_USER),
        "server_booster" => Some(flags::SERVER_BOOSTER),
        "staff" => Some(flags::STAFF),
        _ => None,
    }
}

pub fn is_ghost(user_flags: i64) -> bool {
    user_flags & flags::GHOST != 0
}

pub fn is_staff(user_flags: i64) -> bool {
    user_flags & flags::STAFF == flags::STAFF
}

/// Role ids to grant for the flags a user holds in the database.
pub fn roles_to_grant(user_flags: i64, mapping: &BTreeMap<String, String>) -> Vec<String> {
    SYNC_DB_TO_GUILD
        .iter()
        .filter(|name| flag_bit(name).is_some_and(|bit| user_flags & bit != 0))
        .filter_map(|name| mapping.get(*name).cloned())
        .collect()
}

/// Rewrite the guild-synced bits from the member's live role list. Bits
/// outside [`SYNC_GUILD_TO_DB`] (staff, ghost) are preserved as-is.
pub fn merge_member_flags(
    current: i64,
    member_role_ids: &[String],
    mapping: &BTreeMap<String, String>,
) -> i64 {
    let mut merged = current;
    for name in SYNC_GUILD_TO_DB {
        let Some(bit) = flag_bit(name) else { continue };
        let Some(role_id) = mapping.get(name) else {
            continue;
        };
        if member_role_ids.iter().any(|id| id == role_id) {
            merged |= bit;
        } else {
            merged &= !bit;
        }
    }
    merged
}

pub fn flags_after_leave(current: i64) -> i64 {
    let cleared = CLEAR_ON_LEAVE
        .iter()
        .filter_map(|name| flag_bit(name))
        .fold(0, |acc, bit| acc | bit);
    current & !cleared
}

/// Look up the flags relevant for a member event. `None` means "leave this
/// user alone": no row, or a ghost account.
pub async fn member_flags(store: &dyn UserStore, user_id: &str) -> Result<Option<i64>> {
    let Some(user) = store.find_by_discord_id(user_id).await? else {
        return Ok(None);
    };
    if is_ghost(user.flags) {
        return Ok(None);
    }
    Ok(Some(user.flags))
}

/// Persist the flags derived from a member's live role list, writing only
/// when something changed.
pub async fn sync_member_roles_to_db(
    store: &dyn UserStore,
    user_id: &str,
    member_role_ids: &[String],
    mapping: &BTreeMap<String, String>,
) -> Result<()> {
    let Some(current) = member_flags(store, user_id).await? else {
        return Ok(());
    };
    let merged = merge_member_flags(current, member_role_ids, mapping);
    if merged != current {
        store.upsert_flags(user_id, merged).await?;
    }
    Ok(())
}

/// Clear leave-scoped flags when a member leaves the guild.
pub async fn clear_leave_flags(store: &dyn UserStore, user_id: &str) -> Result<()> {
    let Some(current) = member_flags(store, user_id).await? else {
        return Ok(());
    };
    let cleared = flags_after_leave(current);
    if cleared != current {
        store.upsert_flags(user_id, cleared).await?;
    }
    Ok(())
}
