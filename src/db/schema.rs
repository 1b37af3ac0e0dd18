diesel::table! {
    starboard_entries (id) {
        id -> BigInt,
        source_message_id -> Text,
        source_channel_id -> Text,
        author_id -> Text,
        highlight_message_id -> Nullable<Text>,
        star_count -> BigInt,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    tags (id) {
        id -> BigInt,
        name -> Text,
        content -> Text,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    users (id) {
        id -> BigInt,
        discord_user_id -> Text,
        flags -> BigInt,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::allow_tables_to_appear_in_same_query!(starboard_entries, tags, users,);
