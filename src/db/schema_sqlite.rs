diesel::table! {
    starboard_entries (id) {
        id -> Integer,
        source_message_id -> Text,
        source_channel_id -> Text,
        author_id -> Text,
        highlight_message_id -> Nullable<Text>,
        star_count -> BigInt,
        created_at -> Text,
        updated_at -> Text,
    }
}

diesel::table! {
    tags (id) {
        id -> Integer,
        name -> Text,
        content -> Text,
        created_at -> Text,
        updated_at -> Text,
    }
}

diesel::table! {
    users (id) {
        id -> Integer,
        discord_user_id -> Text,
        flags -> BigInt,
        created_at -> Text,
        updated_at -> Text,
    }
}

diesel::allow_tables_to_appear_in_same_query!(starboard_entries, tags, users,);
