use anyhow::Result;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::db::TagStore;

static TAG_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9_-]{1,32}$").expect("tag name regex"));

const RESERVED_NAMES: [&str; 4] = ["list", "add", "edit", "delete"];

pub fn is_valid_tag_name(name: &str) -> bool {
    TAG_NAME.is_match(name) && !RESERVED_NAMES.contains(&name)
}

fn usage(prefix: &str, is_staff: bool) -> String {
    let mut parts = vec![
        "Usage:".to_string(),
        format!(" - {prefix}tag [tag]"),
        format!(" - {prefix}tag list"),
    ];
    if is_staff {
        parts.push(format!(" - {prefix}tag add [tag] [contents]"));
        parts.push(format!(" - {prefix}tag edit [tag] [contents]"));
        parts.push(format!(" - {prefix}tag delete [tag]"));
    }
    parts.join("\n")
}

/// Run one `tag` command invocation and produce the reply text.
pub async fn run_tag_command(
    store: &dyn TagStore,
    prefix: &str,
    is_staff: bool,
    args: &[String],
) -> Result<String> {
    let Some(subcommand) = args.first() else {
        return Ok(usage(prefix, is_staff));
    };

    match subcommand.as_str() {
        "list" => {
            let names = store.list_tag_names().await?;
            if names.is_empty() {
                Ok("No existing tags.".to_string())
            } else {
                Ok(format!("Available tags: `{}`", names.join("`, `")))
            }
        }
        "add" => {
            if !is_staff {
                return Ok("You are not allowed to manage tags.".to_string());
            }
            let Some(name) = args.get(1).map(|n| n.to_lowercase()) else {
                return Ok("Include a tag name.".to_string());
            };
            if !is_valid_tag_name(&name) {
                return Ok(
                    "Tag names are 1-32 lowercase letters, digits, `-` or `_`, and cannot shadow a subcommand.".to_string(),
                );
            }
            if store.find_tag(&name).await?.is_some() {
                return Ok("This tag already exists.".to_string());
            }
            let content = args[2..].join(" ");
            if content.is_empty() {
                return Ok("Include the tag contents.".to_string());
            }
            store.create_tag(&name, &content).await?;
            Ok(format!("Created tag: {name}"))
        }
        "edit" => {
            if !is_staff {
                return Ok("You are not allowed to manage tags.".to_string());
            }
            let Some(name) = args.get(1).map(|n| n.to_lowercase()) else {
                return Ok("Include a tag name.".to_string());
            };
            if store.find_tag(&name).await?.is_none() {
                return Ok(format!("Tag `{name}` does not exist!"));
            }
            let content = args[2..].join(" ");
            if content.is_empty() {
                return Ok("Include the tag contents.".to_string());
            }
            store.update_tag(&name, &content).await?;
            Ok(format!("Tag `{name}` has been updated."))
        }
        "delete" => {
            if !is_staff {
                return Ok("You are not allowed to manage tags.".to_string());
            }
            let Some(name) = args.get(1).map(|n| n.to_lowercase()) else {
                return Ok("Include a tag name.".to_string());
            };
            if store.find_tag(&name).await?.is_none() {
                return Ok(format!("Tag `{name}` does not exist!"));
            }
            store.delete_tag(&name).await?;
            Ok(format!("Tag `{name}` deleted."))
        }
        name => {
            let name = name.to_lowercase();
            match store.find_tag(&name).await? {
                Some(tag) => Ok(tag.content),
                None => Ok(format!("Tag `{name}` does not exist!")),
            }
        }
    }
}

/// Answer `<prefix><tag>` messages directly, bypassing the command router.
pub async fn autotag_reply(
    store: &dyn TagStore,
    prefix: &str,
    content: &str,
) -> Result<Option<String>> {
    let Some(rest) = content.strip_prefix(prefix) else {
        return Ok(None);
    };
    let name = rest.trim().to_lowercase();
    if !TAG_NAME.is_match(&name) {
        return Ok(None);
    }

    Ok(store.find_tag(&name).await?.map(|tag| tag.content))
}
