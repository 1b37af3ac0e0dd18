use crate::config::WelcomeConfig;
use crate::utils::formatting::apply_pattern_string;

/// Render the join greeting for a new member. `None` when no welcome channel
/// is configured. Returns `(channel_id, message)`.
pub fn render_welcome(config: &WelcomeConfig, user_id: &str) -> Option<(String, String)> {
    let channel_id = config.channel_id.clone()?;

    let user_mention = format!("<@{user_id}>");
    let rules_mention = config
        .rules_channel_id
        .as_ref()
        .map(|id| format!("<#{id}>"));
    let faq_mention = config.faq_channel_id.as_ref().map(|id| format!("<#{id}>"));

    let mut vars: Vec<(&str, &str)> = vec![("user", user_mention.as_str())];
    if let Some(rules) = rules_mention.as_deref() {
        vars.push(("rules", rules));
    }
    if let Some(faq) = faq_mention.as_deref() {
        vars.push(("faq", faq));
    }

    Some((channel_id, apply_pattern_string(&config.message, &vars)))
}
