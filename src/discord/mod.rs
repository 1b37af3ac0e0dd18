use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use tracing::{debug, error, info, warn};

use serenity::all::{
    ButtonStyle, ChannelId, Client as SerenityClient, Context as SerenityContext, CreateActionRow,
    CreateButton, CreateEmbed, CreateEmbedAuthor, CreateEmbedFooter, CreateInteractionResponse,
    CreateInteractionResponseMessage, CreateMessage, EditMessage, Embed,
    EventHandler as SerenityEventHandler, GatewayIntents, GuildChannel, GuildId,
    GuildMemberUpdateEvent, Http, Interaction, Member, Message, MessageId, MessageUpdateEvent,
    PermissionOverwrite, PermissionOverwriteType, Permissions, Reaction, ReactionType, Ready,
    RoleId, Timestamp, User,
};
use serenity::utils::{ContentSafeOptions, content_safe};

use crate::bot::BotCore;
use crate::bot::commands::{
    SNIPE_COOLDOWN, STARSTATS_COOLDOWN, TAG_COOLDOWN, build_snipe_pages, build_stats_page,
    empty_snipe_reply, parse_command,
};
use crate::bot::menu::{ButtonMenu, MenuEmbed, MenuEndAction, MenuPage, MenuReaction};
use crate::bot::rolesync::{self, is_staff};
use crate::bot::sniper::SnipeKind;
use crate::bot::starboard::{
    AttachmentLink, HighlightGateway, HighlightPayload, ReplySummary, SourceMessage,
    counts_toward_board, jump_url,
};
use crate::bot::{tags, welcome};
use crate::config::Config;

const INITIAL_CONNECT_RETRY_SECONDS: u64 = 2;
const MAX_CONNECT_RETRY_SECONDS: u64 = 300;
const MENU_SWEEP_INTERVAL: Duration = Duration::from_secs(5);
const REACTION_PAGE_SIZE: u8 = 100;
const BUTTON_LABEL_LIMIT: usize = 80;
const LINK_BUTTONS_PER_ROW: usize = 5;

/// Owns the gateway connection. Reconnects with exponential backoff when the
/// connection cannot be established.
pub struct Gateway {
    config: Arc<Config>,
    core: Arc<BotCore>,
}

impl Gateway {
    pub fn new(config: Arc<Config>, core: Arc<BotCore>) -> Self {
        Self { config, core }
    }

    pub async fn run(&self) -> Result<()> {
        let mut retry_seconds = INITIAL_CONNECT_RETRY_SECONDS;

        loop {
            match self.connect().await {
                Ok(()) => {
                    warn!("discord gateway exited cleanly, reconnecting");
                    retry_seconds = INITIAL_CONNECT_RETRY_SECONDS;
                }
                Err(err) => {
                    error!(
                        "failed to run discord gateway: {err}. retrying in {} seconds",
                        retry_seconds
                    );
                    tokio::time::sleep(Duration::from_secs(retry_seconds)).await;
                    retry_seconds = (retry_seconds * 2).min(MAX_CONNECT_RETRY_SECONDS);
                }
            }
        }
    }

    async fn connect(&self) -> Result<()> {
        let intents = if self.config.bot.use_privileged_intents {
            GatewayIntents::all()
        } else {
            GatewayIntents::non_privileged()
        };

        let handler = BotEventHandler {
            core: self.core.clone(),
            sweeper_started: AtomicBool::new(false),
        };

        let mut client = SerenityClient::builder(&self.config.bot.token, intents)
            .event_handler(handler)
            .await
            .map_err(|err| anyhow!("failed to build discord gateway client: {err}"))?;

        client
            .start_autosharded()
            .await
            .map_err(|err| anyhow!("discord gateway stopped: {err}"))?;
        Ok(())
    }
}

struct BotEventHandler {
    core: Arc<BotCore>,
    sweeper_started: AtomicBool,
}

#[serenity::async_trait]
impl SerenityEventHandler for BotEventHandler {
    async fn ready(&self, ctx: SerenityContext, ready: Ready) {
        info!(
            "discord gateway ready as {} ({})",
            ready.user.name, ready.user.id
        );

        if !self.sweeper_started.swap(true, Ordering::SeqCst) {
            let core = self.core.clone();
            let http = ctx.http.clone();
            tokio::spawn(async move {
                let mut ticker = tokio::time::interval(MENU_SWEEP_INTERVAL);
                loop {
                    ticker.tick().await;
                    for (message_id, channel_id, end_action) in
                        core.menus.sweep_expired(Instant::now())
                    {
                        if let Err(err) =
                            neutralize_menu(&http, &channel_id, &message_id, end_action).await
                        {
                            debug!("failed to neutralize expired menu {message_id}: {err}");
                        }
                    }
                }
            });
        }
    }

    async fn message(&self, ctx: SerenityContext, msg: Message) {
        if msg.author.bot {
            return;
        }
        if !self.in_home_guild(msg.guild_id) {
            return;
        }

        if let Err(err) = self.handle_message(&ctx, &msg).await {
            error!("failed to handle message: {err}");
        }
    }

    async fn message_update(
        &self,
        ctx: SerenityContext,
        old_if_available: Option<Message>,
        new: Option<Message>,
        event: MessageUpdateEvent,
    ) {
        if event.author.as_ref().is_some_and(|author| author.bot) {
            return;
        }
        if !self.in_home_guild(event.guild_id) {
            return;
        }

        if let Err(err) = self
            .handle_message_update(&ctx, old_if_available, new, &event)
            .await
        {
            error!("failed to handle message update: {err}");
        }
    }

    async fn message_delete(
        &self,
        ctx: SerenityContext,
        channel_id: ChannelId,
        deleted_message_id: MessageId,
        guild_id: Option<GuildId>,
    ) {
        if !self.in_home_guild(guild_id) {
            return;
        }

        if let Err(err) = self
            .handle_message_delete(&ctx, channel_id, deleted_message_id)
            .await
        {
            error!("failed to handle message delete: {err}");
        }
    }

    async fn reaction_add(&self, ctx: SerenityContext, add_reaction: Reaction) {
        if let Err(err) = self.handle_reaction_event(&ctx, &add_reaction).await {
            error!("failed to handle reaction add: {err}");
        }
    }

    async fn reaction_remove(&self, ctx: SerenityContext, removed_reaction: Reaction) {
        if let Err(err) = self.handle_reaction_event(&ctx, &removed_reaction).await {
            error!("failed to handle reaction remove: {err}");
        }
    }

    async fn reaction_remove_all(
        &self,
        ctx: SerenityContext,
        _channel_id: ChannelId,
        removed_from_message_id: MessageId,
    ) {
        let gateway = match self.highlight_gateway(&ctx) {
            Ok(gateway) => gateway,
            Err(err) => {
                error!("failed to build highlight gateway: {err}");
                return;
            }
        };

        if let Err(err) = self
            .core
            .starboard
            .force_clear(&gateway, &removed_from_message_id.to_string())
            .await
        {
            error!("failed to handle reaction remove all: {err}");
        }
    }

    async fn guild_member_addition(&self, ctx: SerenityContext, member: Member) {
        if member.user.bot || member.pending {
            return;
        }
        if !self.in_home_guild(Some(member.guild_id)) {
            return;
        }

        if let Err(err) = self.handle_member_add(&ctx, &member).await {
            error!("failed to handle guild member addition: {err}");
        }
    }

    async fn guild_member_update(
        &self,
        _ctx: SerenityContext,
        _old_if_available: Option<Member>,
        new: Option<Member>,
        _event: GuildMemberUpdateEvent,
    ) {
        let Some(member) = new else {
            return;
        };
        if member.user.bot || member.pending {
            return;
        }
        if !self.in_home_guild(Some(member.guild_id)) {
            return;
        }
        if !self.core.config().roles.enabled {
            return;
        }

        let role_ids: Vec<String> = member.roles.iter().map(|id| id.to_string()).collect();
        if let Err(err) = rolesync::sync_member_roles_to_db(
            self.core.user_store().as_ref(),
            &member.user.id.to_string(),
            &role_ids,
            &self.core.config().roles.roles,
        )
        .await
        {
            error!("failed to handle guild member update: {err}");
        }
    }

    async fn guild_member_removal(
        &self,
        _ctx: SerenityContext,
        guild_id: GuildId,
        user: User,
        _member_data_if_available: Option<Member>,
    ) {
        if user.bot {
            return;
        }
        if !self.in_home_guild(Some(guild_id)) {
            return;
        }
        if !self.core.config().roles.enabled {
            return;
        }

        if let Err(err) =
            rolesync::clear_leave_flags(self.core.user_store().as_ref(), &user.id.to_string())
                .await
        {
            error!("failed to handle guild member removal: {err}");
        }
    }

    async fn interaction_create(&self, ctx: SerenityContext, interaction: Interaction) {
        let Interaction::Component(component) = interaction else {
            return;
        };

        let reaction = self.core.menus.handle(
            &component.message.id.to_string(),
            &component.data.custom_id,
            &component.user.id.to_string(),
        );
        let Some(reaction) = reaction else {
            // Not one of our menus.
            return;
        };

        let response = match reaction {
            MenuReaction::Show {
                page,
                page_index,
                page_count,
            } => {
                let mut message = CreateInteractionResponseMessage::new()
                    .components(menu_components(page_index, page_count, false));
                if let Some(content) = &page.content {
                    message = message.content(content);
                }
                if let Some(embed) = &page.embed {
                    message = message.embeds(vec![menu_embed(embed)]);
                }
                CreateInteractionResponse::UpdateMessage(message)
            }
            MenuReaction::RejectForeignUser => CreateInteractionResponse::Message(
                CreateInteractionResponseMessage::new()
                    .content("This menu can only be used by the user who triggered it.")
                    .ephemeral(true),
            ),
            MenuReaction::Finish { end_action } => match end_action_components(end_action) {
                Some(components) => CreateInteractionResponse::UpdateMessage(
                    CreateInteractionResponseMessage::new().components(components),
                ),
                None => CreateInteractionResponse::Acknowledge,
            },
            MenuReaction::Acknowledge => CreateInteractionResponse::Acknowledge,
        };

        if let Err(err) = component.create_response(&ctx.http, response).await {
            debug!("failed to respond to menu interaction: {err}");
        }
    }
}

impl BotEventHandler {
    fn in_home_guild(&self, guild_id: Option<GuildId>) -> bool {
        guild_id.is_some_and(|id| id.to_string() == self.core.config().bot.guild_id)
    }

    fn highlight_gateway(&self, ctx: &SerenityContext) -> Result<DiscordHighlightGateway> {
        DiscordHighlightGateway::new(ctx.http.clone(), self.core.starboard.channel_id())
    }

    async fn handle_reaction_event(
        &self,
        ctx: &SerenityContext,
        reaction: &Reaction,
    ) -> Result<()> {
        if !self.in_home_guild(reaction.guild_id) {
            return Ok(());
        }
        let ReactionType::Unicode(emoji) = &reaction.emoji else {
            return Ok(());
        };
        if emoji != self.core.starboard.emoji() || reaction.burst {
            return Ok(());
        }

        let message = reaction.message(&ctx.http).await?;
        self.sync_starboard_for(ctx, &message).await
    }

    async fn sync_starboard_for(&self, ctx: &SerenityContext, message: &Message) -> Result<()> {
        let Some(channel) = guild_channel(ctx, message.channel_id).await? else {
            return Ok(());
        };
        let source = build_source_message(ctx, message, &channel);

        if !self.core.starboard.eligible(&source) {
            debug!(
                "skip starboard sync message_id={} reason=not_processable",
                source.message_id
            );
            return Ok(());
        }

        let stars = count_qualifying_reactions(
            &ctx.http,
            message,
            &ReactionType::Unicode(self.core.starboard.emoji().to_string()),
        )
        .await?;

        let gateway = self.highlight_gateway(ctx)?;
        self.core.starboard.sync(&gateway, &source, stars).await
    }

    async fn handle_message(&self, ctx: &SerenityContext, msg: &Message) -> Result<()> {
        let config = self.core.config();

        // DB-held flags grant roles on activity, same as on join.
        if config.roles.enabled {
            if let Some(flags) =
                rolesync::member_flags(self.core.user_store().as_ref(), &msg.author.id.to_string())
                    .await?
            {
                let held: Vec<String> = msg
                    .member
                    .as_ref()
                    .map(|m| m.roles.iter().map(|id| id.to_string()).collect())
                    .unwrap_or_default();
                self.grant_roles(ctx, msg.author.id.to_string(), flags, &held)
                    .await;
            }
        }

        let Some((command, args)) = parse_command(&config.bot.prefix, &msg.content) else {
            return Ok(());
        };

        match command.as_str() {
            "snipe" => self.run_snipe(ctx, msg).await,
            "tag" => self.run_tag(ctx, msg, &args).await,
            "starstats" => self.run_starstats(ctx, msg).await,
            _ => {
                // Unknown commands fall through to the autotag hook.
                if let Some(reply) = tags::autotag_reply(
                    self.core.tag_store().as_ref(),
                    &config.bot.prefix,
                    &msg.content,
                )
                .await?
                {
                    self.reply(ctx, msg.channel_id, &reply).await?;
                }
                Ok(())
            }
        }
    }

    async fn run_snipe(&self, ctx: &SerenityContext, msg: &Message) -> Result<()> {
        let user_id = msg.author.id.to_string();
        if let Some(remaining) = self.core.cooldowns.check("snipe", &user_id, SNIPE_COOLDOWN) {
            return self
                .reply(
                    ctx,
                    msg.channel_id,
                    &format!("Slow down - try again in {remaining}s."),
                )
                .await;
        }

        let records = self.core.sniper.drain();
        if records.is_empty() {
            return self.reply(ctx, msg.channel_id, &empty_snipe_reply()).await;
        }

        let pages = build_snipe_pages(&records, &msg.author.tag(), self.core.sniper.lifetime_secs());
        self.send_pages(ctx, msg.channel_id, &user_id, pages).await
    }

    async fn run_tag(&self, ctx: &SerenityContext, msg: &Message, args: &[String]) -> Result<()> {
        let user_id = msg.author.id.to_string();
        if let Some(remaining) = self.core.cooldowns.check("tag", &user_id, TAG_COOLDOWN) {
            return self
                .reply(
                    ctx,
                    msg.channel_id,
                    &format!("Slow down - try again in {remaining}s."),
                )
                .await;
        }

        let staff = rolesync::member_flags(self.core.user_store().as_ref(), &user_id)
            .await?
            .is_some_and(is_staff);
        let reply = tags::run_tag_command(
            self.core.tag_store().as_ref(),
            &self.core.config().bot.prefix,
            staff,
            args,
        )
        .await?;
        self.reply(ctx, msg.channel_id, &reply).await
    }

    async fn run_starstats(&self, ctx: &SerenityContext, msg: &Message) -> Result<()> {
        let user_id = msg.author.id.to_string();
        if let Some(remaining) =
            self.core
                .cooldowns
                .check("starstats", &user_id, STARSTATS_COOLDOWN)
        {
            return self
                .reply(
                    ctx,
                    msg.channel_id,
                    &format!("Slow down - try again in {remaining}s."),
                )
                .await;
        }

        let stats = self.core.starboard.author_stats(&user_id).await?;
        let page = build_stats_page(
            &stats,
            &self.core.config().starboard.tiers,
            &self.core.config().bot.guild_id,
        );
        self.send_pages(ctx, msg.channel_id, &user_id, vec![page])
            .await
    }

    async fn handle_message_update(
        &self,
        ctx: &SerenityContext,
        old_if_available: Option<Message>,
        new: Option<Message>,
        event: &MessageUpdateEvent,
    ) -> Result<()> {
        let message = match new {
            Some(message) => message,
            None => ctx.http.get_message(event.channel_id, event.id).await?,
        };

        if let Some(old) = old_if_available {
            if !old.author.bot && old.content != message.content {
                if let Some(channel) = guild_channel(ctx, message.channel_id).await? {
                    if !is_hidden_from_everyone(&channel.permission_overwrites, channel.guild_id) {
                        self.core.sniper.record(
                            &old.author.tag(),
                            &channel.name,
                            &old.content,
                            SnipeKind::Edit,
                        );
                    }
                }
            }
        }

        if message.author.bot {
            return Ok(());
        }
        self.sync_starboard_for(ctx, &message).await
    }

    async fn handle_message_delete(
        &self,
        ctx: &SerenityContext,
        channel_id: ChannelId,
        deleted_message_id: MessageId,
    ) -> Result<()> {
        let cached = {
            ctx.cache
                .message(channel_id, deleted_message_id)
                .map(|message_ref| Message::clone(&message_ref))
        };

        if let Some(message) = cached {
            if !message.author.bot {
                if let Some(channel) = guild_channel(ctx, channel_id).await? {
                    if !is_hidden_from_everyone(&channel.permission_overwrites, channel.guild_id) {
                        self.core.sniper.record(
                            &message.author.tag(),
                            &channel.name,
                            &message.content,
                            SnipeKind::Delete,
                        );
                    }
                }
            }
        }

        let gateway = self.highlight_gateway(ctx)?;
        self.core
            .starboard
            .force_clear(&gateway, &deleted_message_id.to_string())
            .await
    }

    async fn handle_member_add(&self, ctx: &SerenityContext, member: &Member) -> Result<()> {
        let config = self.core.config();

        if let Some((channel_id, message)) =
            welcome::render_welcome(&config.welcome, &member.user.id.to_string())
        {
            let channel = parse_channel_id(&channel_id)?;
            channel
                .send_message(&ctx.http, CreateMessage::new().content(message))
                .await?;
        }

        if config.roles.enabled {
            if let Some(flags) = rolesync::member_flags(
                self.core.user_store().as_ref(),
                &member.user.id.to_string(),
            )
            .await?
            {
                let held: Vec<String> = member.roles.iter().map(|id| id.to_string()).collect();
                self.grant_roles(ctx, member.user.id.to_string(), flags, &held)
                    .await;
            }
        }

        Ok(())
    }

    /// Grant every database-held role the member is missing. Per-role REST
    /// failures are swallowed.
    async fn grant_roles(
        &self,
        ctx: &SerenityContext,
        user_id: String,
        flags: i64,
        held_role_ids: &[String],
    ) {
        let config = self.core.config();
        let Ok(guild_id) = config.bot.guild_id.parse::<u64>() else {
            return;
        };
        let Ok(user_id) = user_id.parse::<u64>() else {
            return;
        };

        for role_id in rolesync::roles_to_grant(flags, &config.roles.roles) {
            if held_role_ids.contains(&role_id) {
                continue;
            }
            let Ok(role_id) = role_id.parse::<u64>() else {
                continue;
            };
            if let Err(err) = ctx
                .http
                .add_member_role(
                    GuildId::new(guild_id),
                    serenity::all::UserId::new(user_id),
                    RoleId::new(role_id),
                    Some("user-flag role sync"),
                )
                .await
            {
                debug!("failed to grant role {role_id} to {user_id}: {err}");
            }
        }
    }

    async fn reply(&self, ctx: &SerenityContext, channel_id: ChannelId, text: &str) -> Result<()> {
        channel_id
            .send_message(&ctx.http, CreateMessage::new().content(text))
            .await?;
        Ok(())
    }

    /// Send one page directly, or the first page of many with button
    /// controls and a registered menu.
    async fn send_pages(
        &self,
        ctx: &SerenityContext,
        channel_id: ChannelId,
        owner_id: &str,
        pages: Vec<MenuPage>,
    ) -> Result<()> {
        let Some(first) = pages.first() else {
            return Ok(());
        };

        let mut message = CreateMessage::new();
        if let Some(content) = &first.content {
            message = message.content(content);
        }
        if let Some(embed) = &first.embed {
            message = message.embeds(vec![menu_embed(embed)]);
        }

        if pages.len() == 1 {
            channel_id.send_message(&ctx.http, message).await?;
            return Ok(());
        }

        message = message.components(menu_components(0, pages.len(), false));
        let sent = channel_id.send_message(&ctx.http, message).await?;

        self.core.menus.insert(
            &sent.id.to_string(),
            ButtonMenu::new(
                pages,
                owner_id,
                &channel_id.to_string(),
                self.core.menu_idle_timeout(),
            ),
        );
        Ok(())
    }
}

/// Serenity-backed implementation of the starboard's sending seam.
pub struct DiscordHighlightGateway {
    http: Arc<Http>,
    channel_id: ChannelId,
}

impl DiscordHighlightGateway {
    pub fn new(http: Arc<Http>, channel_id: &str) -> Result<Self> {
        Ok(Self {
            http,
            channel_id: parse_channel_id(channel_id)?,
        })
    }
}

#[async_trait]
impl HighlightGateway for DiscordHighlightGateway {
    async fn send_highlight(&self, payload: &HighlightPayload) -> Result<String> {
        let message = self
            .channel_id
            .send_message(
                &self.http,
                CreateMessage::new()
                    .content(&payload.content)
                    .embeds(highlight_embeds(payload))
                    .components(highlight_components(payload)),
            )
            .await?;
        Ok(message.id.to_string())
    }

    async fn edit_highlight(
        &self,
        highlight_message_id: &str,
        payload: &HighlightPayload,
    ) -> Result<()> {
        let message_id = parse_message_id(highlight_message_id)?;
        self.channel_id
            .edit_message(
                &self.http,
                message_id,
                EditMessage::new()
                    .content(&payload.content)
                    .embeds(highlight_embeds(payload))
                    .components(highlight_components(payload)),
            )
            .await?;
        Ok(())
    }

    async fn delete_highlight(&self, highlight_message_id: &str) -> Result<()> {
        let message_id = parse_message_id(highlight_message_id)?;
        self.channel_id
            .delete_message(&self.http, message_id)
            .await?;
        Ok(())
    }
}

fn parse_channel_id(raw: &str) -> Result<ChannelId> {
    raw.parse::<u64>()
        .map(ChannelId::new)
        .map_err(|_| anyhow!("invalid channel id: {raw}"))
}

fn parse_message_id(raw: &str) -> Result<MessageId> {
    raw.parse::<u64>()
        .map(MessageId::new)
        .map_err(|_| anyhow!("invalid message id: {raw}"))
}

async fn guild_channel(
    ctx: &SerenityContext,
    channel_id: ChannelId,
) -> Result<Option<GuildChannel>> {
    Ok(channel_id.to_channel(ctx).await?.guild())
}

/// A channel whose @everyone overwrite denies viewing stays out of the snipe
/// log.
fn is_hidden_from_everyone(overwrites: &[PermissionOverwrite], guild_id: GuildId) -> bool {
    let everyone = RoleId::new(guild_id.get());
    overwrites.iter().any(|overwrite| {
        overwrite.kind == PermissionOverwriteType::Role(everyone)
            && overwrite.deny.contains(Permissions::VIEW_CHANNEL)
    })
}

fn build_source_message(
    ctx: &SerenityContext,
    message: &Message,
    channel: &GuildChannel,
) -> SourceMessage {
    let guild_id = channel.guild_id.to_string();

    let attachments: Vec<AttachmentLink> = message
        .attachments
        .iter()
        .map(|attachment| AttachmentLink {
            filename: attachment.filename.clone(),
            url: attachment.url.clone(),
            is_image: attachment.width.is_some(),
        })
        .collect();

    let embeds: Vec<serde_json::Value> = message
        .embeds
        .iter()
        .filter_map(|embed| serde_json::to_value(embed).ok())
        .collect();

    let reply = message.referenced_message.as_deref().map(|replied| {
        let image_url = replied
            .attachments
            .iter()
            .find(|a| a.width.is_some())
            .map(|a| a.url.clone());
        ReplySummary {
            author_name: replied.author.name.clone(),
            author_avatar_url: replied.author.avatar_url(),
            jump_url: jump_url(
                &guild_id,
                &replied.channel_id.to_string(),
                &replied.id.to_string(),
            ),
            content: content_safe(
                &ctx.cache,
                &replied.content,
                &ContentSafeOptions::default(),
                &replied.mentions,
            ),
            image_url,
            timestamp_secs: replied
                .edited_timestamp
                .unwrap_or(replied.timestamp)
                .unix_timestamp(),
        }
    });

    SourceMessage {
        message_id: message.id.to_string(),
        channel_id: message.channel_id.to_string(),
        guild_id,
        author_id: message.author.id.to_string(),
        author_name: message.author.name.clone(),
        author_avatar_url: message.author.avatar_url(),
        content: content_safe(
            &ctx.cache,
            &message.content,
            &ContentSafeOptions::default(),
            &message.mentions,
        ),
        timestamp_secs: message
            .edited_timestamp
            .unwrap_or(message.timestamp)
            .unix_timestamp(),
        nsfw_channel: channel.nsfw,
        attachments,
        embeds,
        reply,
    }
}

/// Page through the reaction's users, dropping the author and bots.
async fn count_qualifying_reactions(
    http: &Http,
    message: &Message,
    emoji: &ReactionType,
) -> Result<u32> {
    let author_id = message.author.id.to_string();
    let mut count = 0u32;
    let mut after = None;

    loop {
        let batch = message
            .reaction_users(http, emoji.clone(), Some(REACTION_PAGE_SIZE), after)
            .await?;

        for user in &batch {
            if counts_toward_board(&user.id.to_string(), user.bot, &author_id) {
                count += 1;
            }
        }

        if batch.len() < REACTION_PAGE_SIZE as usize {
            break;
        }
        after = batch.last().map(|user| user.id);
    }

    Ok(count)
}

fn truncate_label(label: &str) -> String {
    label.chars().take(BUTTON_LABEL_LIMIT).collect()
}

fn highlight_embeds(payload: &HighlightPayload) -> Vec<CreateEmbed> {
    let mut embeds = Vec::new();

    if let Some(reply) = &payload.reply {
        let mut author = CreateEmbedAuthor::new(format!("Replying to {}", reply.author_name))
            .url(&reply.jump_url);
        if let Some(icon) = &reply.author_avatar_url {
            author = author.icon_url(icon);
        }

        let mut embed = CreateEmbed::new().author(author);
        if !reply.content.is_empty() {
            embed = embed.description(&reply.content);
        }
        if let Some(image) = &reply.image_url {
            embed = embed.image(image);
        }
        if let Ok(ts) = Timestamp::from_unix_timestamp(reply.timestamp_secs) {
            embed = embed.timestamp(ts);
        }
        embeds.push(embed);
    }

    let mut author = CreateEmbedAuthor::new(&payload.author_name).url(&payload.jump_url);
    if let Some(icon) = &payload.author_icon_url {
        author = author.icon_url(icon);
    }

    let mut embed = CreateEmbed::new().author(author).color(payload.color).field(
        "Jump to message",
        format!("[Click here]({})", payload.jump_url),
        false,
    );
    if !payload.description.is_empty() {
        embed = embed.description(&payload.description);
    }
    if let Some(image) = &payload.image_url {
        embed = embed.image(image);
    }
    if let Ok(ts) = Timestamp::from_unix_timestamp(payload.timestamp_secs) {
        embed = embed.timestamp(ts);
    }
    embeds.push(embed);

    // Embeds of the source message ride along unchanged.
    for forwarded in &payload.forwarded_embeds {
        if let Ok(parsed) = serde_json::from_value::<Embed>(forwarded.clone()) {
            embeds.push(CreateEmbed::from(parsed));
        }
    }

    embeds
}

fn highlight_components(payload: &HighlightPayload) -> Vec<CreateActionRow> {
    let mut jump_buttons =
        vec![CreateButton::new_link(&payload.jump_url).label("Jump to Message")];
    if let Some(reply) = &payload.reply {
        jump_buttons.push(CreateButton::new_link(&reply.jump_url).label("Jump to Reply"));
    }

    let mut rows = vec![CreateActionRow::Buttons(jump_buttons)];

    // At most four link rows fit under the jump row.
    for chunk in payload.attachment_links.chunks(LINK_BUTTONS_PER_ROW).take(4) {
        rows.push(CreateActionRow::Buttons(
            chunk
                .iter()
                .map(|attachment| {
                    CreateButton::new_link(&attachment.url)
                        .label(truncate_label(&attachment.filename))
                })
                .collect(),
        ));
    }

    rows
}

fn menu_embed(embed: &MenuEmbed) -> CreateEmbed {
    let mut builder = CreateEmbed::new();
    if let Some(description) = &embed.description {
        builder = builder.description(description);
    }
    for field in &embed.fields {
        builder = builder.field(&field.name, &field.value, false);
    }
    if let Some(footer) = &embed.footer {
        builder = builder.footer(CreateEmbedFooter::new(footer));
    }
    if let Some(color) = embed.color {
        builder = builder.color(color);
    }
    builder
}

fn menu_components(
    page_index: usize,
    page_count: usize,
    all_disabled: bool,
) -> Vec<CreateActionRow> {
    let has_previous = page_index > 0;
    let has_next = page_index + 1 < page_count;

    vec![CreateActionRow::Buttons(vec![
        CreateButton::new("previous")
            .label("Previous")
            .style(ButtonStyle::Secondary)
            .disabled(all_disabled || !has_previous),
        CreateButton::new("next")
            .label("Next")
            .style(ButtonStyle::Secondary)
            .disabled(all_disabled || !has_next),
        CreateButton::new("stop")
            .label("Stop")
            .style(ButtonStyle::Danger)
            .disabled(all_disabled),
    ])]
}

fn end_action_components(end_action: MenuEndAction) -> Option<Vec<CreateActionRow>> {
    match end_action {
        MenuEndAction::DisableButtons => Some(menu_components(0, 1, true)),
        MenuEndAction::RemoveButtons => Some(Vec::new()),
        MenuEndAction::LeaveAsIs => None,
    }
}

async fn neutralize_menu(
    http: &Http,
    channel_id: &str,
    message_id: &str,
    end_action: MenuEndAction,
) -> Result<()> {
    let Some(components) = end_action_components(end_action) else {
        return Ok(());
    };

    let channel_id = parse_channel_id(channel_id)?;
    let message_id = parse_message_id(message_id)?;
    channel_id
        .edit_message(http, message_id, EditMessage::new().components(components))
        .await?;
    Ok(())
}
