use std::sync::LazyLock;
use std::time::Duration;

use futures::future::BoxFuture;
use poise::serenity_prelude as serenity;
use regex::Regex;
use tracing::{info, warn};
use uuid::Uuid;

use warden_core::Data;
use warden_database::Database;
use warden_database::impls::tickets::{
    NewTicket, close_ticket, create_ticket, find_open_ticket_by_thread,
    find_open_ticket_for_user, get_ticket, list_open_tickets,
};
use warden_database::model::tickets::Ticket;
use warden_utils::confirmation::{ConfirmationResult, prompt_confirm_cancel, settle_prompt};
use warden_utils::embed::DEFAULT_EMBED_COLOR;
use warden_utils::parse::custom_id_suffix;

use crate::events::{component_custom_id, modal_text_value, reason_modal};

pub const CLOSE_PREFIX: &str = "ticket_close_";
const WEBHOOK_NAME: &str = "Modmail";
const RELAYED: char = '✅';
const CREATE_PROMPT_TIMEOUT: Duration = Duration::from_secs(30);
const CLOSE_MODAL_TIMEOUT: Duration = Duration::from_secs(60);
const NO_REASON: &str = "No reason provided";
const CLOSED_BY_USER: &str = "Closed by user";

pub(crate) fn is_close_button(event: &serenity::FullEvent) -> bool {
    component_custom_id(event).is_some_and(|id| id.starts_with(CLOSE_PREFIX))
}

/// Staff prefix thread messages with `>` to keep them out of the relay.
pub(crate) fn is_not_staff_note(event: &serenity::FullEvent) -> bool {
    match event {
        serenity::FullEvent::Message { new_message } => !new_message.content.starts_with('>'),
        _ => false,
    }
}

static CLYDE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(c)(lyde)").expect("clyde pattern is valid"));

/// Webhook usernames may not contain "clyde"; break it up with a hair space.
pub fn webhook_username(tag: &str) -> String {
    CLYDE_PATTERN.replace_all(tag, "$1\u{200a}$2").into_owned()
}

/// Message content followed by attachment URLs, one per line.
pub fn relay_body(content: &str, attachment_urls: &[String]) -> String {
    let mut lines: Vec<&str> = Vec::with_capacity(attachment_urls.len() + 1);
    if !content.trim().is_empty() {
        lines.push(content);
    }
    lines.extend(attachment_urls.iter().map(String::as_str));
    lines.join("\n")
}

fn relay_parts(message: &serenity::Message) -> (String, Vec<serenity::CreateEmbed>) {
    let attachment_urls: Vec<String> = message
        .attachments
        .iter()
        .map(|attachment| attachment.url.clone())
        .collect();
    let embeds = message
        .embeds
        .iter()
        .cloned()
        .map(serenity::CreateEmbed::from)
        .collect();

    (relay_body(&message.content, &attachment_urls), embeds)
}

fn close_button_row(ticket_id: &str) -> Vec<serenity::CreateActionRow> {
    vec![serenity::CreateActionRow::Buttons(vec![
        serenity::CreateButton::new(format!("{CLOSE_PREFIX}{ticket_id}"))
            .label("Close Ticket")
            .emoji('🔒')
            .style(serenity::ButtonStyle::Secondary),
    ])]
}

fn ticket_opened_embed(user: &serenity::User, ticket_id: &str, description: &str) -> serenity::CreateEmbed {
    serenity::CreateEmbed::new()
        .title("Modmail Ticket created")
        .description(description)
        .color(DEFAULT_EMBED_COLOR)
        .author(serenity::CreateEmbedAuthor::new(user.tag()).icon_url(user.face()))
        .field("User", format!("<@{}>", user.id), true)
        .field("ID", format!("`{ticket_id}`"), true)
        .timestamp(serenity::Timestamp::now())
}

fn ticket_closed_embed(actor: &serenity::User, reason: &str) -> serenity::CreateEmbed {
    serenity::CreateEmbed::new()
        .title("🔒 Ticket Closed")
        .description("This ticket was marked as resolved. Messages will no longer be sent or received between this channel and the user.")
        .color(DEFAULT_EMBED_COLOR)
        .author(serenity::CreateEmbedAuthor::new(actor.tag()).icon_url(actor.face()))
        .field("Closed by", format!("<@{}>", actor.id), true)
        .field("Reason", reason, true)
        .timestamp(serenity::Timestamp::now())
}

/// Find the bot's relay webhook on `channel_id`, creating it when missing.
async fn relay_webhook(
    ctx: &serenity::Context,
    channel_id: serenity::ChannelId,
) -> anyhow::Result<serenity::Webhook> {
    let existing = channel_id
        .webhooks(&ctx.http)
        .await?
        .into_iter()
        .find(|webhook| webhook.token.is_some());

    if let Some(webhook) = existing {
        return Ok(webhook);
    }

    let webhook = channel_id
        .create_webhook(
            &ctx.http,
            serenity::CreateWebhook::new(WEBHOOK_NAME).audit_log_reason("Modmail ticketing"),
        )
        .await?;
    info!(channel_id = channel_id.get(), "created modmail webhook");
    Ok(webhook)
}

async fn relay_to_thread(
    ctx: &serenity::Context,
    ticket: &Ticket,
    message: &serenity::Message,
) -> anyhow::Result<()> {
    let (body, embeds) = relay_parts(message);
    if body.is_empty() && embeds.is_empty() {
        return Ok(());
    }

    let webhook = relay_webhook(ctx, serenity::ChannelId::new(ticket.channel_id)).await?;
    let mut execute = serenity::ExecuteWebhook::new()
        .username(webhook_username(&message.author.tag()))
        .avatar_url(message.author.face())
        .in_thread(serenity::ChannelId::new(ticket.thread_id))
        .embeds(embeds);
    if !body.is_empty() {
        execute = execute.content(body);
    }

    webhook.execute(&ctx.http, false, execute).await?;
    message.react(&ctx.http, RELAYED).await?;
    Ok(())
}

/// Open a forum thread in the ticket channel for `user` and record it.
pub async fn open_ticket(
    ctx: &serenity::Context,
    data: &Data,
    user: &serenity::User,
) -> anyhow::Result<Option<Ticket>> {
    let Some(ticket_channel) = data.config.ticket_channel else {
        warn!("ticket requested but tickets_ticketChannel is not configured");
        return Ok(None);
    };

    let ticket_id = Uuid::new_v4().to_string();
    let starter = serenity::CreateMessage::new()
        .embed(ticket_opened_embed(
            user,
            &ticket_id,
            "Close this ticket at any time by pressing the Close Ticket button below. To send a message to this channel only (not visible to the user), prepend > to it.",
        ))
        .components(close_button_row(&ticket_id));

    let thread = serenity::ChannelId::new(ticket_channel)
        .create_forum_post(
            &ctx.http,
            serenity::CreateForumPost::new(format!("{}'s ticket", user.tag()), starter)
                .auto_archive_duration(serenity::AutoArchiveDuration::OneWeek),
        )
        .await?;

    let dm = serenity::CreateMessage::new()
        .embed(ticket_opened_embed(
            user,
            &ticket_id,
            "Any messages, images, videos, or other files you send here will be visible to staff. To close this ticket, press the `Close Ticket` button below.",
        ))
        .components(close_button_row(&ticket_id));
    if let Err(source) = user.direct_message(&ctx.http, dm).await {
        warn!(?source, user_id = user.id.get(), "failed to DM ticket confirmation");
    }

    let ticket = create_ticket(
        &data.db,
        NewTicket {
            ticket_id: &ticket_id,
            user_id: user.id.get(),
            channel_id: ticket_channel,
            thread_id: thread.id.get(),
        },
    )
    .await?;

    info!(ticket_id, user_id = user.id.get(), "ticket opened");
    Ok(Some(ticket))
}

async fn prompt_ticket_creation(
    ctx: serenity::Context,
    data: Data,
    message: serenity::Message,
) -> anyhow::Result<()> {
    let prompt = serenity::CreateEmbed::new()
        .title("Create ticket?")
        .description("Are you sure you would like to open a modmail ticket? If you do so, a new thread will be created that allows you to chat one-on-one with the staff. Messages you send to this channel while your ticket is open will be visible to all staff members.")
        .color(DEFAULT_EMBED_COLOR)
        .author(
            serenity::CreateEmbedAuthor::new(message.author.tag()).icon_url(message.author.face()),
        )
        .footer(serenity::CreateEmbedFooter::new(
            "This interaction times out in 30 seconds",
        ))
        .timestamp(serenity::Timestamp::now());

    match prompt_confirm_cancel(
        &ctx,
        message.channel_id,
        message.author.id,
        prompt,
        CREATE_PROMPT_TIMEOUT,
    )
    .await?
    {
        ConfirmationResult::Confirmed(press) => {
            settle_prompt(&ctx.http, &press, "Opening your ticket...").await?;
            open_ticket(&ctx, &data, &message.author).await?;
        }
        ConfirmationResult::Cancelled(press) => {
            settle_prompt(&ctx.http, &press, "Cancelled ticket creation").await?;
        }
        ConfirmationResult::TimedOut(mut prompt) => {
            prompt
                .edit(&ctx.http, serenity::EditMessage::new().components(vec![]))
                .await?;
        }
    }

    Ok(())
}

/// Relay DMs into an open ticket, or offer to open one.
pub fn on_direct_message<'a>(
    ctx: &'a serenity::Context,
    event: &'a serenity::FullEvent,
    data: &'a Data,
) -> BoxFuture<'a, anyhow::Result<()>> {
    Box::pin(async move {
        let serenity::FullEvent::Message { new_message } = event else {
            return Ok(());
        };

        if let Some(ticket) = find_open_ticket_for_user(&data.db, new_message.author.id.get()).await? {
            return relay_to_thread(ctx, &ticket, new_message).await;
        }

        if !new_message.content.to_lowercase().contains("create ticket") {
            return Ok(());
        }

        let (ctx, data, message) = (ctx.clone(), data.clone(), new_message.clone());
        tokio::spawn(async move {
            if let Err(source) = prompt_ticket_creation(ctx, data, message).await {
                warn!(?source, "ticket creation prompt failed");
            }
        });
        Ok(())
    })
}

/// Relay staff replies from a ticket thread to the user's DMs.
pub fn on_thread_message<'a>(
    ctx: &'a serenity::Context,
    event: &'a serenity::FullEvent,
    data: &'a Data,
) -> BoxFuture<'a, anyhow::Result<()>> {
    Box::pin(async move {
        let serenity::FullEvent::Message { new_message } = event else {
            return Ok(());
        };
        let Some(ticket) = find_open_ticket_by_thread(&data.db, new_message.channel_id.get()).await?
        else {
            return Ok(());
        };

        let (body, embeds) = relay_parts(new_message);
        if body.is_empty() && embeds.is_empty() {
            return Ok(());
        }

        let mut relayed = serenity::CreateMessage::new().embeds(embeds);
        if !body.is_empty() {
            relayed = relayed.content(body);
        }

        let dm = serenity::UserId::new(ticket.user_id)
            .create_dm_channel(&ctx.http)
            .await?;
        dm.send_message(&ctx.http, relayed).await?;
        new_message.react(&ctx.http, RELAYED).await?;
        Ok(())
    })
}

/// Mark a ticket closed and retire its thread. Returns the ticket when this
/// call closed it.
pub async fn close_ticket_thread(
    ctx: &serenity::Context,
    db: &Database,
    ticket_id: &str,
    actor: &serenity::User,
    reason: &str,
) -> anyhow::Result<Option<Ticket>> {
    let Some(ticket) = get_ticket(db, ticket_id).await? else {
        return Ok(None);
    };
    if !close_ticket(db, ticket_id, Some(reason)).await? {
        return Ok(None);
    }

    let thread_id = serenity::ChannelId::new(ticket.thread_id);
    if let Err(source) = thread_id
        .send_message(
            &ctx.http,
            serenity::CreateMessage::new().embed(ticket_closed_embed(actor, reason)),
        )
        .await
    {
        warn!(?source, ticket_id, "failed to post ticket closed notice");
    }

    let thread_name = match thread_id.to_channel(ctx).await {
        Ok(channel) => channel.guild().map(|thread| thread.name),
        Err(source) => {
            warn!(?source, ticket_id, "failed to fetch ticket thread");
            None
        }
    };

    let mut edit = serenity::EditThread::new()
        .archived(true)
        .audit_log_reason("Ticket closed");
    if let Some(name) = thread_name {
        edit = edit.name(format!("[Closed] {name}"));
    }
    if let Err(source) = thread_id.edit_thread(&ctx.http, edit).await {
        warn!(?source, ticket_id, "failed to archive ticket thread");
    }

    info!(ticket_id, reason, "ticket closed");
    Ok(Some(ticket))
}

/// Close a modmail ticket and tell the user.
pub async fn close_modmail_ticket(
    ctx: &serenity::Context,
    db: &Database,
    ticket_id: &str,
    actor: &serenity::User,
    reason: &str,
) -> anyhow::Result<()> {
    let Some(ticket) = close_ticket_thread(ctx, db, ticket_id, actor, reason).await? else {
        return Ok(());
    };

    let notice = serenity::CreateEmbed::new()
        .title("🔒 Ticket Closed")
        .description("Your ticket has been closed by a moderator. If you require any further assistance, please open a new ticket. Messages sent here will no longer be shared in the thread channel.")
        .color(DEFAULT_EMBED_COLOR)
        .field("Reason", reason, false)
        .timestamp(serenity::Timestamp::now());

    let dm = serenity::UserId::new(ticket.user_id)
        .create_dm_channel(&ctx.http)
        .await;
    let sent = match dm {
        Ok(dm) => dm
            .send_message(&ctx.http, serenity::CreateMessage::new().embed(notice))
            .await
            .map(|_| ()),
        Err(source) => Err(source),
    };
    if let Err(source) = sent {
        warn!(?source, ticket_id, "failed to DM ticket closure");
    }

    Ok(())
}

async fn await_close_reason(
    ctx: &serenity::Context,
    press: &serenity::ComponentInteraction,
) -> anyhow::Result<String> {
    let modal_id = format!("ticket_close_reason_{}", press.id);
    press
        .create_response(
            &ctx.http,
            serenity::CreateInteractionResponse::Modal(reason_modal(
                &modal_id,
                "Close ticket",
                "Enter a reason for closing this ticket",
                serenity::InputTextStyle::Short,
            )),
        )
        .await?;

    let submit = serenity::ModalInteractionCollector::new(ctx)
        .author_id(press.user.id)
        .filter(move |submit| submit.data.custom_id == modal_id)
        .timeout(CLOSE_MODAL_TIMEOUT)
        .await;

    let Some(submit) = submit else {
        return Ok(NO_REASON.to_owned());
    };

    submit
        .create_response(&ctx.http, serenity::CreateInteractionResponse::Acknowledge)
        .await?;
    Ok(modal_text_value(&submit, "reason").unwrap_or_else(|| NO_REASON.to_owned()))
}

pub fn on_close_button<'a>(
    ctx: &'a serenity::Context,
    event: &'a serenity::FullEvent,
    data: &'a Data,
) -> BoxFuture<'a, anyhow::Result<()>> {
    Box::pin(async move {
        let serenity::FullEvent::InteractionCreate { interaction } = event else {
            return Ok(());
        };
        let Some(press) = interaction.as_message_component() else {
            return Ok(());
        };
        let Some(ticket_id) = custom_id_suffix(&press.data.custom_id, CLOSE_PREFIX) else {
            return Ok(());
        };

        if press.guild_id.is_none() {
            press
                .create_response(&ctx.http, serenity::CreateInteractionResponse::Acknowledge)
                .await?;
            return close_modmail_ticket(ctx, &data.db, ticket_id, &press.user, CLOSED_BY_USER).await;
        }

        let reason = await_close_reason(ctx, press).await?;
        close_modmail_ticket(ctx, &data.db, ticket_id, &press.user, &reason).await
    })
}

/// Un-archive threads of tickets that are still open. Returns how many were
/// reopened.
pub async fn reopen_archived_tickets(ctx: &serenity::Context, db: &Database) -> anyhow::Result<usize> {
    let mut reopened = 0;

    for ticket in list_open_tickets(db).await? {
        let thread_id = serenity::ChannelId::new(ticket.thread_id);
        let archived = match thread_id.to_channel(ctx).await {
            Ok(channel) => channel
                .guild()
                .and_then(|thread| thread.thread_metadata)
                .is_some_and(|metadata| metadata.archived),
            Err(source) => {
                warn!(?source, ticket_id = %ticket.ticket_id, "failed to fetch ticket thread");
                continue;
            }
        };

        if !archived {
            continue;
        }

        match thread_id
            .edit_thread(&ctx.http, serenity::EditThread::new().archived(false))
            .await
        {
            Ok(_) => reopened += 1,
            Err(source) => {
                warn!(?source, ticket_id = %ticket.ticket_id, "failed to reopen ticket thread");
            }
        }
    }

    Ok(reopened)
}

#[cfg(test)]
mod tests {
    use super::{relay_body, webhook_username};

    #[test]
    fn clyde_is_broken_up_in_webhook_names() {
        assert_eq!(webhook_username("Clyde#0001"), "C\u{200a}lyde#0001");
        assert_eq!(webhook_username("xXcLyDeXx"), "xXc\u{200a}LyDeXx");
        assert_eq!(webhook_username("ada"), "ada");
    }

    #[test]
    fn relay_body_appends_attachment_urls() {
        let urls = vec!["https://cdn.example/a.png".to_owned()];

        assert_eq!(relay_body("hello", &urls), "hello\nhttps://cdn.example/a.png");
        assert_eq!(relay_body("  ", &urls), "https://cdn.example/a.png");
        assert_eq!(relay_body("", &[]), "");
    }
}
