use poise::serenity_prelude as serenity;
use tracing::warn;

use warden_core::{Context, Error};
use warden_database::impls::messages::{
    create_custom_message, delete_custom_message, get_custom_message, list_custom_messages,
};
use warden_utils::embed::DEFAULT_EMBED_COLOR;
use warden_utils::payload::parse_custom_embed;

use crate::moderation::embeds::{reply_failure, reply_success};
use crate::utility::ensure_manage_guild;

const NOT_JSON: &str = "That is not valid JSON.";
const ALREADY_EXISTS: &str = "That custom message already exists.";
const DOES_NOT_EXIST: &str = "That custom message does not exist.";
const INVALID_MESSAGE: &str =
    "That custom message is invalid. Make sure your JSON data is correct.";

/// Normalise submitted JSON to its compact form.
fn normalize_json(raw: &str) -> Option<String> {
    serde_json::from_str::<serde_json::Value>(raw)
        .ok()
        .map(|value| value.to_string())
}

fn list_description(names: &[String]) -> String {
    if names.is_empty() {
        return "No custom messages found.".to_owned();
    }

    names
        .iter()
        .map(|name| format!("`{name}`"))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Load a stored message and turn it into an embed, replying with the
/// matching error when that is not possible.
async fn load_custom_embed(
    ctx: Context<'_>,
    name: &str,
) -> Result<Option<serenity::CreateEmbed>, Error> {
    let Some(message) = get_custom_message(&ctx.data().db, name).await? else {
        reply_failure(ctx, DOES_NOT_EXIST).await?;
        return Ok(None);
    };

    match parse_custom_embed(&message.json) {
        Ok(embed) => Ok(Some(serenity::CreateEmbed::from(embed))),
        Err(source) => {
            warn!(?source, name, "stored custom message does not parse as an embed");
            reply_failure(ctx, INVALID_MESSAGE).await?;
            Ok(None)
        }
    }
}

/// Create and send custom messages.
#[poise::command(
    slash_command,
    guild_only,
    category = "Utility",
    default_member_permissions = "MANAGE_GUILD",
    subcommands("embed_help", "create", "delete", "preview", "list", "send"),
    subcommand_required
)]
pub async fn embed(_ctx: Context<'_>) -> Result<(), Error> {
    Ok(())
}

/// Get help with the embed command.
#[poise::command(slash_command, rename = "help")]
pub async fn embed_help(ctx: Context<'_>) -> Result<(), Error> {
    if !ensure_manage_guild(ctx).await? {
        return Ok(());
    }

    let embed = serenity::CreateEmbed::new()
        .title("Embed Command Help")
        .description("The embed command stores custom messages that can be previewed and sent later.")
        .color(DEFAULT_EMBED_COLOR)
        .field(
            "Creating a message",
            "`/embed create <name> <json>` stores a message. The JSON is a single embed in Discord API format, for example `{\"title\": \"Rules\", \"description\": \"Be kind\"}`.",
            false,
        )
        .field(
            "Previewing a message",
            "`/embed preview <name>` shows the message only to you.",
            false,
        )
        .field(
            "Sending a message",
            "`/embed send <name> <channel>` posts the message in a channel.",
            false,
        )
        .field("Deleting a message", "`/embed delete <name>` removes the message.", false)
        .field("Listing all messages", "`/embed list` shows every stored name.", false);

    ctx.send(poise::CreateReply::default().ephemeral(true).embed(embed))
        .await?;
    Ok(())
}

/// Create a custom message.
#[poise::command(slash_command)]
pub async fn create(
    ctx: Context<'_>,
    #[description = "The name of the message"] name: String,
    #[description = "The JSON of the message (see /embed help)"] json: String,
) -> Result<(), Error> {
    if !ensure_manage_guild(ctx).await? {
        return Ok(());
    }

    let Some(json) = normalize_json(&json) else {
        reply_failure(ctx, NOT_JSON).await?;
        return Ok(());
    };

    if !create_custom_message(&ctx.data().db, &name, &json).await? {
        reply_failure(ctx, ALREADY_EXISTS).await?;
        return Ok(());
    }

    reply_success(
        ctx,
        format!(
            "Successfully added the custom message. You can preview it with `/embed preview {name}`"
        ),
    )
    .await
}

/// Delete a custom message.
#[poise::command(slash_command)]
pub async fn delete(
    ctx: Context<'_>,
    #[description = "The name of the message"] name: String,
) -> Result<(), Error> {
    if !ensure_manage_guild(ctx).await? {
        return Ok(());
    }

    if !delete_custom_message(&ctx.data().db, &name).await? {
        reply_failure(ctx, DOES_NOT_EXIST).await?;
        return Ok(());
    }

    reply_success(ctx, "Successfully deleted the custom message.").await
}

/// Preview a custom message.
#[poise::command(slash_command)]
pub async fn preview(
    ctx: Context<'_>,
    #[description = "The name of the message"] name: String,
) -> Result<(), Error> {
    if !ensure_manage_guild(ctx).await? {
        return Ok(());
    }

    let Some(embed) = load_custom_embed(ctx, &name).await? else {
        return Ok(());
    };

    ctx.send(poise::CreateReply::default().ephemeral(true).embed(embed))
        .await?;
    Ok(())
}

/// List all custom messages.
#[poise::command(slash_command)]
pub async fn list(ctx: Context<'_>) -> Result<(), Error> {
    if !ensure_manage_guild(ctx).await? {
        return Ok(());
    }

    let names: Vec<String> = list_custom_messages(&ctx.data().db)
        .await?
        .into_iter()
        .map(|message| message.name)
        .collect();

    let embed = serenity::CreateEmbed::new()
        .title("Custom Messages")
        .description(list_description(&names))
        .color(DEFAULT_EMBED_COLOR);

    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}

/// Send a custom message to a channel.
#[poise::command(slash_command)]
pub async fn send(
    ctx: Context<'_>,
    #[description = "The name of the message"] name: String,
    #[description = "The channel to send the message to"] channel: serenity::GuildChannel,
) -> Result<(), Error> {
    if !ensure_manage_guild(ctx).await? {
        return Ok(());
    }

    let Some(embed) = load_custom_embed(ctx, &name).await? else {
        return Ok(());
    };

    if let Err(source) = channel
        .id
        .send_message(ctx.http(), serenity::CreateMessage::new().embed(embed))
        .await
    {
        warn!(?source, name, channel_id = channel.id.get(), "failed to send custom message");
        reply_failure(ctx, "Failed to send the custom message.").await?;
        return Ok(());
    }

    reply_success(ctx, "Successfully sent the custom message.").await
}

#[cfg(test)]
mod tests {
    use super::{list_description, normalize_json};

    #[test]
    fn json_is_validated_and_compacted() {
        assert_eq!(
            normalize_json("{ \"title\" : \"Hi\" }").as_deref(),
            Some(r#"{"title":"Hi"}"#)
        );
        assert_eq!(normalize_json("{title: Hi}"), None);
    }

    #[test]
    fn list_renders_names_or_placeholder() {
        assert_eq!(list_description(&[]), "No custom messages found.");
        assert_eq!(
            list_description(&["rules".to_owned(), "faq".to_owned()]),
            "`rules` `faq`"
        );
    }
}
