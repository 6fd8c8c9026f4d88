use poise::serenity_prelude as serenity;
use tracing::{info, warn};

use warden_core::{Context, Error};
use warden_database::impls::reaction_roles::{
    clear_reaction_cap, list_reaction_roles, reaction_roles_for_message, register_reaction_role,
    set_reaction_cap, unregister_reaction_role,
};
use warden_database::model::reaction_roles::{ReactionCap, ReactionRoleBinding};
use warden_utils::embed::{build_paginated_embed, warning_embed};
use warden_utils::formatting::{message_url, role_mention};
use warden_utils::pagination::{chunk_pages, paginate_pages};
use warden_utils::parse::{MessageLink, normalize_emoji, parse_message_link};

use crate::moderation::embeds::{reply_failure, reply_success};
use crate::utility::ensure_manage_guild;

const INVALID_LINK: &str = "The message link provided is invalid.";
const REACTION_FAILED: &str = "I couldn't add the reaction to the message. Double check that it's a valid emoji and I have permission to add reactions to the message.";
const BINDINGS_PER_PAGE: usize = 10;

/// Resolve a message link to a message the bot can see.
async fn resolve_link(ctx: Context<'_>, raw: &str) -> Result<Option<serenity::Message>, Error> {
    let Some(MessageLink {
        channel_id,
        message_id,
    }) = parse_message_link(raw)
    else {
        reply_failure(ctx, INVALID_LINK).await?;
        return Ok(None);
    };

    match serenity::ChannelId::new(channel_id)
        .message(ctx.http(), serenity::MessageId::new(message_id))
        .await
    {
        Ok(message) => Ok(Some(message)),
        Err(source) => {
            warn!(?source, channel_id, message_id, "reaction role message lookup failed");
            reply_failure(ctx, INVALID_LINK).await?;
            Ok(None)
        }
    }
}

pub(crate) fn binding_entry(guild_id: u64, binding: &ReactionRoleBinding) -> String {
    format!(
        "{} → {} ([Jump]({}))",
        binding.emoji,
        role_mention(binding.role_id),
        message_url(guild_id, binding.channel_id, binding.message_id)
    )
}

/// Configure reaction roles.
#[poise::command(
    slash_command,
    guild_only,
    category = "Utility",
    default_member_permissions = "MANAGE_GUILD",
    subcommands("add", "remove", "list", "limit"),
    subcommand_required
)]
pub async fn reactroles(_ctx: Context<'_>) -> Result<(), Error> {
    Ok(())
}

/// Add a reaction role to a message.
#[poise::command(slash_command)]
pub async fn add(
    ctx: Context<'_>,
    #[description = "A link to the message to add the reaction role to"] message: String,
    #[description = "The emoji to add to the message"] emoji: String,
    #[description = "The role to give to the user when they react"] role: serenity::Role,
) -> Result<(), Error> {
    if !ensure_manage_guild(ctx).await? {
        return Ok(());
    }

    if role.managed {
        reply_failure(ctx, "You cannot add a reaction role for a managed role.").await?;
        return Ok(());
    }

    let Some(target) = resolve_link(ctx, &message).await? else {
        return Ok(());
    };

    let emoji = normalize_emoji(&emoji);
    let registered = register_reaction_role(
        &ctx.data().db,
        &ReactionRoleBinding {
            channel_id: target.channel_id.get(),
            message_id: target.id.get(),
            emoji: emoji.clone(),
            role_id: role.id.get(),
        },
    )
    .await?;

    if !registered {
        reply_failure(ctx, "That emoji is already bound to a role on this message.").await?;
        return Ok(());
    }

    info!(
        message_id = target.id.get(),
        role_id = role.id.get(),
        emoji,
        "reaction role registered"
    );
    reply_success(ctx, "Successfully added the reaction role.").await?;

    let reacted = match serenity::ReactionType::try_from(emoji.as_str()) {
        Ok(reaction) => target.react(ctx.http(), reaction).await.is_ok(),
        Err(_) => false,
    };

    if !reacted {
        ctx.send(poise::CreateReply::default().embed(warning_embed(REACTION_FAILED)))
            .await?;
    }

    Ok(())
}

/// Remove a reaction role from a message.
#[poise::command(slash_command)]
pub async fn remove(
    ctx: Context<'_>,
    #[description = "A link to the message to remove the reaction role from"] message: String,
    #[description = "The emoji to remove from the message"] emoji: String,
    #[description = "The role bound to the emoji"] role: serenity::Role,
) -> Result<(), Error> {
    if !ensure_manage_guild(ctx).await? {
        return Ok(());
    }

    let Some(MessageLink { message_id, .. }) = parse_message_link(&message) else {
        reply_failure(ctx, INVALID_LINK).await?;
        return Ok(());
    };

    let emoji = normalize_emoji(&emoji);
    if !unregister_reaction_role(&ctx.data().db, message_id, &emoji, role.id.get()).await? {
        reply_failure(ctx, "That reaction role does not exist.").await?;
        return Ok(());
    }

    reply_success(ctx, "Successfully removed the reaction role.").await
}

/// List every reaction role.
#[poise::command(slash_command)]
pub async fn list(ctx: Context<'_>) -> Result<(), Error> {
    if !ensure_manage_guild(ctx).await? {
        return Ok(());
    }
    let Some(guild_id) = ctx.guild_id() else {
        return Ok(());
    };

    let bindings = list_reaction_roles(&ctx.data().db).await?;
    if bindings.is_empty() {
        ctx.send(poise::CreateReply::default().embed(build_paginated_embed(
            "Reaction roles",
            "No reaction roles found.",
            1,
            1,
        )))
        .await?;
        return Ok(());
    }

    let entries: Vec<String> = bindings
        .iter()
        .map(|binding| binding_entry(guild_id.get(), binding))
        .collect();
    paginate_pages(ctx, "Reaction roles", &chunk_pages(&entries, BINDINGS_PER_PAGE)).await?;

    Ok(())
}

/// Cap how many of a message's reaction roles a member may hold.
#[poise::command(slash_command)]
pub async fn limit(
    ctx: Context<'_>,
    #[description = "A link to the message with reaction roles"] message: String,
    #[description = "Most roles a member may hold from this message (0 removes the limit)"]
    max: u32,
) -> Result<(), Error> {
    if !ensure_manage_guild(ctx).await? {
        return Ok(());
    }

    let Some(MessageLink { message_id, .. }) = parse_message_link(&message) else {
        reply_failure(ctx, INVALID_LINK).await?;
        return Ok(());
    };

    let db = &ctx.data().db;
    if max == 0 {
        clear_reaction_cap(db, message_id).await?;
        return reply_success(ctx, "Removed the reaction role limit.").await;
    }

    let roles = reaction_roles_for_message(db, message_id).await?.bound_roles();
    if roles.is_empty() {
        reply_failure(ctx, "That message has no reaction roles.").await?;
        return Ok(());
    }

    set_reaction_cap(
        db,
        &ReactionCap {
            message_id,
            roles,
            max,
        },
    )
    .await?;

    reply_success(
        ctx,
        format!("Members can now hold at most {max} of the roles on that message."),
    )
    .await
}

#[cfg(test)]
mod tests {
    use warden_database::model::reaction_roles::ReactionRoleBinding;

    use super::binding_entry;

    #[test]
    fn entry_links_back_to_the_message() {
        let binding = ReactionRoleBinding {
            channel_id: 2,
            message_id: 3,
            emoji: "🎮".to_owned(),
            role_id: 9,
        };

        assert_eq!(
            binding_entry(1, &binding),
            "🎮 → <@&9> ([Jump](https://discord.com/channels/1/2/3))"
        );
    }
}
