pub mod embed;
pub mod reactroles;
pub mod verifypanel;

use poise::serenity_prelude as serenity;

use warden_core::{Context, Error};
use warden_utils::permissions::has_user_permission;

use crate::moderation::embeds::{GUILD_ONLY, MISSING_PERMISSION, reply_failure};

/// Replies with the matching failure and returns `false` unless the invoking
/// user can manage the guild.
pub async fn ensure_manage_guild(ctx: Context<'_>) -> Result<bool, Error> {
    let Some(guild_id) = ctx.guild_id() else {
        reply_failure(ctx, GUILD_ONLY).await?;
        return Ok(false);
    };

    if !has_user_permission(
        ctx.http(),
        guild_id,
        ctx.author().id,
        serenity::Permissions::MANAGE_GUILD,
    )
    .await?
    {
        reply_failure(ctx, MISSING_PERMISSION).await?;
        return Ok(false);
    }

    Ok(true)
}
