use poise::serenity_prelude as serenity;

use warden_core::{Context, Error};
use warden_utils::duration::parse_duration;

use crate::moderation::dispatch::{PlannedAction, perform_action};
use crate::moderation::embeds::{GUILD_ONLY, INVALID_DURATION, reason_or_default, reply_failure};

/// Mute a member with the muted role and a timeout.
#[poise::command(
    slash_command,
    guild_only,
    category = "Moderation",
    default_member_permissions = "MODERATE_MEMBERS"
)]
pub async fn mute(
    ctx: Context<'_>,
    #[description = "The member to mute"] user: serenity::User,
    #[description = "How long to mute for, e.g. 30m or 2d 3h (default: permanent)"]
    duration: Option<String>,
    #[description = "Reason for the mute"] reason: Option<String>,
) -> Result<(), Error> {
    let Some(guild_id) = ctx.guild_id() else {
        reply_failure(ctx, GUILD_ONLY).await?;
        return Ok(());
    };

    let Ok(duration_seconds) = parse_duration(duration.as_deref()) else {
        reply_failure(ctx, INVALID_DURATION).await?;
        return Ok(());
    };

    perform_action(
        ctx,
        guild_id,
        &user,
        reason_or_default(reason.as_deref()),
        PlannedAction::Mute { duration_seconds },
    )
    .await
}
