use poise::serenity_prelude as serenity;

use warden_core::{Context, Error};
use warden_utils::duration::parse_duration;

use crate::moderation::dispatch::{PlannedAction, perform_action};
use crate::moderation::embeds::{GUILD_ONLY, INVALID_DURATION, reason_or_default, reply_failure};

/// Ban a user from the server.
#[poise::command(
    slash_command,
    guild_only,
    category = "Moderation",
    default_member_permissions = "BAN_MEMBERS"
)]
pub async fn ban(
    ctx: Context<'_>,
    #[description = "The user to ban"] user: serenity::User,
    #[description = "How long to ban for, e.g. 7d or 1y 2mo (default: permanent)"]
    duration: Option<String>,
    #[description = "Reason for the ban"] reason: Option<String>,
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
        PlannedAction::Ban { duration_seconds },
    )
    .await
}
