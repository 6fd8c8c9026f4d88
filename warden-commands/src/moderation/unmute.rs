use poise::serenity_prelude as serenity;

use warden_core::{Context, Error};

use crate::moderation::dispatch::{PlannedAction, perform_action};
use crate::moderation::embeds::{GUILD_ONLY, reason_or_default, reply_failure};

/// Lift a member's mute.
#[poise::command(
    slash_command,
    guild_only,
    category = "Moderation",
    default_member_permissions = "MODERATE_MEMBERS"
)]
pub async fn unmute(
    ctx: Context<'_>,
    #[description = "The member to unmute"] user: serenity::User,
    #[description = "Reason for the unmute"] reason: Option<String>,
) -> Result<(), Error> {
    let Some(guild_id) = ctx.guild_id() else {
        reply_failure(ctx, GUILD_ONLY).await?;
        return Ok(());
    };

    perform_action(
        ctx,
        guild_id,
        &user,
        reason_or_default(reason.as_deref()),
        PlannedAction::Unmute,
    )
    .await
}
