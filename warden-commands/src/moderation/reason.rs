use poise::serenity_prelude as serenity;
use tracing::{info, warn};

use warden_core::{Context, Error};
use warden_database::impls::cases::update_case_reason;
use warden_utils::permissions::has_user_permission;

use crate::moderation::embeds::{GUILD_ONLY, MISSING_PERMISSION, reply_failure, reply_success};
use crate::moderation::gateway::SerenityGateway;
use crate::moderation::logging::republish_case;

/// Update the reason of a case.
#[poise::command(
    slash_command,
    guild_only,
    category = "Moderation",
    default_member_permissions = "MODERATE_MEMBERS"
)]
pub async fn reason(
    ctx: Context<'_>,
    #[description = "The UUID or number of the case"]
    #[rename = "case"]
    case_key: String,
    #[description = "The new reason for the case"] reason: String,
) -> Result<(), Error> {
    let Some(guild_id) = ctx.guild_id() else {
        reply_failure(ctx, GUILD_ONLY).await?;
        return Ok(());
    };

    if !has_user_permission(
        ctx.http(),
        guild_id,
        ctx.author().id,
        serenity::Permissions::MODERATE_MEMBERS,
    )
    .await?
    {
        reply_failure(ctx, MISSING_PERMISSION).await?;
        return Ok(());
    }

    let Some(case) = update_case_reason(&ctx.data().db, &case_key, reason.trim()).await? else {
        reply_failure(ctx, "Case not found.").await?;
        return Ok(());
    };

    let gateway = SerenityGateway::new(ctx.serenity_context(), guild_id);
    if let Err(source) = republish_case(&gateway, &case).await {
        warn!(?source, case_number = case.case_number, "failed to edit logged case");
    }

    info!(
        case_number = case.case_number,
        moderator_id = ctx.author().id.get(),
        "case reason updated"
    );

    reply_success(
        ctx,
        format!("Successfully updated reason for case #{}.", case.case_number),
    )
    .await
}
