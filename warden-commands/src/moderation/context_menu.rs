use std::time::Duration;

use poise::serenity_prelude as serenity;

use warden_core::{ApplicationContext, Context, Error};
use warden_utils::duration::{SanctionInput, parse_sanction_input};
use warden_utils::guard::ModAction;

use crate::moderation::dispatch::{PlannedAction, execute_planned};
use crate::moderation::embeds::{GUILD_ONLY, INVALID_DURATION, reason_or_default, reply_failure};
use crate::moderation::guard::ensure_allowed;

const MODAL_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, poise::Modal)]
#[name = "Ban"]
struct BanModal {
    #[name = "Duration of ban"]
    #[placeholder = "\"1y 1mo 1d 1h 1m 1s\" or \"Permanent\", or \"Unban\" to unban"]
    duration: String,
    #[name = "Reason"]
    #[placeholder = "Enter a reason for the ban"]
    #[paragraph]
    reason: Option<String>,
}

#[derive(Debug, poise::Modal)]
#[name = "Mute"]
struct MuteModal {
    #[name = "Duration of mute"]
    #[placeholder = "\"1y 1mo 1d 1h 1m 1s\" or \"Permanent\", or \"Unmute\" to unmute"]
    duration: String,
    #[name = "Reason"]
    #[placeholder = "Enter a reason for the mute"]
    #[paragraph]
    reason: Option<String>,
}

#[derive(Debug, poise::Modal)]
#[name = "Kick"]
struct KickModal {
    #[name = "Reason"]
    #[placeholder = "Enter a reason for the kick"]
    #[paragraph]
    reason: Option<String>,
}

#[derive(Debug, poise::Modal)]
#[name = "Warn"]
struct WarnModal {
    #[name = "Reason"]
    #[placeholder = "Enter a reason for the warn"]
    #[paragraph]
    reason: Option<String>,
}

/// Pick between applying and revoking from the modal's duration field.
fn plan_sanction(
    raw_duration: &str,
    revoke_keyword: &str,
    apply: fn(i64) -> PlannedAction,
    revoke: PlannedAction,
) -> Option<PlannedAction> {
    match parse_sanction_input(raw_duration, revoke_keyword).ok()? {
        SanctionInput::Revoke => Some(revoke),
        SanctionInput::Apply(duration_seconds) => Some(apply(duration_seconds)),
    }
}

/// Guard the target before the modal is shown.
async fn guarded_guild(
    ctx: Context<'_>,
    action: ModAction,
    target: &serenity::User,
) -> Result<Option<serenity::GuildId>, Error> {
    let Some(guild_id) = ctx.guild_id() else {
        reply_failure(ctx, GUILD_ONLY).await?;
        return Ok(None);
    };

    if !ensure_allowed(ctx, guild_id, action, target).await? {
        return Ok(None);
    }

    Ok(Some(guild_id))
}

#[poise::command(
    context_menu_command = "Ban",
    guild_only,
    category = "Moderation",
    default_member_permissions = "BAN_MEMBERS"
)]
pub async fn ban_message_author(
    ctx: ApplicationContext<'_>,
    #[description = "Message whose author to ban"] message: serenity::Message,
) -> Result<(), Error> {
    let target = message.author;
    let Some(guild_id) = guarded_guild(ctx.into(), ModAction::Ban, &target).await? else {
        return Ok(());
    };

    let Some(submission) = poise::execute_modal::<_, _, BanModal>(ctx, None, Some(MODAL_TIMEOUT)).await?
    else {
        return Ok(());
    };

    let Some(planned) = plan_sanction(
        &submission.duration,
        "unban",
        |duration_seconds| PlannedAction::Ban { duration_seconds },
        PlannedAction::Unban,
    ) else {
        reply_failure(ctx.into(), INVALID_DURATION).await?;
        return Ok(());
    };

    execute_planned(
        ctx.into(),
        guild_id,
        &target,
        reason_or_default(submission.reason.as_deref()),
        planned,
    )
    .await
}

#[poise::command(
    context_menu_command = "Kick",
    guild_only,
    category = "Moderation",
    default_member_permissions = "KICK_MEMBERS"
)]
pub async fn kick_message_author(
    ctx: ApplicationContext<'_>,
    #[description = "Message whose author to kick"] message: serenity::Message,
) -> Result<(), Error> {
    let target = message.author;
    let Some(guild_id) = guarded_guild(ctx.into(), ModAction::Kick, &target).await? else {
        return Ok(());
    };

    let Some(submission) = poise::execute_modal::<_, _, KickModal>(ctx, None, Some(MODAL_TIMEOUT)).await?
    else {
        return Ok(());
    };

    execute_planned(
        ctx.into(),
        guild_id,
        &target,
        reason_or_default(submission.reason.as_deref()),
        PlannedAction::Kick,
    )
    .await
}

#[poise::command(
    context_menu_command = "Warn",
    guild_only,
    category = "Moderation",
    default_member_permissions = "MODERATE_MEMBERS"
)]
pub async fn warn_message_author(
    ctx: ApplicationContext<'_>,
    #[description = "Message whose author to warn"] message: serenity::Message,
) -> Result<(), Error> {
    let target = message.author;
    let Some(guild_id) = guarded_guild(ctx.into(), ModAction::Warn, &target).await? else {
        return Ok(());
    };

    let Some(submission) = poise::execute_modal::<_, _, WarnModal>(ctx, None, Some(MODAL_TIMEOUT)).await?
    else {
        return Ok(());
    };

    execute_planned(
        ctx.into(),
        guild_id,
        &target,
        reason_or_default(submission.reason.as_deref()),
        PlannedAction::Warn,
    )
    .await
}

#[poise::command(
    context_menu_command = "Mute",
    guild_only,
    category = "Moderation",
    default_member_permissions = "MODERATE_MEMBERS"
)]
pub async fn mute_user(
    ctx: ApplicationContext<'_>,
    #[description = "User to mute"] user: serenity::User,
) -> Result<(), Error> {
    let Some(guild_id) = guarded_guild(ctx.into(), ModAction::Mute, &user).await? else {
        return Ok(());
    };

    let Some(submission) = poise::execute_modal::<_, _, MuteModal>(ctx, None, Some(MODAL_TIMEOUT)).await?
    else {
        return Ok(());
    };

    let Some(planned) = plan_sanction(
        &submission.duration,
        "unmute",
        |duration_seconds| PlannedAction::Mute { duration_seconds },
        PlannedAction::Unmute,
    ) else {
        reply_failure(ctx.into(), INVALID_DURATION).await?;
        return Ok(());
    };

    execute_planned(
        ctx.into(),
        guild_id,
        &user,
        reason_or_default(submission.reason.as_deref()),
        planned,
    )
    .await
}

#[cfg(test)]
mod tests {
    use super::plan_sanction;
    use crate::moderation::dispatch::PlannedAction;

    fn plan_ban(raw: &str) -> Option<PlannedAction> {
        plan_sanction(
            raw,
            "unban",
            |duration_seconds| PlannedAction::Ban { duration_seconds },
            PlannedAction::Unban,
        )
    }

    #[test]
    fn sentinel_switches_to_revocation() {
        assert_eq!(plan_ban("Unban"), Some(PlannedAction::Unban));
        assert_eq!(plan_ban(" UNBAN "), Some(PlannedAction::Unban));
    }

    #[test]
    fn durations_apply_and_garbage_is_rejected() {
        assert_eq!(
            plan_ban("1d"),
            Some(PlannedAction::Ban {
                duration_seconds: 86_400
            })
        );
        assert_eq!(
            plan_ban("Permanent"),
            Some(PlannedAction::Ban {
                duration_seconds: -1
            })
        );
        assert_eq!(plan_ban("soon"), None);
    }
}
