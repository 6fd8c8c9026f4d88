use poise::serenity_prelude as serenity;
use tracing::info;

use warden_core::{Context, Error};
use warden_utils::guard::ModAction;
use warden_utils::time::now_unix_millis;

use crate::moderation::actions::{
    ActionRequest, execute_ban, execute_kick, execute_mute, execute_unban, execute_unmute,
    execute_warn,
};
use crate::moderation::embeds::reply_results;
use crate::moderation::gateway::{SerenityGateway, TargetUser};
use crate::moderation::guard::ensure_allowed;

/// A moderation action with its already validated arguments.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlannedAction {
    Ban { duration_seconds: i64 },
    Unban,
    Kick,
    Mute { duration_seconds: i64 },
    Unmute,
    Warn,
}

impl PlannedAction {
    pub fn mod_action(self) -> ModAction {
        match self {
            Self::Ban { .. } => ModAction::Ban,
            Self::Unban => ModAction::Unban,
            Self::Kick => ModAction::Kick,
            Self::Mute { .. } => ModAction::Mute,
            Self::Unmute => ModAction::Unmute,
            Self::Warn => ModAction::Warn,
        }
    }
}

/// Guard, execute and report a moderation action invoked by `ctx.author()`.
pub async fn perform_action(
    ctx: Context<'_>,
    guild_id: serenity::GuildId,
    target: &serenity::User,
    reason: &str,
    planned: PlannedAction,
) -> Result<(), Error> {
    if !ensure_allowed(ctx, guild_id, planned.mod_action(), target).await? {
        return Ok(());
    }

    execute_planned(ctx, guild_id, target, reason, planned).await
}

/// Execute an action whose guard already passed and reply with its results.
pub async fn execute_planned(
    ctx: Context<'_>,
    guild_id: serenity::GuildId,
    target: &serenity::User,
    reason: &str,
    planned: PlannedAction,
) -> Result<(), Error> {
    let action = planned.mod_action();
    ctx.defer().await?;

    let data = ctx.data();
    let gateway = SerenityGateway::new(ctx.serenity_context(), guild_id);
    let target_user = TargetUser::from_user(target);
    let request = ActionRequest {
        target: &target_user,
        moderator_id: ctx.author().id.get(),
        reason,
        now_ms: now_unix_millis(),
    };

    let steps = match planned {
        PlannedAction::Ban { duration_seconds } => {
            execute_ban(&data.db, &gateway, &data.config, &request, duration_seconds).await
        }
        PlannedAction::Unban => execute_unban(&data.db, &gateway, &data.config, &request).await,
        PlannedAction::Kick => execute_kick(&data.db, &gateway, &data.config, &request).await,
        PlannedAction::Mute { duration_seconds } => {
            execute_mute(&data.db, &gateway, &data.config, &request, duration_seconds).await
        }
        PlannedAction::Unmute => execute_unmute(&data.db, &gateway, &data.config, &request).await,
        PlannedAction::Warn => execute_warn(&data.db, &gateway, &data.config, &request).await,
    };

    info!(
        action = action.verb(),
        target_id = target.id.get(),
        moderator_id = ctx.author().id.get(),
        failed_steps = steps.iter().filter(|step| !step.success).count(),
        "moderation action executed"
    );

    reply_results(ctx, action, &steps).await
}

#[cfg(test)]
mod tests {
    use warden_utils::guard::ModAction;

    use super::PlannedAction;

    #[test]
    fn planned_actions_map_to_guarded_actions() {
        assert_eq!(
            PlannedAction::Ban { duration_seconds: 60 }.mod_action(),
            ModAction::Ban
        );
        assert_eq!(PlannedAction::Unmute.mod_action(), ModAction::Unmute);
        assert_eq!(PlannedAction::Warn.mod_action(), ModAction::Warn);
    }
}
