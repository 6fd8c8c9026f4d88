use poise::serenity_prelude as serenity;

use warden_core::{Context, Error};
use warden_utils::guard::{GuardSnapshot, ModAction, TargetMember, check, is_operable};
use warden_utils::permissions::member_standing;

use crate::moderation::embeds::reply_failure;
use crate::moderation::gateway::is_unknown_member_error;

/// Fetch the guild, actor, bot and (if present) target member and fold them
/// into a [`GuardSnapshot`].
pub async fn resolve_snapshot(
    ctx: &serenity::Context,
    guild_id: serenity::GuildId,
    actor_id: serenity::UserId,
    target_id: serenity::UserId,
    action: ModAction,
) -> anyhow::Result<GuardSnapshot> {
    let guild = guild_id.to_partial_guild(&ctx.http).await?;
    let actor = guild_id.member(&ctx.http, actor_id).await?;
    let bot_id = ctx.cache.current_user().id;
    let bot = guild_id.member(&ctx.http, bot_id).await?;

    let actor_standing = member_standing(&guild, &actor);
    let bot_standing = member_standing(&guild, &bot);

    let target_member = match guild_id.member(&ctx.http, target_id).await {
        Ok(member) => {
            let standing = member_standing(&guild, &member);
            Some(TargetMember {
                highest_role_position: standing.highest_role_position,
                operable: is_operable(
                    bot_standing.highest_role_position,
                    standing.highest_role_position,
                    standing.is_owner,
                    bot_standing.has(action.required_permission()),
                ),
            })
        }
        Err(source) if is_unknown_member_error(&source) => None,
        Err(source) => return Err(source.into()),
    };

    Ok(GuardSnapshot {
        actor_id: actor_id.get(),
        target_id: target_id.get(),
        owner_id: guild.owner_id.get(),
        actor_permissions: actor_standing.permissions,
        actor_highest_role_position: actor_standing.highest_role_position,
        target_member,
    })
}

/// Run the guard for the invoking user. Replies with the rejection and
/// returns `false` when the action may not proceed.
pub async fn ensure_allowed(
    ctx: Context<'_>,
    guild_id: serenity::GuildId,
    action: ModAction,
    target: &serenity::User,
) -> Result<bool, Error> {
    let snapshot = resolve_snapshot(
        ctx.serenity_context(),
        guild_id,
        ctx.author().id,
        target.id,
        action,
    )
    .await?;

    match check(action, &snapshot) {
        Ok(()) => Ok(true),
        Err(rejection) => {
            reply_failure(ctx, rejection.to_string()).await?;
            Ok(false)
        }
    }
}

#[cfg(test)]
mod tests {
    use poise::serenity_prelude as serenity;
    use warden_utils::guard::ModAction;

    use super::resolve_snapshot;

    fn assert_send<T: Send>(_: T) {}

    #[test]
    fn snapshot_future_can_cross_threads() {
        // Command futures must be Send; this only needs to type-check.
        let _ = |ctx: &serenity::Context| {
            assert_send(resolve_snapshot(
                ctx,
                serenity::GuildId::new(1),
                serenity::UserId::new(2),
                serenity::UserId::new(3),
                ModAction::Ban,
            ));
        };
    }
}
