use futures::future::BoxFuture;
use poise::serenity_prelude as serenity;
use tracing::{debug, info};

use warden_commands::moderation::gateway::is_unknown_member_error;
use warden_core::Data;
use warden_database::impls::reaction_roles::reaction_roles_for_message;
use warden_utils::reaction::{ReactionDecision, evaluate_reaction};

const AUDIT_REASON: &str = "Reaction role";

/// Fetch the reacting member, skipping bots and users who already left.
async fn reacting_member(
    ctx: &serenity::Context,
    reaction: &serenity::Reaction,
) -> anyhow::Result<Option<serenity::Member>> {
    let (Some(guild_id), Some(user_id)) = (reaction.guild_id, reaction.user_id) else {
        return Ok(None);
    };

    let member = match &reaction.member {
        Some(member) => member.clone(),
        None => match guild_id.member(ctx, user_id).await {
            Ok(member) => member,
            Err(source) if is_unknown_member_error(&source) => return Ok(None),
            Err(source) => return Err(source.into()),
        },
    };

    Ok((!member.user.bot).then_some(member))
}

pub fn on_reaction_add<'a>(
    ctx: &'a serenity::Context,
    event: &'a serenity::FullEvent,
    data: &'a Data,
) -> BoxFuture<'a, anyhow::Result<()>> {
    Box::pin(async move {
        let serenity::FullEvent::ReactionAdd { add_reaction } = event else {
            return Ok(());
        };

        let bindings = reaction_roles_for_message(&data.db, add_reaction.message_id.get()).await?;
        if bindings.bindings.is_empty() && bindings.cap.is_none() {
            return Ok(());
        }

        let Some(member) = reacting_member(ctx, add_reaction).await? else {
            return Ok(());
        };

        let emoji = add_reaction.emoji.to_string();
        let held: Vec<u64> = member.roles.iter().map(|role| role.get()).collect();
        let decision = evaluate_reaction(
            bindings.role_for_emoji(&emoji),
            bindings
                .cap
                .as_ref()
                .map(|cap| (cap.roles.as_slice(), cap.max)),
            &held,
        );

        match decision {
            ReactionDecision::Grant(role_id) => {
                ctx.http
                    .add_member_role(
                        member.guild_id,
                        member.user.id,
                        serenity::RoleId::new(role_id),
                        Some(AUDIT_REASON),
                    )
                    .await?;
                info!(user_id = member.user.id.get(), role_id, "reaction role granted");
            }
            ReactionDecision::RemoveReaction => {
                add_reaction.delete(ctx).await?;
                debug!(user_id = member.user.id.get(), "reaction role cap reached");
            }
            ReactionDecision::Ignore => {}
        }

        Ok(())
    })
}

pub fn on_reaction_remove<'a>(
    ctx: &'a serenity::Context,
    event: &'a serenity::FullEvent,
    data: &'a Data,
) -> BoxFuture<'a, anyhow::Result<()>> {
    Box::pin(async move {
        let serenity::FullEvent::ReactionRemove { removed_reaction } = event else {
            return Ok(());
        };

        let bindings =
            reaction_roles_for_message(&data.db, removed_reaction.message_id.get()).await?;
        let Some(role_id) = bindings.role_for_emoji(&removed_reaction.emoji.to_string()) else {
            return Ok(());
        };

        let Some(member) = reacting_member(ctx, removed_reaction).await? else {
            return Ok(());
        };

        ctx.http
            .remove_member_role(
                member.guild_id,
                member.user.id,
                serenity::RoleId::new(role_id),
                Some(AUDIT_REASON),
            )
            .await?;
        info!(user_id = member.user.id.get(), role_id, "reaction role revoked");
        Ok(())
    })
}
