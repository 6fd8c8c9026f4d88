use futures::future::BoxFuture;
use poise::serenity_prelude as serenity;
use serde_json::Value;
use tracing::{info, warn};

use warden_commands::moderation::gateway::SerenityGateway;
use warden_commands::moderation::sweep::reapply_mute_role;
use warden_core::Data;
use warden_utils::payload::MessagePayload;
use warden_utils::template::{TemplateVars, render_template};

/// Guild name and member count used for placeholder substitution.
pub struct GuildSummary {
    pub name: String,
    pub member_count: u64,
}

pub async fn guild_summary(
    ctx: &serenity::Context,
    guild_id: serenity::GuildId,
) -> anyhow::Result<GuildSummary> {
    let cached = ctx.cache.guild(guild_id).map(|guild| GuildSummary {
        name: guild.name.clone(),
        member_count: guild.member_count,
    });
    if let Some(summary) = cached {
        return Ok(summary);
    }

    let guild = guild_id.to_partial_guild_with_counts(&ctx.http).await?;
    Ok(GuildSummary {
        member_count: guild.approximate_member_count.unwrap_or_default(),
        name: guild.name,
    })
}

/// Render a configured message for `user` and build it.
pub fn render_configured_message(
    template: &Value,
    guild: &GuildSummary,
    user: &serenity::User,
) -> anyhow::Result<serenity::CreateMessage> {
    let vars = TemplateVars {
        server_name: &guild.name,
        username: &user.name,
        user_id: user.id.get(),
        member_count: guild.member_count,
    };

    let payload = MessagePayload::from_value(&render_template(template, &vars))?;
    Ok(payload.to_message())
}

/// Post a configured message about `user` in `channel_id`.
pub async fn send_configured_message(
    ctx: &serenity::Context,
    guild_id: serenity::GuildId,
    channel_id: u64,
    template: &Value,
    user: &serenity::User,
) -> anyhow::Result<()> {
    let guild = guild_summary(ctx, guild_id).await?;
    let message = render_configured_message(template, &guild, user)?;

    serenity::ChannelId::new(channel_id)
        .send_message(&ctx.http, message)
        .await?;
    Ok(())
}

pub fn on_member_join<'a>(
    ctx: &'a serenity::Context,
    event: &'a serenity::FullEvent,
    data: &'a Data,
) -> BoxFuture<'a, anyhow::Result<()>> {
    Box::pin(async move {
        let serenity::FullEvent::GuildMemberAddition { new_member } = event else {
            return Ok(());
        };
        let (Some(template), Some(channel_id)) =
            (&data.config.welcome_message, data.config.welcome_channel)
        else {
            return Ok(());
        };

        send_configured_message(ctx, new_member.guild_id, channel_id, template, &new_member.user)
            .await
    })
}

pub fn on_member_leave<'a>(
    ctx: &'a serenity::Context,
    event: &'a serenity::FullEvent,
    data: &'a Data,
) -> BoxFuture<'a, anyhow::Result<()>> {
    Box::pin(async move {
        let serenity::FullEvent::GuildMemberRemoval { guild_id, user, .. } = event else {
            return Ok(());
        };
        let (Some(template), Some(channel_id)) =
            (&data.config.goodbye_message, data.config.goodbye_channel)
        else {
            return Ok(());
        };

        send_configured_message(ctx, *guild_id, channel_id, template, user).await
    })
}

/// Members rejoining during an active mute get the muted role back.
pub fn on_member_rejoin_muted<'a>(
    ctx: &'a serenity::Context,
    event: &'a serenity::FullEvent,
    data: &'a Data,
) -> BoxFuture<'a, anyhow::Result<()>> {
    Box::pin(async move {
        let serenity::FullEvent::GuildMemberAddition { new_member } = event else {
            return Ok(());
        };

        let gateway = SerenityGateway::new(ctx, new_member.guild_id);
        match reapply_mute_role(&data.db, &gateway, &data.config, new_member.user.id.get()).await {
            Ok(true) => {
                info!(user_id = new_member.user.id.get(), "reapplied muted role on rejoin");
            }
            Ok(false) => {}
            Err(source) => {
                warn!(?source, user_id = new_member.user.id.get(), "failed to reapply muted role");
            }
        }
        Ok(())
    })
}
