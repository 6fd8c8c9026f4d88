use poise::serenity_prelude as serenity;
use tracing::warn;

use warden_core::{Context, Error};
use warden_utils::embed::DEFAULT_EMBED_COLOR;

use crate::moderation::embeds::reply_failure;
use crate::utility::ensure_manage_guild;

pub const VERIFICATION_BEGIN_ID: &str = "verification_begin";

pub fn verification_panel() -> serenity::CreateMessage {
    serenity::CreateMessage::new()
        .embed(
            serenity::CreateEmbed::new()
                .title("Verification")
                .description("Click the button below to begin the verification process.")
                .color(DEFAULT_EMBED_COLOR),
        )
        .components(vec![serenity::CreateActionRow::Buttons(vec![
            serenity::CreateButton::new(VERIFICATION_BEGIN_ID)
                .label("Begin verification")
                .style(serenity::ButtonStyle::Primary),
        ])])
}

/// Post the verification panel in this channel.
#[poise::command(
    slash_command,
    guild_only,
    category = "Utility",
    default_member_permissions = "MANAGE_GUILD"
)]
pub async fn verifypanel(ctx: Context<'_>) -> Result<(), Error> {
    if !ensure_manage_guild(ctx).await? {
        return Ok(());
    }

    if let Err(source) = ctx
        .channel_id()
        .send_message(ctx.http(), verification_panel())
        .await
    {
        warn!(?source, channel_id = ctx.channel_id().get(), "failed to post verification panel");
        reply_failure(ctx, "I couldn't post the verification panel in this channel.").await?;
        return Ok(());
    }

    ctx.send(
        poise::CreateReply::default()
            .ephemeral(true)
            .content("Verification panel posted."),
    )
    .await?;
    Ok(())
}
