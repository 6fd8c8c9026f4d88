use std::time::Duration;

use poise::serenity_prelude as serenity;

pub enum ConfirmationResult {
    Confirmed(serenity::ComponentInteraction),
    Cancelled(serenity::ComponentInteraction),
    TimedOut(serenity::Message),
}

/// Post `embed` with Confirm/Cancel buttons in `channel_id` and wait for
/// `user_id` to press one. Works outside of a command, e.g. in DMs.
pub async fn prompt_confirm_cancel(
    ctx: &serenity::Context,
    channel_id: serenity::ChannelId,
    user_id: serenity::UserId,
    embed: serenity::CreateEmbed,
    timeout: Duration,
) -> Result<ConfirmationResult, serenity::Error> {
    let nonce = serenity::Timestamp::now().unix_timestamp();
    let confirm_id = format!("confirm_{}_{}", user_id, nonce);
    let cancel_id = format!("cancel_{}_{}", user_id, nonce);

    let message = channel_id
        .send_message(
            &ctx.http,
            serenity::CreateMessage::new()
                .embed(embed)
                .components(vec![serenity::CreateActionRow::Buttons(vec![
                    serenity::CreateButton::new(&confirm_id)
                        .label("Confirm")
                        .style(serenity::ButtonStyle::Success),
                    serenity::CreateButton::new(&cancel_id)
                        .label("Cancel")
                        .style(serenity::ButtonStyle::Danger),
                ])]),
        )
        .await?;

    let interaction = message
        .await_component_interaction(ctx)
        .author_id(user_id)
        .timeout(timeout)
        .await;

    let Some(interaction) = interaction else {
        return Ok(ConfirmationResult::TimedOut(message));
    };

    if interaction.data.custom_id == cancel_id {
        return Ok(ConfirmationResult::Cancelled(interaction));
    }

    Ok(ConfirmationResult::Confirmed(interaction))
}

/// Replace the prompt with `text` and drop its buttons.
pub async fn settle_prompt(
    http: &serenity::Http,
    interaction: &serenity::ComponentInteraction,
    text: &str,
) -> Result<(), serenity::Error> {
    interaction
        .create_response(
            http,
            serenity::CreateInteractionResponse::UpdateMessage(
                serenity::CreateInteractionResponseMessage::new()
                    .content(text)
                    .embeds(vec![])
                    .components(vec![]),
            ),
        )
        .await
}
