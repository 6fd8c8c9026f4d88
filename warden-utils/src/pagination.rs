use std::time::Duration;

use poise::serenity_prelude as serenity;
use tracing::warn;

use crate::embed::build_paginated_embed;

pub const PAGINATION_TIMEOUT_SECS: u64 = 60 * 3;

/// Group `entries` into pages of at most `per_page` entries, each page joined
/// with blank lines.
pub fn chunk_pages(entries: &[String], per_page: usize) -> Vec<String> {
    entries
        .chunks(per_page.max(1))
        .map(|chunk| chunk.join("\n\n"))
        .collect()
}

fn page_buttons(
    prev_id: &str,
    next_id: &str,
    current_page: usize,
    total_pages: usize,
    disabled: bool,
) -> Vec<serenity::CreateActionRow> {
    vec![serenity::CreateActionRow::Buttons(vec![
        serenity::CreateButton::new(prev_id)
            .label("Back")
            .disabled(disabled || current_page == 0)
            .style(serenity::ButtonStyle::Secondary),
        serenity::CreateButton::new(next_id)
            .label("Forward")
            .disabled(disabled || current_page + 1 >= total_pages)
            .style(serenity::ButtonStyle::Secondary),
    ])]
}

/// Reply with `pages` and let the invoking user page through them with
/// Back/Forward buttons until the collector times out.
pub async fn paginate_pages<U, E>(
    ctx: poise::Context<'_, U, E>,
    title: &str,
    pages: &[String],
) -> Result<(), serenity::Error>
where
    U: Send + Sync,
    E: Send + Sync,
{
    let Some(first_page) = pages.first() else {
        return Ok(());
    };

    let total_pages = pages.len();
    if total_pages == 1 {
        ctx.send(
            poise::CreateReply::default()
                .embed(build_paginated_embed(title, first_page.clone(), 1, 1)),
        )
        .await?;
        return Ok(());
    }

    let ctx_id = ctx.id();
    let prev_id = format!("{ctx_id}_page_back");
    let next_id = format!("{ctx_id}_page_forward");
    let mut current_page = 0_usize;

    let reply = ctx
        .send(
            poise::CreateReply::default()
                .embed(build_paginated_embed(title, first_page.clone(), 1, total_pages))
                .components(page_buttons(&prev_id, &next_id, current_page, total_pages, false)),
        )
        .await?;

    let message = reply.message().await?;
    let message_id = message.id;
    let channel_id = message.channel_id;

    while let Some(press) = serenity::collector::ComponentInteractionCollector::new(ctx)
        .filter({
            let prefix = format!("{ctx_id}_page_");
            let author_id = ctx.author().id;
            move |interaction| {
                interaction.data.custom_id.starts_with(&prefix)
                    && interaction.user.id == author_id
                    && interaction.message.id == message_id
            }
        })
        .timeout(Duration::from_secs(PAGINATION_TIMEOUT_SECS))
        .await
    {
        if press.data.custom_id == next_id {
            current_page = (current_page + 1).min(total_pages - 1);
        } else {
            current_page = current_page.saturating_sub(1);
        }

        press
            .create_response(
                ctx.http(),
                serenity::CreateInteractionResponse::UpdateMessage(
                    serenity::CreateInteractionResponseMessage::new()
                        .embed(build_paginated_embed(
                            title,
                            pages[current_page].clone(),
                            current_page + 1,
                            total_pages,
                        ))
                        .components(page_buttons(&prev_id, &next_id, current_page, total_pages, false)),
                ),
            )
            .await?;
    }

    if let Err(source) = channel_id
        .edit_message(
            ctx.http(),
            message_id,
            serenity::EditMessage::new()
                .embed(build_paginated_embed(
                    title,
                    pages[current_page].clone(),
                    current_page + 1,
                    total_pages,
                ))
                .components(page_buttons(&prev_id, &next_id, current_page, total_pages, true)),
        )
        .await
    {
        warn!(?source, "failed to disable pagination buttons");
    }

    Ok(())
}
