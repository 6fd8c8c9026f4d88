use poise::serenity_prelude as serenity;

use warden_core::{Context, Error};
use warden_utils::embed::{checklist, failure_embed, results_embed, success_embed};
use warden_utils::guard::ModAction;

use crate::moderation::actions::StepOutcome;

pub const GUILD_ONLY: &str = "This command can only be used in a server.";
pub const MISSING_PERMISSION: &str = "You do not have permission to perform this action.";
pub const INVALID_DURATION: &str = "Invalid duration.";
pub const DEFAULT_REASON: &str = "No reason provided";

pub fn reason_or_default(reason: Option<&str>) -> &str {
    reason
        .map(str::trim)
        .filter(|reason| !reason.is_empty())
        .unwrap_or(DEFAULT_REASON)
}

pub async fn reply_failure(ctx: Context<'_>, message: impl AsRef<str>) -> Result<(), Error> {
    ctx.send(
        poise::CreateReply::default()
            .ephemeral(true)
            .embed(failure_embed(message)),
    )
    .await?;
    Ok(())
}

pub async fn reply_success(ctx: Context<'_>, message: impl AsRef<str>) -> Result<(), Error> {
    ctx.send(poise::CreateReply::default().embed(success_embed(message)))
        .await?;
    Ok(())
}

pub fn action_results_embed(action: ModAction, steps: &[StepOutcome]) -> serenity::CreateEmbed {
    results_embed(
        action.title(),
        checklist(steps.iter().map(|step| (step.success, step.message.as_str()))),
    )
}

pub async fn reply_results(
    ctx: Context<'_>,
    action: ModAction,
    steps: &[StepOutcome],
) -> Result<(), Error> {
    ctx.send(poise::CreateReply::default().embed(action_results_embed(action, steps)))
        .await?;
    Ok(())
}
