use poise::serenity_prelude as serenity;

use warden_core::{Context, Error};
use warden_database::impls::cases::list_cases_for_user;
use warden_database::model::cases::Case;
use warden_utils::duration::format_duration;
use warden_utils::embed::build_paginated_embed;
use warden_utils::formatting::user_mention;
use warden_utils::pagination::{chunk_pages, paginate_pages};
use warden_utils::permissions::has_user_permission;
use warden_utils::time::millis_to_unix_secs;

use crate::moderation::embeds::{GUILD_ONLY, MISSING_PERMISSION, reply_failure};

const CASES_PER_PAGE: usize = 10;

pub(crate) fn case_entry(case: &Case) -> String {
    let unix_secs = millis_to_unix_secs(case.timestamp_ms);
    let mut lines = vec![
        format!("**Case #{} || {}**", case.case_number, case.kind.display_name()),
        case.reason.clone(),
        format!(
            "Moderator: {} • User: {}",
            user_mention(case.issuer_id),
            user_mention(case.user_id)
        ),
    ];

    if let Some(duration) = case.duration_seconds.filter(|duration| *duration != 0) {
        lines.push(format!("Length: {}", format_duration(duration)));
    }

    lines.push(format!("Date: <t:{unix_secs}:F> (<t:{unix_secs}:R>)"));

    if let Some(link) = &case.link {
        lines.push(format!("[Jump]({link})"));
    }

    lines.join("\n")
}

/// List a user's moderation cases, newest first.
#[poise::command(
    slash_command,
    guild_only,
    category = "Moderation",
    default_member_permissions = "MODERATE_MEMBERS"
)]
pub async fn cases(
    ctx: Context<'_>,
    #[description = "The user to get cases for"] user: serenity::User,
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

    ctx.defer().await?;

    let cases = list_cases_for_user(&ctx.data().db, user.id.get()).await?;
    let title = format!("Cases for {}", user.tag());

    if cases.is_empty() {
        ctx.send(
            poise::CreateReply::default()
                .embed(build_paginated_embed(&title, "No cases found.", 1, 1)),
        )
        .await?;
        return Ok(());
    }

    let entries: Vec<String> = cases.iter().map(case_entry).collect();
    let pages = chunk_pages(&entries, CASES_PER_PAGE);

    paginate_pages(ctx, &title, &pages).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use warden_database::model::cases::{Case, CaseKind};

    use super::case_entry;

    #[test]
    fn entry_shows_length_and_jump_link_when_present() {
        let case = Case {
            case_id: "id".to_owned(),
            case_number: 4,
            user_id: 7,
            issuer_id: 2,
            reason: "spam".to_owned(),
            timestamp_ms: 1_700_000_000_000,
            kind: CaseKind::Mute,
            duration_seconds: Some(7_200),
            link: Some("https://discord.com/channels/1/2/3".to_owned()),
        };

        let entry = case_entry(&case);
        assert!(entry.starts_with("**Case #4 || Mute**\nspam\n"));
        assert!(entry.contains("Length: 2 hours"));
        assert!(entry.ends_with("[Jump](https://discord.com/channels/1/2/3)"));

        let warn = Case {
            kind: CaseKind::Warn,
            duration_seconds: None,
            link: None,
            ..case
        };
        assert!(!case_entry(&warn).contains("Length"));
    }
}
