use tracing::{error, warn};

use warden_core::GuildConfig;
use warden_database::Database;
use warden_database::impls::cases::{NewCase, create_case, set_case_link};
use warden_database::model::cases::{Case, CaseKind};
use warden_utils::duration::{PERMANENT, format_duration};
use warden_utils::formatting::{case_heading, relative_timestamp, user_mention};
use warden_utils::parse::parse_message_link;
use warden_utils::time::millis_to_unix_secs;

use crate::moderation::gateway::{ModerationGateway, Notice, TargetUser};

pub struct CaseEntry<'a> {
    pub kind: CaseKind,
    pub target: &'a TargetUser,
    pub moderator_id: u64,
    pub reason: &'a str,
    pub duration_seconds: Option<i64>,
    pub now_ms: i64,
}

pub fn case_color(kind: CaseKind) -> u32 {
    match kind {
        CaseKind::Ban | CaseKind::Mute => 0xf4_3f_5e,
        CaseKind::Kick => 0xef_44_44,
        CaseKind::Unban | CaseKind::Unmute => 0x0d_94_88,
        CaseKind::Warn => 0xea_b3_08,
    }
}

/// Audit embed posted to the modlog channel for `case`.
pub fn case_log_notice(case: &Case, target: &TargetUser, now_ms: i64) -> Notice {
    let mut notice = Notice {
        author: Some(case_heading(
            case.case_number,
            case.kind.display_name(),
            &target.tag,
        )),
        author_icon_url: target.avatar_url.clone(),
        footer: Some(format!("Case ID: {}", case.case_id)),
        color: case_color(case.kind),
        timestamp_ms: Some(now_ms),
        ..Notice::default()
    }
    .field("User", user_mention(case.user_id), true)
    .field("Moderator", user_mention(case.issuer_id), true);

    if let Some(duration) = case.duration_seconds.filter(|duration| *duration != 0) {
        let expires = if duration == PERMANENT {
            "Never".to_owned()
        } else {
            relative_timestamp(millis_to_unix_secs(now_ms) + duration)
        };

        notice = notice
            .field("Length", format_duration(duration), true)
            .field("Expires", expires, true);
    }

    notice.field("Reason", &case.reason, false)
}

/// Record a case, publish it to the modlog channel and back-fill its link.
/// Publishing is best effort.
pub async fn log_case(
    db: &Database,
    gateway: &dyn ModerationGateway,
    config: &GuildConfig,
    entry: CaseEntry<'_>,
) -> Option<Case> {
    let case = match create_case(
        db,
        NewCase {
            user_id: entry.target.id,
            issuer_id: entry.moderator_id,
            kind: entry.kind,
            reason: entry.reason,
            duration_seconds: entry.duration_seconds,
            timestamp_ms: entry.now_ms,
        },
    )
    .await
    {
        Ok(case) => case,
        Err(source) => {
            error!(?source, kind = entry.kind.as_str(), "failed to create moderation case");
            return None;
        }
    };

    let Some(channel_id) = config.modlog_channel else {
        return Some(case);
    };

    let notice = case_log_notice(&case, entry.target, entry.now_ms);
    let link = match gateway.post_log(channel_id, &notice).await {
        Ok(link) => link,
        Err(source) => {
            warn!(?source, case_number = case.case_number, "failed to publish case to modlog channel");
            return Some(case);
        }
    };

    if let Err(source) = set_case_link(db, &case.case_id, &link).await {
        warn!(?source, case_number = case.case_number, "failed to store case link");
        return Some(case);
    }

    Some(Case {
        link: Some(link),
        ..case
    })
}

/// Re-render the published audit embed of `case`, e.g. after its reason
/// changed. Returns `false` when the case was never published.
pub async fn republish_case(gateway: &dyn ModerationGateway, case: &Case) -> anyhow::Result<bool> {
    let Some(link) = case.link.as_deref().and_then(parse_message_link) else {
        return Ok(false);
    };

    let target = gateway.resolve_user(case.user_id).await;
    let notice = case_log_notice(case, &target, case.timestamp_ms);
    gateway
        .edit_log(link.channel_id, link.message_id, &notice)
        .await?;

    Ok(true)
}

#[cfg(test)]
mod tests {
    use warden_core::GuildConfig;
    use warden_database::Database;
    use warden_database::impls::cases::{find_case, update_case_reason};
    use warden_database::model::cases::CaseKind;

    use super::{CaseEntry, case_color, log_case, republish_case};
    use crate::moderation::gateway::TargetUser;
    use crate::moderation::gateway::testing::{Call, FakeGateway};

    const NOW: i64 = 1_700_000_000_000;

    fn target() -> TargetUser {
        TargetUser {
            id: 7,
            tag: "someone".to_owned(),
            avatar_url: None,
        }
    }

    #[tokio::test]
    async fn posted_case_gets_its_link_back_filled() {
        let db = Database::connect_in_memory().await.unwrap();
        let gateway = FakeGateway::new();
        let config = GuildConfig {
            modlog_channel: Some(55),
            ..GuildConfig::default()
        };
        let target = target();

        let case = log_case(
            &db,
            &gateway,
            &config,
            CaseEntry {
                kind: CaseKind::Mute,
                target: &target,
                moderator_id: 2,
                reason: "spam",
                duration_seconds: Some(3600),
                now_ms: NOW,
            },
        )
        .await
        .unwrap();

        assert_eq!(gateway.calls(), vec![Call::Log(55)]);
        let stored = find_case(&db, &case.case_id).await.unwrap().unwrap();
        assert_eq!(stored.link.as_deref(), Some("https://discord.com/channels/1/55/42"));

        let notice = &gateway.notices()[0];
        assert_eq!(notice.author.as_deref(), Some("Case #1 || Mute || someone"));
        assert_eq!(notice.footer, Some(format!("Case ID: {}", case.case_id)));
        let names: Vec<_> = notice.fields.iter().map(|field| field.name.as_str()).collect();
        assert_eq!(names, ["User", "Moderator", "Length", "Expires", "Reason"]);
        assert_eq!(notice.fields[2].value, "1 hour");
        assert_eq!(notice.fields[3].value, "<t:1700003600:R>");
    }

    #[tokio::test]
    async fn case_without_modlog_channel_is_still_recorded() {
        let db = Database::connect_in_memory().await.unwrap();
        let gateway = FakeGateway::new();
        let target = target();

        let case = log_case(
            &db,
            &gateway,
            &GuildConfig::default(),
            CaseEntry {
                kind: CaseKind::Warn,
                target: &target,
                moderator_id: 2,
                reason: "rude",
                duration_seconds: None,
                now_ms: NOW,
            },
        )
        .await
        .unwrap();

        assert!(gateway.calls().is_empty());
        assert_eq!(case.case_number, 1);
        assert!(case.link.is_none());
    }

    #[tokio::test]
    async fn edited_reason_is_written_back_to_the_log_message() {
        let db = Database::connect_in_memory().await.unwrap();
        let gateway = FakeGateway::new();
        let config = GuildConfig {
            modlog_channel: Some(55),
            ..GuildConfig::default()
        };
        let target = target();

        let case = log_case(
            &db,
            &gateway,
            &config,
            CaseEntry {
                kind: CaseKind::Warn,
                target: &target,
                moderator_id: 2,
                reason: "rude",
                duration_seconds: None,
                now_ms: NOW,
            },
        )
        .await
        .unwrap();

        let updated = update_case_reason(&db, &case.case_id, "spamming invites")
            .await
            .unwrap()
            .unwrap();
        assert!(republish_case(&gateway, &updated).await.unwrap());

        assert_eq!(gateway.calls(), vec![Call::Log(55), Call::EditLog(55, 42)]);
        let edited = gateway.notices().pop().unwrap();
        assert_eq!(edited.author.as_deref(), Some("Case #1 || Warn || user7"));
        assert_eq!(edited.fields.last().unwrap().value, "spamming invites");
    }

    #[tokio::test]
    async fn unpublished_case_has_nothing_to_edit() {
        let db = Database::connect_in_memory().await.unwrap();
        let gateway = FakeGateway::new();
        let target = target();

        let case = log_case(
            &db,
            &gateway,
            &GuildConfig::default(),
            CaseEntry {
                kind: CaseKind::Kick,
                target: &target,
                moderator_id: 2,
                reason: "rude",
                duration_seconds: None,
                now_ms: NOW,
            },
        )
        .await
        .unwrap();

        assert!(!republish_case(&gateway, &case).await.unwrap());
        assert!(gateway.calls().is_empty());
    }

    #[test]
    fn colors_follow_the_kind() {
        assert_eq!(case_color(CaseKind::Ban), case_color(CaseKind::Mute));
        assert_eq!(case_color(CaseKind::Unban), 0x0d9488);
        assert_eq!(case_color(CaseKind::Warn), 0xeab308);
    }
}
