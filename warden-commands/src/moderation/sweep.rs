use poise::serenity_prelude as serenity;
use tracing::{info, warn};

use warden_core::GuildConfig;
use warden_database::Database;
use warden_database::impls::sanctions::{deactivate_sanction, find_active_sanction, list_active_sanctions};
use warden_database::model::sanctions::{Sanction, SanctionKind};
use warden_utils::time::millis_to_unix_secs;

use crate::moderation::actions::{
    ActionRequest, MAX_TIMEOUT_SECONDS, execute_unban, execute_unmute,
};
use crate::moderation::gateway::ModerationGateway;

const EXPIRED_REASON: &str = "Auto - Expired";
const REFRESH_REASON: &str = "Auto - Mute";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub bans_lifted: usize,
    pub mutes_lifted: usize,
    /// Expired mutes of members who already left; only deactivated.
    pub mutes_deactivated: usize,
    /// Expired rows of users still under another active sanction of the
    /// same kind; only deactivated.
    pub superseded: usize,
    pub timeouts_refreshed: usize,
    pub failures: usize,
}

/// Lift expired bans and mutes, and keep platform timeouts of running mutes
/// topped up.
pub async fn run_expiry_sweep(
    db: &Database,
    gateway: &dyn ModerationGateway,
    config: &GuildConfig,
    now_ms: i64,
) -> SweepReport {
    let mut report = SweepReport::default();

    match list_active_sanctions(db, SanctionKind::Ban).await {
        Ok(bans) => {
            for ban in bans.iter().filter(|ban| ban.is_expired(now_ms)) {
                if let Err(source) = lift_ban(db, gateway, config, ban, now_ms, &mut report).await {
                    warn!(?source, ban_id = %ban.id, "failed to lift expired ban");
                    report.failures += 1;
                }
            }
        }
        Err(source) => {
            warn!(?source, "failed to list active bans");
            report.failures += 1;
        }
    }

    let mutes = match list_active_sanctions(db, SanctionKind::Mute).await {
        Ok(mutes) => mutes,
        Err(source) => {
            warn!(?source, "failed to list active mutes");
            report.failures += 1;
            return report;
        }
    };

    for mute in &mutes {
        let result = if mute.is_expired(now_ms) {
            lift_mute(db, gateway, config, mute, now_ms, &mut report).await
        } else {
            refresh_timeout(gateway, mute, now_ms, &mut report).await
        };

        if let Err(source) = result {
            warn!(?source, mute_id = %mute.id, "failed to sweep mute");
            report.failures += 1;
        }
    }

    if report != SweepReport::default() {
        info!(?report, "expiry sweep finished");
    }

    report
}

/// Deactivate `expired` and report whether the user is still under another
/// active sanction of the same kind, in which case nothing may be lifted.
async fn retire_expired(db: &Database, expired: &Sanction) -> anyhow::Result<Option<bool>> {
    if !deactivate_sanction(db, expired.kind, &expired.id).await? {
        return Ok(None);
    }

    let remaining = find_active_sanction(db, expired.kind, expired.user_id).await?;
    Ok(Some(remaining.is_some()))
}

async fn lift_ban(
    db: &Database,
    gateway: &dyn ModerationGateway,
    config: &GuildConfig,
    ban: &Sanction,
    now_ms: i64,
    report: &mut SweepReport,
) -> anyhow::Result<()> {
    match retire_expired(db, ban).await? {
        None => return Ok(()),
        Some(true) => {
            report.superseded += 1;
            return Ok(());
        }
        Some(false) => {}
    }

    let target = gateway.resolve_user(ban.user_id).await;
    execute_unban(
        db,
        gateway,
        config,
        &ActionRequest {
            target: &target,
            moderator_id: gateway.bot_user_id(),
            reason: EXPIRED_REASON,
            now_ms,
        },
    )
    .await;
    report.bans_lifted += 1;

    Ok(())
}

async fn lift_mute(
    db: &Database,
    gateway: &dyn ModerationGateway,
    config: &GuildConfig,
    mute: &Sanction,
    now_ms: i64,
    report: &mut SweepReport,
) -> anyhow::Result<()> {
    match retire_expired(db, mute).await? {
        None => return Ok(()),
        Some(true) => {
            report.superseded += 1;
            return Ok(());
        }
        Some(false) => {}
    }

    let present = gateway
        .member_state(mute.user_id, serenity::Permissions::MODERATE_MEMBERS)
        .await?
        .is_some();
    if !present {
        report.mutes_deactivated += 1;
        return Ok(());
    }

    let target = gateway.resolve_user(mute.user_id).await;
    execute_unmute(
        db,
        gateway,
        config,
        &ActionRequest {
            target: &target,
            moderator_id: gateway.bot_user_id(),
            reason: EXPIRED_REASON,
            now_ms,
        },
    )
    .await;
    report.mutes_lifted += 1;

    Ok(())
}

async fn refresh_timeout(
    gateway: &dyn ModerationGateway,
    mute: &Sanction,
    now_ms: i64,
    report: &mut SweepReport,
) -> anyhow::Result<()> {
    // Permanent mutes rely on the role alone.
    if mute.permanent {
        return Ok(());
    }

    let Some(state) = gateway
        .member_state(mute.user_id, serenity::Permissions::MODERATE_MEMBERS)
        .await?
    else {
        return Ok(());
    };

    if state.timed_out || !state.operable {
        return Ok(());
    }

    let remaining_secs = millis_to_unix_secs(mute.remaining_ms(now_ms));
    if remaining_secs <= 0 {
        return Ok(());
    }

    let until = millis_to_unix_secs(now_ms) + remaining_secs.min(MAX_TIMEOUT_SECONDS);
    gateway
        .set_timeout(mute.user_id, Some(until), REFRESH_REASON)
        .await?;
    report.timeouts_refreshed += 1;

    Ok(())
}

/// Give a rejoining member their muted role back when a mute is still
/// active. Returns whether the role was applied.
pub async fn reapply_mute_role(
    db: &Database,
    gateway: &dyn ModerationGateway,
    config: &GuildConfig,
    user_id: u64,
) -> anyhow::Result<bool> {
    let Some(role_id) = config.muted_role else {
        return Ok(false);
    };

    if find_active_sanction(db, SanctionKind::Mute, user_id)
        .await?
        .is_none()
    {
        return Ok(false);
    }

    gateway.add_role(user_id, role_id, REFRESH_REASON).await
}

#[cfg(test)]
mod tests {
    use warden_core::GuildConfig;
    use warden_database::Database;
    use warden_database::impls::cases::list_cases_for_user;
    use warden_database::impls::sanctions::{NewSanction, insert_sanction, list_active_sanctions};
    use warden_database::model::cases::CaseKind;
    use warden_database::model::sanctions::SanctionKind;
    use warden_utils::duration::PERMANENT;

    use super::{SweepReport, reapply_mute_role, run_expiry_sweep};
    use crate::moderation::actions::MAX_TIMEOUT_SECONDS;
    use crate::moderation::gateway::MemberState;
    use crate::moderation::gateway::testing::{Call, FakeGateway};

    const START: i64 = 1_700_000_000_000;
    const MUTED_ROLE: u64 = 300;

    fn sanction(kind: SanctionKind, user_id: u64, duration_seconds: i64) -> NewSanction<'static> {
        NewSanction {
            kind,
            user_id,
            issuer_id: 2,
            reason: "spam",
            duration_seconds,
            timestamp_ms: START,
        }
    }

    fn present(timed_out: bool) -> MemberState {
        MemberState {
            timed_out,
            operable: true,
        }
    }

    fn config() -> GuildConfig {
        GuildConfig {
            muted_role: Some(MUTED_ROLE),
            ..GuildConfig::default()
        }
    }

    #[tokio::test]
    async fn expired_rows_are_revoked_once_and_permanent_rows_stay() {
        let db = Database::connect_in_memory().await.unwrap();
        let gateway = FakeGateway::new()
            .with_member(20, present(false))
            .with_role(MUTED_ROLE);

        insert_sanction(&db, sanction(SanctionKind::Ban, 10, 60)).await.unwrap();
        insert_sanction(&db, sanction(SanctionKind::Ban, 11, PERMANENT)).await.unwrap();
        insert_sanction(&db, sanction(SanctionKind::Mute, 20, 60)).await.unwrap();
        insert_sanction(&db, sanction(SanctionKind::Mute, 21, 60)).await.unwrap();
        insert_sanction(&db, sanction(SanctionKind::Mute, 22, PERMANENT)).await.unwrap();

        let now = START + 61_000;
        let report = run_expiry_sweep(&db, &gateway, &config(), now).await;

        assert_eq!(
            report,
            SweepReport {
                bans_lifted: 1,
                mutes_lifted: 1,
                mutes_deactivated: 1,
                superseded: 0,
                timeouts_refreshed: 0,
                failures: 0,
            }
        );

        let unbans = gateway
            .calls()
            .into_iter()
            .filter(|call| matches!(call, Call::Unban(_)))
            .count();
        assert_eq!(unbans, 1);
        assert!(gateway.calls().contains(&Call::RemoveRole(20, MUTED_ROLE)));
        assert!(!gateway.calls().contains(&Call::RemoveRole(21, MUTED_ROLE)));

        let bans: Vec<_> = list_active_sanctions(&db, SanctionKind::Ban)
            .await
            .unwrap()
            .into_iter()
            .map(|ban| ban.user_id)
            .collect();
        assert_eq!(bans, vec![11]);
        let mutes: Vec<_> = list_active_sanctions(&db, SanctionKind::Mute)
            .await
            .unwrap()
            .into_iter()
            .map(|mute| mute.user_id)
            .collect();
        assert_eq!(mutes, vec![22]);

        let unban_case = &list_cases_for_user(&db, 10).await.unwrap()[0];
        assert_eq!(unban_case.kind, CaseKind::Unban);
        assert_eq!(unban_case.reason, "Auto - Expired");
        assert_eq!(unban_case.issuer_id, gateway.bot_id);

        let second = run_expiry_sweep(&db, &gateway, &config(), now + 10_000).await;
        assert_eq!(second, SweepReport::default());
    }

    #[tokio::test]
    async fn expired_ban_leaves_a_newer_permanent_ban_in_place() {
        let db = Database::connect_in_memory().await.unwrap();
        let gateway = FakeGateway::new();

        insert_sanction(&db, sanction(SanctionKind::Ban, 10, 60)).await.unwrap();
        let permanent = insert_sanction(&db, sanction(SanctionKind::Ban, 10, PERMANENT))
            .await
            .unwrap();

        let report = run_expiry_sweep(&db, &gateway, &config(), START + 61_000).await;

        assert_eq!(report.bans_lifted, 0);
        assert_eq!(report.superseded, 1);
        assert!(!gateway.calls().iter().any(|call| matches!(call, Call::Unban(_))));

        let active: Vec<_> = list_active_sanctions(&db, SanctionKind::Ban)
            .await
            .unwrap()
            .into_iter()
            .map(|ban| ban.id)
            .collect();
        assert_eq!(active, vec![permanent.id]);
        assert!(list_cases_for_user(&db, 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn expired_mute_leaves_a_longer_mute_in_place() {
        let db = Database::connect_in_memory().await.unwrap();
        let gateway = FakeGateway::new()
            .with_member(20, present(true))
            .with_role(MUTED_ROLE);

        insert_sanction(&db, sanction(SanctionKind::Mute, 20, 60)).await.unwrap();
        let longer = insert_sanction(&db, sanction(SanctionKind::Mute, 20, 3_600))
            .await
            .unwrap();

        let report = run_expiry_sweep(&db, &gateway, &config(), START + 61_000).await;

        assert_eq!(report.mutes_lifted, 0);
        assert_eq!(report.superseded, 1);
        assert!(!gateway.calls().contains(&Call::RemoveRole(20, MUTED_ROLE)));
        assert!(!gateway.calls().contains(&Call::Timeout(20, None)));

        let active: Vec<_> = list_active_sanctions(&db, SanctionKind::Mute)
            .await
            .unwrap()
            .into_iter()
            .map(|mute| mute.id)
            .collect();
        assert_eq!(active, vec![longer.id]);
    }

    #[tokio::test]
    async fn running_mutes_get_their_timeout_refreshed() {
        let db = Database::connect_in_memory().await.unwrap();
        let gateway = FakeGateway::new()
            .with_member(30, present(false))
            .with_member(31, present(true))
            .with_member(32, present(false));

        insert_sanction(&db, sanction(SanctionKind::Mute, 30, 30 * 86_400)).await.unwrap();
        insert_sanction(&db, sanction(SanctionKind::Mute, 31, 3_600)).await.unwrap();
        insert_sanction(&db, sanction(SanctionKind::Mute, 32, PERMANENT)).await.unwrap();

        let report = run_expiry_sweep(&db, &gateway, &config(), START).await;

        assert_eq!(report.timeouts_refreshed, 1);
        assert_eq!(
            gateway.calls(),
            vec![Call::Timeout(30, Some(START / 1000 + MAX_TIMEOUT_SECONDS))]
        );
    }

    #[tokio::test]
    async fn rejoining_member_gets_muted_role_back() {
        let db = Database::connect_in_memory().await.unwrap();
        let gateway = FakeGateway::new().with_role(MUTED_ROLE);

        assert!(!reapply_mute_role(&db, &gateway, &config(), 40).await.unwrap());

        insert_sanction(&db, sanction(SanctionKind::Mute, 40, PERMANENT)).await.unwrap();
        assert!(reapply_mute_role(&db, &gateway, &config(), 40).await.unwrap());
        assert_eq!(gateway.calls(), vec![Call::AddRole(40, MUTED_ROLE)]);

        assert!(
            !reapply_mute_role(&db, &gateway, &GuildConfig::default(), 40)
                .await
                .unwrap()
        );
    }
}
