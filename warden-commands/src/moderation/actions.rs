use poise::serenity_prelude as serenity;
use tracing::{error, warn};

use warden_core::GuildConfig;
use warden_database::Database;
use warden_database::impls::sanctions::{NewSanction, deactivate_user_sanctions, insert_sanction};
use warden_database::impls::warns::insert_warn;
use warden_database::model::cases::CaseKind;
use warden_database::model::sanctions::SanctionKind;
use warden_utils::duration::{PERMANENT, SECONDS_PER_DAY, format_duration};
use warden_utils::embed::DEFAULT_EMBED_COLOR;
use warden_utils::formatting::{relative_timestamp, role_mention};
use warden_utils::time::millis_to_unix_secs;

use crate::moderation::gateway::{GuildProfile, ModerationGateway, Notice, TargetUser};
use crate::moderation::logging::{CaseEntry, log_case};

/// Longest timeout applied alongside a mute role.
pub const MAX_TIMEOUT_SECONDS: i64 = 14 * SECONDS_PER_DAY;

const DM_FAILED: &str = "*I couldn't DM the user*";
const DM_SENT: &str = "Sent a DM to the user";
const UNMUTE_DM_COLOR: u32 = 0x00_ff_33;

/// One line of an action's result checklist.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StepOutcome {
    pub success: bool,
    pub message: String,
}

impl StepOutcome {
    pub fn succeeded(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

pub struct ActionRequest<'a> {
    pub target: &'a TargetUser,
    pub moderator_id: u64,
    pub reason: &'a str,
    pub now_ms: i64,
}

fn sanction_message(tag: &str, past_tense: &str, duration_seconds: i64, reason: &str) -> String {
    if duration_seconds == PERMANENT {
        format!("User `{tag}` was {past_tense} permanently with reason {reason}")
    } else {
        format!(
            "User `{tag}` was {past_tense} for `{}` with reason {reason}",
            format_duration(duration_seconds)
        )
    }
}

fn expiry_value(duration_seconds: i64, now_ms: i64) -> String {
    if duration_seconds == PERMANENT {
        "Never".to_owned()
    } else {
        relative_timestamp(millis_to_unix_secs(now_ms) + duration_seconds)
    }
}

fn dm_notice(profile: &GuildProfile, title: String, reason: &str, now_ms: i64) -> Notice {
    Notice {
        title: Some(title),
        author: Some(profile.name.clone()),
        author_icon_url: profile.icon_url.clone(),
        color: DEFAULT_EMBED_COLOR,
        timestamp_ms: Some(now_ms),
        ..Notice::default()
    }
    .field("Reason", reason, true)
}

async fn dm_step(gateway: &dyn ModerationGateway, user_id: u64, notice: &Notice) -> StepOutcome {
    match gateway.send_dm(user_id, notice).await {
        Ok(()) => StepOutcome::succeeded(DM_SENT),
        Err(source) => {
            warn!(?source, user_id, "failed to DM moderation target");
            StepOutcome::failed(DM_FAILED)
        }
    }
}

/// Ban `request.target` for `duration_seconds` (or [`PERMANENT`]).
/// Steps: `[ban, dm]`.
pub async fn execute_ban(
    db: &Database,
    gateway: &dyn ModerationGateway,
    config: &GuildConfig,
    request: &ActionRequest<'_>,
    duration_seconds: i64,
) -> Vec<StepOutcome> {
    let target = request.target;
    let mut step_ban = StepOutcome::failed("Failed to ban the user");

    match insert_sanction(
        db,
        NewSanction {
            kind: SanctionKind::Ban,
            user_id: target.id,
            issuer_id: request.moderator_id,
            reason: request.reason,
            duration_seconds,
            timestamp_ms: request.now_ms,
        },
    )
    .await
    {
        Ok(_) => {
            step_ban = StepOutcome::succeeded(sanction_message(
                &target.tag,
                "banned",
                duration_seconds,
                request.reason,
            ));
        }
        Err(source) => error!(?source, user_id = target.id, "failed to record ban"),
    }

    let profile = gateway.guild_profile().await;
    let notice = dm_notice(
        &profile,
        format!("You have been banned from {}", profile.name),
        request.reason,
        request.now_ms,
    )
    .field("Ban expires", expiry_value(duration_seconds, request.now_ms), true);
    let step_dm = dm_step(gateway, target.id, &notice).await;

    if let Err(message) = platform_ban(gateway, target.id, request.reason).await {
        step_ban = StepOutcome::failed(message);
    }

    log_case(
        db,
        gateway,
        config,
        CaseEntry {
            kind: CaseKind::Ban,
            target,
            moderator_id: request.moderator_id,
            reason: request.reason,
            duration_seconds: Some(duration_seconds),
            now_ms: request.now_ms,
        },
    )
    .await;

    vec![step_ban, step_dm]
}

async fn platform_ban(
    gateway: &dyn ModerationGateway,
    user_id: u64,
    reason: &str,
) -> Result<(), &'static str> {
    match gateway
        .bot_has_permission(serenity::Permissions::BAN_MEMBERS)
        .await
    {
        Ok(true) => {}
        Ok(false) => return Err("I don't have permission to ban users"),
        Err(source) => {
            warn!(?source, "failed to resolve bot permissions");
            return Err("Failed to ban the user");
        }
    }

    // Members must be bannable; anyone else is banned by id.
    match gateway
        .member_state(user_id, serenity::Permissions::BAN_MEMBERS)
        .await
    {
        Ok(Some(state)) if !state.operable => {
            return Err("I don't have permission to ban this user");
        }
        Ok(_) => {}
        Err(source) => warn!(?source, user_id, "failed to resolve ban target membership"),
    }

    gateway.ban(user_id, reason).await.map_err(|source| {
        warn!(?source, user_id, "platform ban failed");
        "Failed to ban the user"
    })
}

/// Lift active bans for `request.target`. Steps: `[unban, dm]`.
pub async fn execute_unban(
    db: &Database,
    gateway: &dyn ModerationGateway,
    config: &GuildConfig,
    request: &ActionRequest<'_>,
) -> Vec<StepOutcome> {
    let target = request.target;
    let mut step_unban = StepOutcome::failed("Failed to create an unban");

    match deactivate_user_sanctions(db, SanctionKind::Ban, target.id).await {
        Ok(_) => {
            step_unban = StepOutcome::succeeded(format!(
                "User `{}` was unbanned with reason {}",
                target.tag, request.reason
            ));
        }
        Err(source) => error!(?source, user_id = target.id, "failed to deactivate bans"),
    }

    let profile = gateway.guild_profile().await;
    let notice = dm_notice(
        &profile,
        format!("You have been unbanned from {}", profile.name),
        request.reason,
        request.now_ms,
    );
    let step_dm = dm_step(gateway, target.id, &notice).await;

    match gateway
        .bot_has_permission(serenity::Permissions::BAN_MEMBERS)
        .await
    {
        Ok(true) => {
            if let Err(source) = gateway.unban(target.id).await {
                warn!(?source, user_id = target.id, "platform unban failed");
            }
        }
        Ok(false) => step_unban = StepOutcome::failed("I don't have permission to unban users"),
        Err(source) => warn!(?source, "failed to resolve bot permissions"),
    }

    log_case(
        db,
        gateway,
        config,
        CaseEntry {
            kind: CaseKind::Unban,
            target,
            moderator_id: request.moderator_id,
            reason: request.reason,
            duration_seconds: None,
            now_ms: request.now_ms,
        },
    )
    .await;

    vec![step_unban, step_dm]
}

/// Steps: `[kick, dm]`. The DM goes out first, while the user still shares
/// the guild.
pub async fn execute_kick(
    db: &Database,
    gateway: &dyn ModerationGateway,
    config: &GuildConfig,
    request: &ActionRequest<'_>,
) -> Vec<StepOutcome> {
    let target = request.target;
    let mut step_kick = StepOutcome::failed("Failed to kick the user");

    let profile = gateway.guild_profile().await;
    let notice = dm_notice(
        &profile,
        format!("You have been kicked from {}", profile.name),
        request.reason,
        request.now_ms,
    );
    let step_dm = dm_step(gateway, target.id, &notice).await;

    match gateway
        .member_state(target.id, serenity::Permissions::KICK_MEMBERS)
        .await
    {
        Ok(Some(state)) if state.operable => match gateway.kick(target.id, request.reason).await {
            Ok(()) => {
                step_kick = StepOutcome::succeeded(format!(
                    "Kicked `{}` with reason {}",
                    target.tag, request.reason
                ));
            }
            Err(source) => warn!(?source, user_id = target.id, "platform kick failed"),
        },
        Ok(_) => {}
        Err(source) => warn!(?source, user_id = target.id, "failed to resolve kick target"),
    }

    log_case(
        db,
        gateway,
        config,
        CaseEntry {
            kind: CaseKind::Kick,
            target,
            moderator_id: request.moderator_id,
            reason: request.reason,
            duration_seconds: None,
            now_ms: request.now_ms,
        },
    )
    .await;

    vec![step_kick, step_dm]
}

/// Steps: `[mute, role, timeout, dm]`.
pub async fn execute_mute(
    db: &Database,
    gateway: &dyn ModerationGateway,
    config: &GuildConfig,
    request: &ActionRequest<'_>,
    duration_seconds: i64,
) -> Vec<StepOutcome> {
    let target = request.target;
    let mut step_mute = StepOutcome::failed("Failed to create a mute");

    match insert_sanction(
        db,
        NewSanction {
            kind: SanctionKind::Mute,
            user_id: target.id,
            issuer_id: request.moderator_id,
            reason: request.reason,
            duration_seconds,
            timestamp_ms: request.now_ms,
        },
    )
    .await
    {
        Ok(_) => {
            step_mute = StepOutcome::succeeded(sanction_message(
                &target.tag,
                "muted",
                duration_seconds,
                request.reason,
            ));
        }
        Err(source) => error!(?source, user_id = target.id, "failed to record mute"),
    }

    let step_role = match config.muted_role {
        Some(role_id) => match gateway.add_role(target.id, role_id, request.reason).await {
            Ok(true) => StepOutcome::succeeded(format!("Added role {} to user", role_mention(role_id))),
            Ok(false) => StepOutcome::failed("Failed to add role: Role not found"),
            Err(source) => {
                warn!(?source, user_id = target.id, "failed to add muted role");
                StepOutcome::failed("Failed to add the muted role")
            }
        },
        None => StepOutcome::failed("Failed to add role: Role not found"),
    };

    let step_timeout = apply_timeout(gateway, target.id, duration_seconds, request).await;

    let profile = gateway.guild_profile().await;
    let notice = dm_notice(
        &profile,
        format!("You have been muted in {}", profile.name),
        request.reason,
        request.now_ms,
    )
    .field("Mute expires", expiry_value(duration_seconds, request.now_ms), true);
    let step_dm = dm_step(gateway, target.id, &notice).await;

    log_case(
        db,
        gateway,
        config,
        CaseEntry {
            kind: CaseKind::Mute,
            target,
            moderator_id: request.moderator_id,
            reason: request.reason,
            duration_seconds: Some(duration_seconds),
            now_ms: request.now_ms,
        },
    )
    .await;

    vec![step_mute, step_role, step_timeout, step_dm]
}

async fn apply_timeout(
    gateway: &dyn ModerationGateway,
    user_id: u64,
    duration_seconds: i64,
    request: &ActionRequest<'_>,
) -> StepOutcome {
    if duration_seconds == PERMANENT {
        return StepOutcome::failed("Failed to add timeout: Mute is permanent");
    }

    let state = match gateway
        .member_state(user_id, serenity::Permissions::MODERATE_MEMBERS)
        .await
    {
        Ok(Some(state)) if state.operable => state,
        Ok(_) => return StepOutcome::failed("Failed to add timeout: User is not moderatable"),
        Err(source) => {
            warn!(?source, user_id, "failed to resolve mute target");
            return StepOutcome::failed("Failed to time the user out");
        }
    };

    let until = millis_to_unix_secs(request.now_ms) + duration_seconds.min(MAX_TIMEOUT_SECONDS);
    match gateway.set_timeout(user_id, Some(until), request.reason).await {
        Ok(()) if state.timed_out => StepOutcome::succeeded("Updated already existing timeout for user"),
        Ok(()) => StepOutcome::succeeded("Added timeout to user"),
        Err(source) => {
            warn!(?source, user_id, "platform timeout failed");
            StepOutcome::failed("Failed to time the user out")
        }
    }
}

/// Steps: `[unmute, role, timeout, dm]`.
pub async fn execute_unmute(
    db: &Database,
    gateway: &dyn ModerationGateway,
    config: &GuildConfig,
    request: &ActionRequest<'_>,
) -> Vec<StepOutcome> {
    let target = request.target;
    let mut step_unmute = StepOutcome::failed("Failed to create an unmute");

    match deactivate_user_sanctions(db, SanctionKind::Mute, target.id).await {
        Ok(_) => {
            step_unmute = StepOutcome::succeeded(format!(
                "User `{}` was unmuted with reason {}",
                target.tag, request.reason
            ));
        }
        Err(source) => error!(?source, user_id = target.id, "failed to deactivate mutes"),
    }

    let step_role = match config.muted_role {
        Some(role_id) => match gateway.remove_role(target.id, role_id, request.reason).await {
            Ok(true) => {
                StepOutcome::succeeded(format!("Removed role {} from user", role_mention(role_id)))
            }
            Ok(false) => StepOutcome::failed("Failed to remove role: Role not found"),
            Err(source) => {
                warn!(?source, user_id = target.id, "failed to remove muted role");
                StepOutcome::failed("Failed to remove the muted role")
            }
        },
        None => StepOutcome::failed("Failed to remove role: Role not found"),
    };

    let step_timeout = match gateway
        .member_state(target.id, serenity::Permissions::MODERATE_MEMBERS)
        .await
    {
        Ok(Some(state)) if state.operable && !state.timed_out => {
            StepOutcome::succeeded("User does not have a timeout")
        }
        Ok(Some(state)) if state.operable => {
            match gateway.set_timeout(target.id, None, request.reason).await {
                Ok(()) => StepOutcome::succeeded("Removed timeout from user"),
                Err(source) => {
                    warn!(?source, user_id = target.id, "failed to clear timeout");
                    StepOutcome::failed("Failed to remove the timeout")
                }
            }
        }
        Ok(_) => StepOutcome::failed("Failed to remove timeout: User is not moderatable"),
        Err(source) => {
            warn!(?source, user_id = target.id, "failed to resolve unmute target");
            StepOutcome::failed("Failed to remove the timeout")
        }
    };

    let profile = gateway.guild_profile().await;
    let notice = Notice {
        color: UNMUTE_DM_COLOR,
        ..dm_notice(
            &profile,
            format!("You have been unmuted in {}", profile.name),
            request.reason,
            request.now_ms,
        )
    };
    let step_dm = dm_step(gateway, target.id, &notice).await;

    log_case(
        db,
        gateway,
        config,
        CaseEntry {
            kind: CaseKind::Unmute,
            target,
            moderator_id: request.moderator_id,
            reason: request.reason,
            duration_seconds: None,
            now_ms: request.now_ms,
        },
    )
    .await;

    vec![step_unmute, step_role, step_timeout, step_dm]
}

/// Steps: `[warn, dm]`.
pub async fn execute_warn(
    db: &Database,
    gateway: &dyn ModerationGateway,
    config: &GuildConfig,
    request: &ActionRequest<'_>,
) -> Vec<StepOutcome> {
    let target = request.target;

    let step_warn = match insert_warn(
        db,
        target.id,
        request.moderator_id,
        request.reason,
        request.now_ms,
    )
    .await
    {
        Ok(_) => StepOutcome::succeeded(format!(
            "Warning added for `{}` with reason {}",
            target.tag, request.reason
        )),
        Err(source) => {
            error!(?source, user_id = target.id, "failed to record warning");
            StepOutcome::failed("Failed to add a warning")
        }
    };

    let profile = gateway.guild_profile().await;
    let notice = dm_notice(
        &profile,
        format!("You have been warned in {}", profile.name),
        request.reason,
        request.now_ms,
    );
    let step_dm = dm_step(gateway, target.id, &notice).await;

    log_case(
        db,
        gateway,
        config,
        CaseEntry {
            kind: CaseKind::Warn,
            target,
            moderator_id: request.moderator_id,
            reason: request.reason,
            duration_seconds: None,
            now_ms: request.now_ms,
        },
    )
    .await;

    vec![step_warn, step_dm]
}
