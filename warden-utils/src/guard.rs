use poise::serenity_prelude as serenity;

/// Moderation actions that go through the hierarchy guard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModAction {
    Ban,
    Unban,
    Kick,
    Mute,
    Unmute,
    Warn,
}

impl ModAction {
    pub fn verb(self) -> &'static str {
        match self {
            Self::Ban => "ban",
            Self::Unban => "unban",
            Self::Kick => "kick",
            Self::Mute => "mute",
            Self::Unmute => "unmute",
            Self::Warn => "warn",
        }
    }

    pub fn past_tense(self) -> &'static str {
        match self {
            Self::Ban => "banned",
            Self::Unban => "unbanned",
            Self::Kick => "kicked",
            Self::Mute => "muted",
            Self::Unmute => "unmuted",
            Self::Warn => "warned",
        }
    }

    /// Capitalised label used in result titles.
    pub fn title(self) -> &'static str {
        match self {
            Self::Ban => "Ban",
            Self::Unban => "Unban",
            Self::Kick => "Kick",
            Self::Mute => "Mute",
            Self::Unmute => "Unmute",
            Self::Warn => "Warn",
        }
    }

    pub fn required_permission(self) -> serenity::Permissions {
        match self {
            Self::Ban | Self::Unban => serenity::Permissions::BAN_MEMBERS,
            Self::Kick => serenity::Permissions::KICK_MEMBERS,
            Self::Mute | Self::Unmute | Self::Warn => serenity::Permissions::MODERATE_MEMBERS,
        }
    }

    fn requires_member(self) -> bool {
        matches!(self, Self::Kick | Self::Mute | Self::Unmute)
    }

    fn checks_hierarchy(self) -> bool {
        !matches!(self, Self::Unban)
    }

    fn checks_operable(self) -> bool {
        !matches!(self, Self::Unban | Self::Warn)
    }
}

/// The target's standing when they are a member of the guild.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TargetMember {
    pub highest_role_position: u16,
    /// Whether the bot can act on this member for the action at hand.
    pub operable: bool,
}

/// Everything the guard needs, resolved ahead of time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuardSnapshot {
    pub actor_id: u64,
    pub target_id: u64,
    pub owner_id: u64,
    pub actor_permissions: serenity::Permissions,
    pub actor_highest_role_position: u16,
    pub target_member: Option<TargetMember>,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum GuardRejection {
    #[error("This user is not in the server.")]
    NotInServer,
    #[error("You cannot {0} yourself.")]
    SelfTarget(&'static str),
    #[error("You do not have permission to perform this action.")]
    MissingPermission,
    #[error("You cannot {0} a user with a higher or equal role.")]
    HigherOrEqualRole(&'static str),
    #[error("You cannot {0} the guild owner.")]
    TargetIsOwner(&'static str),
    #[error("This user cannot be {0}.")]
    NotOperable(&'static str),
}

/// Run the ordered checks for `action`, stopping at the first rejection.
pub fn check(action: ModAction, snapshot: &GuardSnapshot) -> Result<(), GuardRejection> {
    let actor_is_owner = snapshot.actor_id == snapshot.owner_id;

    if action.requires_member() && snapshot.target_member.is_none() {
        return Err(GuardRejection::NotInServer);
    }

    if snapshot.actor_id == snapshot.target_id {
        return Err(GuardRejection::SelfTarget(action.verb()));
    }

    let holds_capability = snapshot
        .actor_permissions
        .contains(serenity::Permissions::ADMINISTRATOR)
        || snapshot
            .actor_permissions
            .contains(action.required_permission());
    if !actor_is_owner && !holds_capability {
        return Err(GuardRejection::MissingPermission);
    }

    if !action.checks_hierarchy() {
        return Ok(());
    }

    if let Some(target) = snapshot.target_member
        && !actor_is_owner
        && snapshot.actor_highest_role_position <= target.highest_role_position
    {
        return Err(GuardRejection::HigherOrEqualRole(action.verb()));
    }

    if snapshot.target_id == snapshot.owner_id {
        return Err(GuardRejection::TargetIsOwner(action.verb()));
    }

    if action.checks_operable()
        && let Some(target) = snapshot.target_member
        && !target.operable
    {
        return Err(GuardRejection::NotOperable(action.past_tense()));
    }

    Ok(())
}

/// Whether the bot can act on a member: it must outrank them, they must not
/// own the guild, and the bot must hold the permission for the action.
pub fn is_operable(
    bot_highest_role_position: u16,
    target_highest_role_position: u16,
    target_is_owner: bool,
    bot_has_permission: bool,
) -> bool {
    !target_is_owner && bot_has_permission && bot_highest_role_position > target_highest_role_position
}

#[cfg(test)]
mod tests {
    use poise::serenity_prelude as serenity;

    use super::{GuardRejection, GuardSnapshot, ModAction, TargetMember, check, is_operable};

    const ACTOR: u64 = 1;
    const TARGET: u64 = 2;
    const OWNER: u64 = 3;

    fn snapshot(permissions: serenity::Permissions, actor_pos: u16, target: Option<TargetMember>) -> GuardSnapshot {
        GuardSnapshot {
            actor_id: ACTOR,
            target_id: TARGET,
            owner_id: OWNER,
            actor_permissions: permissions,
            actor_highest_role_position: actor_pos,
            target_member: target,
        }
    }

    fn member(position: u16, operable: bool) -> Option<TargetMember> {
        Some(TargetMember {
            highest_role_position: position,
            operable,
        })
    }

    #[test]
    fn moderator_above_target_is_accepted() {
        let snap = snapshot(serenity::Permissions::BAN_MEMBERS, 5, member(2, true));
        assert_eq!(check(ModAction::Ban, &snap), Ok(()));
    }

    #[test]
    fn self_target_is_rejected_first() {
        let mut snap = snapshot(serenity::Permissions::empty(), 0, member(0, false));
        snap.target_id = ACTOR;
        assert_eq!(
            check(ModAction::Unban, &snap),
            Err(GuardRejection::SelfTarget("unban"))
        );
        assert_eq!(
            check(ModAction::Ban, &snap).unwrap_err().to_string(),
            "You cannot ban yourself."
        );
    }

    #[test]
    fn missing_capability_is_rejected() {
        let snap = snapshot(serenity::Permissions::KICK_MEMBERS, 9, member(1, true));
        assert_eq!(
            check(ModAction::Ban, &snap),
            Err(GuardRejection::MissingPermission)
        );

        let admin = snapshot(serenity::Permissions::ADMINISTRATOR, 9, member(1, true));
        assert_eq!(check(ModAction::Ban, &admin), Ok(()));
    }

    #[test]
    fn equal_role_is_rejected_unless_owner() {
        let snap = snapshot(serenity::Permissions::MODERATE_MEMBERS, 4, member(4, true));
        assert_eq!(
            check(ModAction::Mute, &snap).unwrap_err().to_string(),
            "You cannot mute a user with a higher or equal role."
        );

        let mut as_owner = snap.clone();
        as_owner.actor_id = OWNER;
        as_owner.actor_permissions = serenity::Permissions::empty();
        assert_eq!(check(ModAction::Mute, &as_owner), Ok(()));
    }

    #[test]
    fn guild_owner_cannot_be_targeted() {
        let mut snap = snapshot(serenity::Permissions::BAN_MEMBERS, 10, None);
        snap.target_id = OWNER;
        assert_eq!(
            check(ModAction::Ban, &snap),
            Err(GuardRejection::TargetIsOwner("ban"))
        );
    }

    #[test]
    fn inoperable_member_is_rejected() {
        let snap = snapshot(serenity::Permissions::KICK_MEMBERS, 10, member(1, false));
        assert_eq!(
            check(ModAction::Kick, &snap).unwrap_err().to_string(),
            "This user cannot be kicked."
        );
        assert_eq!(
            check(ModAction::Warn, &snapshot(serenity::Permissions::MODERATE_MEMBERS, 10, member(1, false))),
            Ok(())
        );
    }

    #[test]
    fn member_only_actions_require_presence() {
        let snap = snapshot(serenity::Permissions::MODERATE_MEMBERS, 10, None);
        assert_eq!(
            check(ModAction::Unmute, &snap),
            Err(GuardRejection::NotInServer)
        );
        assert_eq!(
            check(ModAction::Warn, &snap),
            Ok(())
        );

        let ban = snapshot(serenity::Permissions::BAN_MEMBERS, 0, None);
        assert_eq!(check(ModAction::Ban, &ban), Ok(()));
    }

    #[test]
    fn unban_skips_hierarchy_checks() {
        let mut snap = snapshot(serenity::Permissions::BAN_MEMBERS, 0, None);
        snap.target_id = OWNER;
        assert_eq!(check(ModAction::Unban, &snap), Ok(()));
    }

    #[test]
    fn acceptance_matches_owner_or_capability_and_rank() {
        let perms = [
            serenity::Permissions::empty(),
            serenity::Permissions::BAN_MEMBERS,
        ];
        for actor_perms in perms {
            for actor_pos in 0..4_u16 {
                for target_pos in 0..4_u16 {
                    for actor_id in [ACTOR, OWNER] {
                        let mut snap = snapshot(actor_perms, actor_pos, member(target_pos, true));
                        snap.actor_id = actor_id;

                        let is_owner = actor_id == OWNER;
                        let expected = is_owner
                            || (actor_perms.contains(serenity::Permissions::BAN_MEMBERS)
                                && actor_pos > target_pos);

                        assert_eq!(check(ModAction::Ban, &snap).is_ok(), expected);
                    }
                }
            }
        }
    }

    #[test]
    fn operability_requires_rank_and_permission() {
        assert!(is_operable(5, 4, false, true));
        assert!(!is_operable(4, 4, false, true));
        assert!(!is_operable(9, 1, true, true));
        assert!(!is_operable(9, 1, false, false));
    }
}
