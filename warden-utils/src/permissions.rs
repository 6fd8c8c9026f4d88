use poise::serenity_prelude as serenity;

/// A member's effective permissions and rank in a guild.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemberStanding {
    pub permissions: serenity::Permissions,
    pub highest_role_position: u16,
    pub is_owner: bool,
}

impl MemberStanding {
    pub fn has(&self, required: serenity::Permissions) -> bool {
        self.is_owner
            || self.permissions.contains(serenity::Permissions::ADMINISTRATOR)
            || self.permissions.contains(required)
    }
}

/// Fold the `@everyone` role and the member's roles, given as
/// `(id, position, permissions)`, into a permission set and the highest role
/// position.
pub fn fold_member_roles(
    guild_id: serenity::GuildId,
    roles: impl IntoIterator<Item = (serenity::RoleId, u16, serenity::Permissions)>,
    member_roles: &[serenity::RoleId],
) -> (serenity::Permissions, u16) {
    let everyone_role_id = serenity::RoleId::new(guild_id.get());

    let mut permissions = serenity::Permissions::empty();
    let mut highest_position = 0_u16;
    for (role_id, position, role_permissions) in roles {
        if role_id == everyone_role_id {
            permissions |= role_permissions;
            continue;
        }

        if member_roles.contains(&role_id) {
            permissions |= role_permissions;
            highest_position = highest_position.max(position);
        }
    }

    (permissions, highest_position)
}

/// Standing of an already fetched member against a fetched guild.
pub fn member_standing(guild: &serenity::PartialGuild, member: &serenity::Member) -> MemberStanding {
    let (permissions, highest_role_position) = fold_member_roles(
        guild.id,
        guild
            .roles
            .values()
            .map(|role| (role.id, role.position, role.permissions)),
        &member.roles,
    );

    MemberStanding {
        permissions,
        highest_role_position,
        is_owner: guild.owner_id == member.user.id,
    }
}

/// Resolve a user's standing in `guild_id` from the REST API.
pub async fn resolve_member_standing(
    http: &serenity::Http,
    guild_id: serenity::GuildId,
    user_id: serenity::UserId,
) -> anyhow::Result<MemberStanding> {
    let guild = guild_id.to_partial_guild(http).await?;
    let member = guild_id.member(http, user_id).await?;

    Ok(member_standing(&guild, &member))
}

pub async fn has_user_permission(
    http: &serenity::Http,
    guild_id: serenity::GuildId,
    user_id: serenity::UserId,
    required: serenity::Permissions,
) -> anyhow::Result<bool> {
    let standing = resolve_member_standing(http, guild_id, user_id).await?;

    Ok(standing.has(required))
}

#[cfg(test)]
mod tests {
    use poise::serenity_prelude as serenity;

    use super::{MemberStanding, fold_member_roles};

    fn role(
        id: u64,
        position: u16,
        permissions: serenity::Permissions,
    ) -> (serenity::RoleId, u16, serenity::Permissions) {
        (serenity::RoleId::new(id), position, permissions)
    }

    #[test]
    fn everyone_and_member_roles_are_combined() {
        let guild_id = serenity::GuildId::new(1);
        let roles = [
            role(1, 0, serenity::Permissions::SEND_MESSAGES),
            role(10, 3, serenity::Permissions::KICK_MEMBERS),
            role(11, 7, serenity::Permissions::BAN_MEMBERS),
            role(12, 9, serenity::Permissions::ADMINISTRATOR),
        ];

        let (permissions, position) = fold_member_roles(
            guild_id,
            roles,
            &[serenity::RoleId::new(10), serenity::RoleId::new(11)],
        );

        assert!(permissions.contains(serenity::Permissions::SEND_MESSAGES));
        assert!(permissions.contains(serenity::Permissions::KICK_MEMBERS | serenity::Permissions::BAN_MEMBERS));
        assert!(!permissions.contains(serenity::Permissions::ADMINISTRATOR));
        assert_eq!(position, 7);

        let (_, no_roles) = fold_member_roles(guild_id, roles, &[]);
        assert_eq!(no_roles, 0);
    }

    #[test]
    fn owner_and_admin_hold_everything() {
        let owner = MemberStanding {
            permissions: serenity::Permissions::empty(),
            highest_role_position: 0,
            is_owner: true,
        };
        let admin = MemberStanding {
            permissions: serenity::Permissions::ADMINISTRATOR,
            highest_role_position: 0,
            is_owner: false,
        };
        let member = MemberStanding {
            permissions: serenity::Permissions::KICK_MEMBERS,
            highest_role_position: 0,
            is_owner: false,
        };

        assert!(owner.has(serenity::Permissions::MANAGE_GUILD));
        assert!(admin.has(serenity::Permissions::MANAGE_GUILD));
        assert!(member.has(serenity::Permissions::KICK_MEMBERS));
        assert!(!member.has(serenity::Permissions::BAN_MEMBERS));
    }
}
