use anyhow::Context as _;

use crate::cache::{REACTION_ROLE_CACHE_TTL, invalidate_reaction_roles, reaction_roles_key};
use crate::database::Database;
use crate::model::reaction_roles::{MessageReactionRoles, ReactionCap, ReactionRoleBinding};

#[derive(sqlx::FromRow)]
struct BindingRow {
    channel_id: i64,
    message_id: i64,
    emoji: String,
    role_id: i64,
}

#[derive(sqlx::FromRow)]
struct CapRow {
    message_id: i64,
    roles: String,
    max: i64,
}

/// Bind `emoji` on a message to `role_id`. Returns `false` when the emoji is
/// already bound on that message.
pub async fn register_reaction_role(
    db: &Database,
    binding: &ReactionRoleBinding,
) -> anyhow::Result<bool> {
    let channel_id_i64 = i64::try_from(binding.channel_id).context("channel_id out of i64 range")?;
    let message_id_i64 = i64::try_from(binding.message_id).context("message_id out of i64 range")?;
    let role_id_i64 = i64::try_from(binding.role_id).context("role_id out of i64 range")?;

    let result = sqlx::query(
        "INSERT INTO reaction_roles (channel_id, message_id, emoji, role_id)
         VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT (message_id, emoji) DO NOTHING",
    )
    .bind(channel_id_i64)
    .bind(message_id_i64)
    .bind(&binding.emoji)
    .bind(role_id_i64)
    .execute(db.pool())
    .await?;

    let inserted = result.rows_affected() > 0;
    if inserted {
        refresh_cap_roles(db, binding.message_id).await?;
    }
    invalidate_reaction_roles(db.cache(), binding.message_id).await?;

    Ok(inserted)
}

/// Drop the binding of `emoji` to `role_id` on a message.
pub async fn unregister_reaction_role(
    db: &Database,
    message_id: u64,
    emoji: &str,
    role_id: u64,
) -> anyhow::Result<bool> {
    let message_id_i64 = i64::try_from(message_id).context("message_id out of i64 range")?;
    let role_id_i64 = i64::try_from(role_id).context("role_id out of i64 range")?;

    let result = sqlx::query(
        "DELETE FROM reaction_roles WHERE message_id = ?1 AND emoji = ?2 AND role_id = ?3",
    )
    .bind(message_id_i64)
    .bind(emoji)
    .bind(role_id_i64)
    .execute(db.pool())
    .await?;

    let removed = result.rows_affected() > 0;
    if removed {
        refresh_cap_roles(db, message_id).await?;
    }
    invalidate_reaction_roles(db.cache(), message_id).await?;

    Ok(removed)
}

/// Point an existing cap at the roles currently bound on the message.
async fn refresh_cap_roles(db: &Database, message_id: u64) -> anyhow::Result<()> {
    let message_id_i64 = i64::try_from(message_id).context("message_id out of i64 range")?;

    let role_ids: Vec<i64> = sqlx::query_scalar(
        "SELECT DISTINCT role_id FROM reaction_roles WHERE message_id = ?1 ORDER BY role_id",
    )
    .bind(message_id_i64)
    .fetch_all(db.pool())
    .await?;
    let roles = role_ids
        .into_iter()
        .map(|role_id| u64::try_from(role_id).context("role_id row out of u64 range"))
        .collect::<anyhow::Result<Vec<_>>>()?;

    sqlx::query("UPDATE reaction_max SET roles = ?1 WHERE message_id = ?2")
        .bind(join_role_ids(&roles))
        .bind(message_id_i64)
        .execute(db.pool())
        .await?;

    Ok(())
}

pub async fn list_reaction_roles(db: &Database) -> anyhow::Result<Vec<ReactionRoleBinding>> {
    let rows: Vec<BindingRow> = sqlx::query_as(
        "SELECT channel_id, message_id, emoji, role_id FROM reaction_roles
         ORDER BY message_id, emoji",
    )
    .fetch_all(db.pool())
    .await?;

    rows.into_iter().map(to_binding).collect()
}

/// Limit members to `max` of `roles` through reactions on `message_id`.
/// Replaces any previous cap on that message.
pub async fn set_reaction_cap(db: &Database, cap: &ReactionCap) -> anyhow::Result<()> {
    let message_id_i64 = i64::try_from(cap.message_id).context("message_id out of i64 range")?;
    let roles = join_role_ids(&cap.roles);

    sqlx::query(
        "INSERT INTO reaction_max (message_id, roles, max) VALUES (?1, ?2, ?3)
         ON CONFLICT (message_id) DO UPDATE SET roles = excluded.roles, max = excluded.max",
    )
    .bind(message_id_i64)
    .bind(roles)
    .bind(i64::from(cap.max))
    .execute(db.pool())
    .await?;

    invalidate_reaction_roles(db.cache(), cap.message_id).await?;

    Ok(())
}

pub async fn clear_reaction_cap(db: &Database, message_id: u64) -> anyhow::Result<bool> {
    let message_id_i64 = i64::try_from(message_id).context("message_id out of i64 range")?;

    let result = sqlx::query("DELETE FROM reaction_max WHERE message_id = ?1")
        .bind(message_id_i64)
        .execute(db.pool())
        .await?;

    invalidate_reaction_roles(db.cache(), message_id).await?;

    Ok(result.rows_affected() > 0)
}

/// Bindings and cap for one message, served from the cache when available.
pub async fn reaction_roles_for_message(
    db: &Database,
    message_id: u64,
) -> anyhow::Result<MessageReactionRoles> {
    let message_id_i64 = i64::try_from(message_id).context("message_id out of i64 range")?;
    let cache_key = reaction_roles_key(db.cache(), message_id);

    db.cache()
        .get_or_load_json(&cache_key, REACTION_ROLE_CACHE_TTL, || async {
            let rows: Vec<BindingRow> = sqlx::query_as(
                "SELECT channel_id, message_id, emoji, role_id FROM reaction_roles
                 WHERE message_id = ?1",
            )
            .bind(message_id_i64)
            .fetch_all(db.pool())
            .await?;

            let cap_row: Option<CapRow> = sqlx::query_as(
                "SELECT message_id, roles, max FROM reaction_max WHERE message_id = ?1",
            )
            .bind(message_id_i64)
            .fetch_optional(db.pool())
            .await?;

            Ok(MessageReactionRoles {
                bindings: rows
                    .into_iter()
                    .map(to_binding)
                    .collect::<anyhow::Result<Vec<_>>>()?,
                cap: cap_row.map(to_cap).transpose()?,
            })
        })
        .await
}

fn to_binding(row: BindingRow) -> anyhow::Result<ReactionRoleBinding> {
    Ok(ReactionRoleBinding {
        channel_id: u64::try_from(row.channel_id).context("channel_id row out of u64 range")?,
        message_id: u64::try_from(row.message_id).context("message_id row out of u64 range")?,
        emoji: row.emoji,
        role_id: u64::try_from(row.role_id).context("role_id row out of u64 range")?,
    })
}

fn to_cap(row: CapRow) -> anyhow::Result<ReactionCap> {
    Ok(ReactionCap {
        message_id: u64::try_from(row.message_id).context("message_id row out of u64 range")?,
        roles: split_role_ids(&row.roles)?,
        max: u32::try_from(row.max).context("max row out of u32 range")?,
    })
}

/// Cap roles are stored `;`-joined.
fn join_role_ids(roles: &[u64]) -> String {
    roles
        .iter()
        .map(u64::to_string)
        .collect::<Vec<_>>()
        .join(";")
}

fn split_role_ids(raw: &str) -> anyhow::Result<Vec<u64>> {
    raw.split(';')
        .filter(|part| !part.is_empty())
        .map(|part| {
            part.parse::<u64>()
                .with_context(|| format!("invalid cap role id `{part}`"))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{
        clear_reaction_cap, join_role_ids, list_reaction_roles, reaction_roles_for_message,
        register_reaction_role, set_reaction_cap, split_role_ids, unregister_reaction_role,
    };
    use crate::database::Database;
    use crate::model::reaction_roles::{ReactionCap, ReactionRoleBinding};

    fn binding(emoji: &str, role_id: u64) -> ReactionRoleBinding {
        ReactionRoleBinding {
            channel_id: 100,
            message_id: 200,
            emoji: emoji.to_owned(),
            role_id,
        }
    }

    #[tokio::test]
    async fn duplicate_binding_is_rejected() {
        let db = Database::connect_in_memory().await.unwrap();

        assert!(register_reaction_role(&db, &binding("👍", 1)).await.unwrap());
        assert!(!register_reaction_role(&db, &binding("👍", 1)).await.unwrap());
        assert!(!register_reaction_role(&db, &binding("👍", 2)).await.unwrap());
        assert!(register_reaction_role(&db, &binding("👎", 2)).await.unwrap());

        assert_eq!(list_reaction_roles(&db).await.unwrap().len(), 2);
    }

    #[test]
    fn cap_roles_are_semicolon_joined() {
        assert_eq!(join_role_ids(&[1, 22, 333]), "1;22;333");
        assert_eq!(split_role_ids("1;22;333").unwrap(), vec![1, 22, 333]);
        assert!(split_role_ids("").unwrap().is_empty());
        assert!(split_role_ids("1;x").is_err());
    }

    #[tokio::test]
    async fn message_lookup_includes_cap() {
        let db = Database::connect_in_memory().await.unwrap();

        register_reaction_role(&db, &binding("🍎", 1)).await.unwrap();
        register_reaction_role(&db, &binding("🍌", 2)).await.unwrap();
        set_reaction_cap(
            &db,
            &ReactionCap {
                message_id: 200,
                roles: vec![1, 2],
                max: 1,
            },
        )
        .await
        .unwrap();

        let roles = reaction_roles_for_message(&db, 200).await.unwrap();
        assert_eq!(roles.role_for_emoji("🍌"), Some(2));
        assert_eq!(roles.bound_roles(), vec![1, 2]);
        assert_eq!(roles.cap.as_ref().map(|cap| cap.max), Some(1));

        assert!(clear_reaction_cap(&db, 200).await.unwrap());
        assert!(unregister_reaction_role(&db, 200, "🍎", 1).await.unwrap());

        let roles = reaction_roles_for_message(&db, 200).await.unwrap();
        assert!(roles.cap.is_none());
        assert_eq!(roles.role_for_emoji("🍎"), None);
    }

    #[tokio::test]
    async fn cap_follows_bindings_added_and_removed_later() {
        let db = Database::connect_in_memory().await.unwrap();

        register_reaction_role(&db, &binding("🍎", 1)).await.unwrap();
        set_reaction_cap(
            &db,
            &ReactionCap {
                message_id: 200,
                roles: vec![1],
                max: 1,
            },
        )
        .await
        .unwrap();

        register_reaction_role(&db, &binding("🍌", 2)).await.unwrap();
        let roles = reaction_roles_for_message(&db, 200).await.unwrap();
        assert_eq!(roles.cap.map(|cap| cap.roles), Some(vec![1, 2]));

        unregister_reaction_role(&db, 200, "🍎", 1).await.unwrap();
        let roles = reaction_roles_for_message(&db, 200).await.unwrap();
        assert_eq!(roles.cap.map(|cap| (cap.roles, cap.max)), Some((vec![2], 1)));
    }

    #[tokio::test]
    async fn unknown_message_has_no_bindings() {
        let db = Database::connect_in_memory().await.unwrap();

        let roles = reaction_roles_for_message(&db, 999).await.unwrap();
        assert!(roles.bindings.is_empty());
        assert!(roles.cap.is_none());
    }
}
