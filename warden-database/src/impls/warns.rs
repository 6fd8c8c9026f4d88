use anyhow::Context as _;

use crate::{database::Database, model::warns::Warn};

/// Append a warning for `user_id`.
pub async fn insert_warn(
    db: &Database,
    user_id: u64,
    issuer_id: u64,
    reason: &str,
    timestamp_ms: i64,
) -> anyhow::Result<Warn> {
    let user_id_i64 = i64::try_from(user_id).context("user_id out of i64 range")?;
    let issuer_id_i64 = i64::try_from(issuer_id).context("issuer_id out of i64 range")?;
    let warn_id = uuid::Uuid::new_v4().to_string();

    sqlx::query(
        "INSERT INTO warns (warn_id, user_id, issuer_id, reason, timestamp) VALUES (?1, ?2, ?3, ?4, ?5)",
    )
    .bind(&warn_id)
    .bind(user_id_i64)
    .bind(issuer_id_i64)
    .bind(reason)
    .bind(timestamp_ms)
    .execute(db.pool())
    .await?;

    Ok(Warn {
        warn_id,
        user_id,
        issuer_id,
        reason: reason.to_owned(),
        timestamp_ms,
    })
}

#[cfg(test)]
mod tests {
    use super::insert_warn;
    use crate::database::Database;

    #[tokio::test]
    async fn warns_are_append_only_rows() {
        let db = Database::connect_in_memory().await.unwrap();

        let first = insert_warn(&db, 10, 20, "spam", 1).await.unwrap();
        let second = insert_warn(&db, 10, 20, "spam again", 2).await.unwrap();
        assert_ne!(first.warn_id, second.warn_id);

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM warns WHERE user_id = 10")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(count, 2);
    }
}
