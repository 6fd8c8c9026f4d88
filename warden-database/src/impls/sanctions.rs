use anyhow::Context as _;

use crate::{
    database::Database,
    model::sanctions::{PERMANENT_DURATION, Sanction, SanctionKind},
};

pub struct NewSanction<'a> {
    pub kind: SanctionKind,
    pub user_id: u64,
    pub issuer_id: u64,
    pub reason: &'a str,
    /// Seconds, `-1` for permanent.
    pub duration_seconds: i64,
    pub timestamp_ms: i64,
}

#[derive(sqlx::FromRow)]
struct SanctionRow {
    id: String,
    user_id: i64,
    issuer_id: i64,
    reason: String,
    timestamp: i64,
    duration: i64,
    ends_at: i64,
    permanent: bool,
    active: bool,
}

fn select_columns(kind: SanctionKind) -> String {
    format!(
        "{} AS id, user_id, issuer_id, reason, timestamp, duration, ends_at, permanent, active",
        kind.id_column()
    )
}

/// Record a new active ban or mute.
pub async fn insert_sanction(db: &Database, new: NewSanction<'_>) -> anyhow::Result<Sanction> {
    let user_id_i64 = i64::try_from(new.user_id).context("user_id out of i64 range")?;
    let issuer_id_i64 = i64::try_from(new.issuer_id).context("issuer_id out of i64 range")?;
    let permanent = new.duration_seconds == PERMANENT_DURATION;
    let ends_at = new
        .duration_seconds
        .checked_mul(1000)
        .and_then(|duration_ms| new.timestamp_ms.checked_add(duration_ms))
        .context("sanction end out of i64 range")?;
    let id = uuid::Uuid::new_v4().to_string();

    let row: SanctionRow = sqlx::query_as(&format!(
        "INSERT INTO {table} ({id_column}, user_id, issuer_id, reason, timestamp, duration, ends_at, permanent, active)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, 1)
         RETURNING {columns}",
        table = new.kind.table(),
        id_column = new.kind.id_column(),
        columns = select_columns(new.kind),
    ))
    .bind(&id)
    .bind(user_id_i64)
    .bind(issuer_id_i64)
    .bind(new.reason)
    .bind(new.timestamp_ms)
    .bind(new.duration_seconds)
    .bind(ends_at)
    .bind(permanent)
    .fetch_one(db.pool())
    .await?;

    to_sanction(new.kind, row)
}

/// Flip every active sanction of `kind` for `user_id` inactive. Returns the
/// number of rows changed (zero when there was nothing to lift).
pub async fn deactivate_user_sanctions(
    db: &Database,
    kind: SanctionKind,
    user_id: u64,
) -> anyhow::Result<u64> {
    let user_id_i64 = i64::try_from(user_id).context("user_id out of i64 range")?;

    let result = sqlx::query(&format!(
        "UPDATE {} SET active = 0 WHERE user_id = ?1 AND active = 1",
        kind.table()
    ))
    .bind(user_id_i64)
    .execute(db.pool())
    .await?;

    Ok(result.rows_affected())
}

/// Flip a single sanction inactive by id. Returns whether it was active.
pub async fn deactivate_sanction(db: &Database, kind: SanctionKind, id: &str) -> anyhow::Result<bool> {
    let result = sqlx::query(&format!(
        "UPDATE {} SET active = 0 WHERE {} = ?1 AND active = 1",
        kind.table(),
        kind.id_column()
    ))
    .bind(id)
    .execute(db.pool())
    .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn list_active_sanctions(
    db: &Database,
    kind: SanctionKind,
) -> anyhow::Result<Vec<Sanction>> {
    let rows: Vec<SanctionRow> = sqlx::query_as(&format!(
        "SELECT {} FROM {} WHERE active = 1 ORDER BY timestamp ASC",
        select_columns(kind),
        kind.table()
    ))
    .fetch_all(db.pool())
    .await?;

    rows.into_iter().map(|row| to_sanction(kind, row)).collect()
}

/// Most recent active sanction of `kind` for `user_id`, if any.
pub async fn find_active_sanction(
    db: &Database,
    kind: SanctionKind,
    user_id: u64,
) -> anyhow::Result<Option<Sanction>> {
    let user_id_i64 = i64::try_from(user_id).context("user_id out of i64 range")?;

    let row: Option<SanctionRow> = sqlx::query_as(&format!(
        "SELECT {} FROM {} WHERE user_id = ?1 AND active = 1 ORDER BY timestamp DESC LIMIT 1",
        select_columns(kind),
        kind.table()
    ))
    .bind(user_id_i64)
    .fetch_optional(db.pool())
    .await?;

    row.map(|row| to_sanction(kind, row)).transpose()
}

fn to_sanction(kind: SanctionKind, row: SanctionRow) -> anyhow::Result<Sanction> {
    Ok(Sanction {
        id: row.id,
        kind,
        user_id: u64::try_from(row.user_id).context("user_id row out of u64 range")?,
        issuer_id: u64::try_from(row.issuer_id).context("issuer_id row out of u64 range")?,
        reason: row.reason,
        timestamp_ms: row.timestamp,
        duration_seconds: row.duration,
        ends_at_ms: row.ends_at,
        permanent: row.permanent,
        active: row.active,
    })
}

#[cfg(test)]
mod tests {
    use super::{
        NewSanction, deactivate_sanction, deactivate_user_sanctions, find_active_sanction,
        insert_sanction, list_active_sanctions,
    };
    use crate::database::Database;
    use crate::model::sanctions::{PERMANENT_DURATION, SanctionKind};

    const NOW: i64 = 1_700_000_000_000;

    fn ban(user_id: u64, duration_seconds: i64) -> NewSanction<'static> {
        NewSanction {
            kind: SanctionKind::Ban,
            user_id,
            issuer_id: 5,
            reason: "No reason provided",
            duration_seconds,
            timestamp_ms: NOW,
        }
    }

    #[tokio::test]
    async fn inserted_ban_records_end_time_in_millis() {
        let db = Database::connect_in_memory().await.unwrap();

        let sanction = insert_sanction(&db, ban(3, 86_400)).await.unwrap();

        assert_eq!(sanction.duration_seconds, 86_400);
        assert_eq!(sanction.ends_at_ms, NOW + 86_400_000);
        assert!(sanction.active);
        assert!(!sanction.permanent);
    }

    #[tokio::test]
    async fn permanent_mute_is_flagged() {
        let db = Database::connect_in_memory().await.unwrap();

        let sanction = insert_sanction(
            &db,
            NewSanction {
                kind: SanctionKind::Mute,
                ..ban(3, PERMANENT_DURATION)
            },
        )
        .await
        .unwrap();

        assert!(sanction.permanent);
        assert_eq!(
            find_active_sanction(&db, SanctionKind::Mute, 3)
                .await
                .unwrap()
                .map(|found| found.id),
            Some(sanction.id)
        );
        assert!(
            find_active_sanction(&db, SanctionKind::Ban, 3)
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn deactivation_by_user_and_by_id() {
        let db = Database::connect_in_memory().await.unwrap();

        let first = insert_sanction(&db, ban(1, 60)).await.unwrap();
        insert_sanction(&db, ban(2, 60)).await.unwrap();
        insert_sanction(&db, ban(2, 120)).await.unwrap();

        assert!(deactivate_sanction(&db, SanctionKind::Ban, &first.id).await.unwrap());
        assert!(!deactivate_sanction(&db, SanctionKind::Ban, &first.id).await.unwrap());

        assert_eq!(
            deactivate_user_sanctions(&db, SanctionKind::Ban, 2).await.unwrap(),
            2
        );
        assert_eq!(
            deactivate_user_sanctions(&db, SanctionKind::Ban, 2).await.unwrap(),
            0
        );
        assert!(
            list_active_sanctions(&db, SanctionKind::Ban)
                .await
                .unwrap()
                .is_empty()
        );
    }
}
