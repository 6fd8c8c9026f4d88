use anyhow::Context as _;

use crate::{
    database::Database,
    model::cases::{Case, CaseKind},
};

pub struct NewCase<'a> {
    pub user_id: u64,
    pub issuer_id: u64,
    pub kind: CaseKind,
    pub reason: &'a str,
    pub duration_seconds: Option<i64>,
    pub timestamp_ms: i64,
}

#[derive(sqlx::FromRow)]
struct CaseRow {
    case_id: String,
    case_number: i64,
    user_id: i64,
    issuer_id: i64,
    reason: String,
    timestamp: i64,
    kind: String,
    duration: Option<i64>,
    link: Option<String>,
}

const CASE_COLUMNS: &str =
    "case_id, case_number, user_id, issuer_id, reason, timestamp, type AS kind, duration, link";

/// Append a case. The number is assigned by the insert itself so concurrent
/// writers serialize on the SQLite write lock instead of racing on a count.
pub async fn create_case(db: &Database, new_case: NewCase<'_>) -> anyhow::Result<Case> {
    let user_id_i64 = i64::try_from(new_case.user_id).context("user_id out of i64 range")?;
    let issuer_id_i64 = i64::try_from(new_case.issuer_id).context("issuer_id out of i64 range")?;
    let case_id = uuid::Uuid::new_v4().to_string();

    let row: CaseRow = sqlx::query_as(&format!(
        "INSERT INTO cases (case_id, case_number, user_id, issuer_id, reason, timestamp, type, duration, link)
         VALUES (?1, (SELECT COALESCE(MAX(case_number), 0) + 1 FROM cases), ?2, ?3, ?4, ?5, ?6, ?7, NULL)
         RETURNING {CASE_COLUMNS}"
    ))
    .bind(&case_id)
    .bind(user_id_i64)
    .bind(issuer_id_i64)
    .bind(new_case.reason)
    .bind(new_case.timestamp_ms)
    .bind(new_case.kind.as_str())
    .bind(new_case.duration_seconds)
    .fetch_one(db.pool())
    .await?;

    to_case(row)
}

/// Back-fill the permalink of the posted log message.
pub async fn set_case_link(db: &Database, case_id: &str, link: &str) -> anyhow::Result<()> {
    sqlx::query("UPDATE cases SET link = ?1 WHERE case_id = ?2")
        .bind(link)
        .bind(case_id)
        .execute(db.pool())
        .await?;

    Ok(())
}

/// All cases against `user_id`, newest first.
pub async fn list_cases_for_user(db: &Database, user_id: u64) -> anyhow::Result<Vec<Case>> {
    let user_id_i64 = i64::try_from(user_id).context("user_id out of i64 range")?;

    let rows: Vec<CaseRow> = sqlx::query_as(&format!(
        "SELECT {CASE_COLUMNS} FROM cases WHERE user_id = ?1 ORDER BY case_number DESC"
    ))
    .bind(user_id_i64)
    .fetch_all(db.pool())
    .await?;

    rows.into_iter().map(to_case).collect()
}

/// Look a case up by its uuid or by its sequence number.
pub async fn find_case(db: &Database, key: &str) -> anyhow::Result<Option<Case>> {
    let key = key.trim();
    let case_number = key.parse::<i64>().ok();

    let row: Option<CaseRow> = sqlx::query_as(&format!(
        "SELECT {CASE_COLUMNS} FROM cases WHERE case_id = ?1 OR case_number = ?2 LIMIT 1"
    ))
    .bind(key)
    .bind(case_number)
    .fetch_optional(db.pool())
    .await?;

    row.map(to_case).transpose()
}

/// Replace the reason of the case matching `key`. Returns the updated case,
/// or `None` when nothing matched.
pub async fn update_case_reason(
    db: &Database,
    key: &str,
    new_reason: &str,
) -> anyhow::Result<Option<Case>> {
    let Some(existing) = find_case(db, key).await? else {
        return Ok(None);
    };

    let row: CaseRow = sqlx::query_as(&format!(
        "UPDATE cases SET reason = ?1 WHERE case_id = ?2 RETURNING {CASE_COLUMNS}"
    ))
    .bind(new_reason)
    .bind(&existing.case_id)
    .fetch_one(db.pool())
    .await?;

    Ok(Some(to_case(row)?))
}

fn to_case(row: CaseRow) -> anyhow::Result<Case> {
    Ok(Case {
        kind: CaseKind::parse(&row.kind)
            .with_context(|| format!("unknown case type `{}`", row.kind))?,
        case_id: row.case_id,
        case_number: u64::try_from(row.case_number).context("case_number row out of u64 range")?,
        user_id: u64::try_from(row.user_id).context("user_id row out of u64 range")?,
        issuer_id: u64::try_from(row.issuer_id).context("issuer_id row out of u64 range")?,
        reason: row.reason,
        timestamp_ms: row.timestamp,
        duration_seconds: row.duration,
        link: row.link,
    })
}
