use anyhow::Context as _;

use crate::{
    database::Database,
    model::applications::{Application, ApplicationAnswer, ApplicationResult},
};

#[derive(sqlx::FromRow)]
struct ApplicationRow {
    application_id: String,
    user_id: i64,
    kind: String,
    answers: String,
    result: i64,
}

/// Store a pending application with its question/answer transcript.
pub async fn create_application(
    db: &Database,
    application_id: &str,
    user_id: u64,
    kind: &str,
    answers: &[ApplicationAnswer],
) -> anyhow::Result<()> {
    let user_id_i64 = i64::try_from(user_id).context("user_id out of i64 range")?;
    let answers_json =
        serde_json::to_string(answers).context("failed to serialize application answers")?;

    sqlx::query(
        "INSERT INTO applications (application_id, user_id, type, answers, result)
         VALUES (?1, ?2, ?3, ?4, ?5)",
    )
    .bind(application_id)
    .bind(user_id_i64)
    .bind(kind)
    .bind(answers_json)
    .bind(ApplicationResult::Pending.as_i64())
    .execute(db.pool())
    .await?;

    Ok(())
}

/// Record the review outcome of a pending application. Returns the
/// applicant's id, or `None` when the application is missing or was already
/// decided.
pub async fn decide_application(
    db: &Database,
    application_id: &str,
    result: ApplicationResult,
) -> anyhow::Result<Option<u64>> {
    let user_id: Option<i64> = sqlx::query_scalar(
        "UPDATE applications SET result = ?1
         WHERE application_id = ?2 AND result = ?3
         RETURNING user_id",
    )
    .bind(result.as_i64())
    .bind(application_id)
    .bind(ApplicationResult::Pending.as_i64())
    .fetch_optional(db.pool())
    .await?;

    user_id
        .map(|user_id| u64::try_from(user_id).context("user_id row out of u64 range"))
        .transpose()
}

pub async fn get_application(
    db: &Database,
    application_id: &str,
) -> anyhow::Result<Option<Application>> {
    let row: Option<ApplicationRow> = sqlx::query_as(
        "SELECT application_id, user_id, type AS kind, answers, result
         FROM applications WHERE application_id = ?1",
    )
    .bind(application_id)
    .fetch_optional(db.pool())
    .await?;

    let Some(row) = row else {
        return Ok(None);
    };

    Ok(Some(Application {
        answers: serde_json::from_str(&row.answers)
            .context("failed to deserialize application answers")?,
        result: ApplicationResult::from_i64(row.result)
            .with_context(|| format!("unknown application result `{}`", row.result))?,
        application_id: row.application_id,
        user_id: u64::try_from(row.user_id).context("user_id row out of u64 range")?,
        kind: row.kind,
    }))
}
