use crate::{database::Database, model::messages::CustomMessage};

#[derive(sqlx::FromRow)]
struct CustomMessageRow {
    name: String,
    json: String,
}

/// Store a named message. Returns `false` when the name is already taken.
pub async fn create_custom_message(db: &Database, name: &str, json: &str) -> anyhow::Result<bool> {
    let result = sqlx::query(
        "INSERT INTO messages (name, json) VALUES (?1, ?2) ON CONFLICT (name) DO NOTHING",
    )
    .bind(name)
    .bind(json)
    .execute(db.pool())
    .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn delete_custom_message(db: &Database, name: &str) -> anyhow::Result<bool> {
    let result = sqlx::query("DELETE FROM messages WHERE name = ?1")
        .bind(name)
        .execute(db.pool())
        .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn get_custom_message(db: &Database, name: &str) -> anyhow::Result<Option<CustomMessage>> {
    let row: Option<CustomMessageRow> =
        sqlx::query_as("SELECT name, json FROM messages WHERE name = ?1")
            .bind(name)
            .fetch_optional(db.pool())
            .await?;

    Ok(row.map(|row| CustomMessage {
        name: row.name,
        json: row.json,
    }))
}

pub async fn list_custom_messages(db: &Database) -> anyhow::Result<Vec<CustomMessage>> {
    let rows: Vec<CustomMessageRow> = sqlx::query_as("SELECT name, json FROM messages ORDER BY name")
        .fetch_all(db.pool())
        .await?;

    Ok(rows
        .into_iter()
        .map(|row| CustomMessage {
            name: row.name,
            json: row.json,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::{create_custom_message, delete_custom_message, get_custom_message, list_custom_messages};
    use crate::database::Database;

    #[tokio::test]
    async fn names_are_unique() {
        let db = Database::connect_in_memory().await.unwrap();

        assert!(create_custom_message(&db, "rules", r#"{"title":"Rules"}"#).await.unwrap());
        assert!(!create_custom_message(&db, "rules", r#"{"title":"Other"}"#).await.unwrap());

        let stored = get_custom_message(&db, "rules").await.unwrap().unwrap();
        assert_eq!(stored.json, r#"{"title":"Rules"}"#);
    }

    #[tokio::test]
    async fn list_and_delete() {
        let db = Database::connect_in_memory().await.unwrap();

        create_custom_message(&db, "welcome", "{}").await.unwrap();
        create_custom_message(&db, "faq", "{}").await.unwrap();

        let names: Vec<String> = list_custom_messages(&db)
            .await
            .unwrap()
            .into_iter()
            .map(|message| message.name)
            .collect();
        assert_eq!(names, vec!["faq".to_owned(), "welcome".to_owned()]);

        assert!(delete_custom_message(&db, "faq").await.unwrap());
        assert!(!delete_custom_message(&db, "faq").await.unwrap());
        assert!(get_custom_message(&db, "faq").await.unwrap().is_none());
    }
}
