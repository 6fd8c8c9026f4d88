use anyhow::Context as _;

use crate::{database::Database, model::tickets::Ticket};

pub struct NewTicket<'a> {
    pub ticket_id: &'a str,
    pub user_id: u64,
    pub channel_id: u64,
    pub thread_id: u64,
}

#[derive(sqlx::FromRow)]
struct TicketRow {
    ticket_id: String,
    user_id: i64,
    channel_id: i64,
    thread_id: i64,
    closed_reason: Option<String>,
    closed: bool,
}

const TICKET_COLUMNS: &str = "ticket_id, user_id, channel_id, thread_id, closed_reason, closed";

pub async fn create_ticket(db: &Database, new_ticket: NewTicket<'_>) -> anyhow::Result<Ticket> {
    let user_id_i64 = i64::try_from(new_ticket.user_id).context("user_id out of i64 range")?;
    let channel_id_i64 =
        i64::try_from(new_ticket.channel_id).context("channel_id out of i64 range")?;
    let thread_id_i64 = i64::try_from(new_ticket.thread_id).context("thread_id out of i64 range")?;

    sqlx::query(
        "INSERT INTO tickets (ticket_id, user_id, channel_id, thread_id, closed_reason, closed)
         VALUES (?1, ?2, ?3, ?4, NULL, 0)",
    )
    .bind(new_ticket.ticket_id)
    .bind(user_id_i64)
    .bind(channel_id_i64)
    .bind(thread_id_i64)
    .execute(db.pool())
    .await?;

    Ok(Ticket {
        ticket_id: new_ticket.ticket_id.to_owned(),
        user_id: new_ticket.user_id,
        channel_id: new_ticket.channel_id,
        thread_id: new_ticket.thread_id,
        closed_reason: None,
        closed: false,
    })
}

pub async fn get_ticket(db: &Database, ticket_id: &str) -> anyhow::Result<Option<Ticket>> {
    let row: Option<TicketRow> = sqlx::query_as(&format!(
        "SELECT {TICKET_COLUMNS} FROM tickets WHERE ticket_id = ?1"
    ))
    .bind(ticket_id)
    .fetch_optional(db.pool())
    .await?;

    row.map(to_ticket).transpose()
}

/// The open ticket a user is currently relaying through, if any.
pub async fn find_open_ticket_for_user(db: &Database, user_id: u64) -> anyhow::Result<Option<Ticket>> {
    let user_id_i64 = i64::try_from(user_id).context("user_id out of i64 range")?;

    let row: Option<TicketRow> = sqlx::query_as(&format!(
        "SELECT {TICKET_COLUMNS} FROM tickets WHERE user_id = ?1 AND closed = 0 LIMIT 1"
    ))
    .bind(user_id_i64)
    .fetch_optional(db.pool())
    .await?;

    row.map(to_ticket).transpose()
}

pub async fn find_open_ticket_by_thread(
    db: &Database,
    thread_id: u64,
) -> anyhow::Result<Option<Ticket>> {
    let thread_id_i64 = i64::try_from(thread_id).context("thread_id out of i64 range")?;

    let row: Option<TicketRow> = sqlx::query_as(&format!(
        "SELECT {TICKET_COLUMNS} FROM tickets WHERE thread_id = ?1 AND closed = 0 LIMIT 1"
    ))
    .bind(thread_id_i64)
    .fetch_optional(db.pool())
    .await?;

    row.map(to_ticket).transpose()
}

pub async fn list_open_tickets(db: &Database) -> anyhow::Result<Vec<Ticket>> {
    let rows: Vec<TicketRow> = sqlx::query_as(&format!(
        "SELECT {TICKET_COLUMNS} FROM tickets WHERE closed = 0"
    ))
    .fetch_all(db.pool())
    .await?;

    rows.into_iter().map(to_ticket).collect()
}

/// Mark a ticket closed. Returns `false` when it was already closed or unknown.
pub async fn close_ticket(
    db: &Database,
    ticket_id: &str,
    reason: Option<&str>,
) -> anyhow::Result<bool> {
    let result = sqlx::query(
        "UPDATE tickets SET closed_reason = ?1, closed = 1 WHERE ticket_id = ?2 AND closed = 0",
    )
    .bind(reason)
    .bind(ticket_id)
    .execute(db.pool())
    .await?;

    Ok(result.rows_affected() > 0)
}

fn to_ticket(row: TicketRow) -> anyhow::Result<Ticket> {
    Ok(Ticket {
        ticket_id: row.ticket_id,
        user_id: u64::try_from(row.user_id).context("user_id row out of u64 range")?,
        channel_id: u64::try_from(row.channel_id).context("channel_id row out of u64 range")?,
        thread_id: u64::try_from(row.thread_id).context("thread_id row out of u64 range")?,
        closed_reason: row.closed_reason,
        closed: row.closed,
    })
}

#[cfg(test)]
mod tests {
    use super::{
        NewTicket, close_ticket, create_ticket, find_open_ticket_by_thread,
        find_open_ticket_for_user, get_ticket, list_open_tickets,
    };
    use crate::database::Database;

    #[tokio::test]
    async fn ticket_lifecycle() {
        let db = Database::connect_in_memory().await.unwrap();

        create_ticket(
            &db,
            NewTicket {
                ticket_id: "t-1",
                user_id: 11,
                channel_id: 22,
                thread_id: 33,
            },
        )
        .await
        .unwrap();

        let open = find_open_ticket_for_user(&db, 11).await.unwrap().unwrap();
        assert_eq!(open.thread_id, 33);
        assert_eq!(
            find_open_ticket_by_thread(&db, 33)
                .await
                .unwrap()
                .map(|ticket| ticket.user_id),
            Some(11)
        );
        assert_eq!(list_open_tickets(&db).await.unwrap().len(), 1);

        assert!(close_ticket(&db, "t-1", Some("Closed by user")).await.unwrap());
        assert!(!close_ticket(&db, "t-1", None).await.unwrap());

        let closed = get_ticket(&db, "t-1").await.unwrap().unwrap();
        assert!(closed.closed);
        assert_eq!(closed.closed_reason.as_deref(), Some("Closed by user"));
        assert!(find_open_ticket_for_user(&db, 11).await.unwrap().is_none());
        assert!(find_open_ticket_by_thread(&db, 33).await.unwrap().is_none());
    }
}
