//! Durable at-least-once queue on top of the store.
//!
//! Messages live in the `location_updates` table. A consumer claims the
//! oldest available row with a lease; acking deletes the row. A crash
//! between claim and ack leaves the row to be redelivered once the lease
//! expires, so consumers must tolerate duplicates.

use sqlx::SqlitePool;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::AppResult;

/// How long a claimed message stays invisible to other consumers.
pub const DEFAULT_LEASE_SECS: i64 = 60;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueuedMessage {
    pub id: String,
    pub payload: String,
}

/// Enqueue a payload. The v7 id makes `ORDER BY id` deliver FIFO.
pub async fn publish(pool: &SqlitePool, payload: &str) -> AppResult<String> {
    let id = Uuid::now_v7().to_string();
    sqlx::query("INSERT INTO location_updates (id, payload) VALUES (?,?)")
        .bind(&id)
        .bind(payload)
        .execute(pool)
        .await?;
    Ok(id)
}

/// Atomically claim the oldest unclaimed (or lease-expired) message, or
/// None when the queue is empty.
pub async fn claim(pool: &SqlitePool, lease_secs: i64) -> AppResult<Option<QueuedMessage>> {
    let now = OffsetDateTime::now_utc().unix_timestamp();

    let row: Option<(String, String)> = sqlx::query_as(
        "UPDATE location_updates SET claimed_until = ? \
         WHERE id = (SELECT id FROM location_updates \
                     WHERE claimed_until IS NULL OR claimed_until < ? \
                     ORDER BY id LIMIT 1) \
         RETURNING id, payload",
    )
    .bind(now + lease_secs)
    .bind(now)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|(id, payload)| QueuedMessage { id, payload }))
}

/// Acknowledge a processed message. Only called after persistence (success
/// or decided degradation), never before.
pub async fn ack(pool: &SqlitePool, id: &str) -> AppResult<()> {
    sqlx::query("DELETE FROM location_updates WHERE id=?")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}
