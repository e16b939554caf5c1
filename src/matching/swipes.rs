//! Append-only swipe ledger. Rows are never updated or deleted; duplicate
//! rows for the same ordered pair are allowed and harmless because the
//! selector treats "any swipe exists" as terminal for that pair.

use sqlx::SqlitePool;
use uuid::Uuid;

use crate::AppResult;

use super::SwipeDirection;

/// Durable once this returns.
pub async fn record(
    pool: &SqlitePool,
    guild_id: &str,
    swiper_id: &str,
    swiped_id: &str,
    direction: SwipeDirection,
) -> AppResult<()> {
    sqlx::query(
        "INSERT INTO swipes (id, guild_id, swiper_id, swiped_id, right_swipe) VALUES (?,?,?,?,?)",
    )
    .bind(Uuid::now_v7().to_string())
    .bind(guild_id)
    .bind(swiper_id)
    .bind(swiped_id)
    .bind(direction == SwipeDirection::Right)
    .execute(pool)
    .await?;

    Ok(())
}

/// Any swipe, either direction of interest, from a onto b.
pub async fn has_swiped(pool: &SqlitePool, guild_id: &str, a: &str, b: &str) -> AppResult<bool> {
    let row: Option<(i64,)> =
        sqlx::query_as("SELECT 1 FROM swipes WHERE guild_id=? AND swiper_id=? AND swiped_id=?")
            .bind(guild_id)
            .bind(a)
            .bind(b)
            .fetch_optional(pool)
            .await?;

    Ok(row.is_some())
}

pub async fn has_right_swiped(
    pool: &SqlitePool,
    guild_id: &str,
    a: &str,
    b: &str,
) -> AppResult<bool> {
    let row: Option<(i64,)> = sqlx::query_as(
        "SELECT 1 FROM swipes WHERE guild_id=? AND swiper_id=? AND swiped_id=? AND right_swipe=1",
    )
    .bind(guild_id)
    .bind(a)
    .bind(b)
    .fetch_optional(pool)
    .await?;

    Ok(row.is_some())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    #[tokio::test]
    async fn record_and_query() {
        let pool = db::test_pool().await;

        record(&pool, "g1", "alice", "bob", SwipeDirection::Left)
            .await
            .unwrap();

        assert!(has_swiped(&pool, "g1", "alice", "bob").await.unwrap());
        assert!(!has_right_swiped(&pool, "g1", "alice", "bob").await.unwrap());
        // ordered pair, not symmetric
        assert!(!has_swiped(&pool, "g1", "bob", "alice").await.unwrap());
        // scoped per guild
        assert!(!has_swiped(&pool, "g2", "alice", "bob").await.unwrap());

        record(&pool, "g1", "alice", "bob", SwipeDirection::Right)
            .await
            .unwrap();
        assert!(has_right_swiped(&pool, "g1", "alice", "bob").await.unwrap());
    }
}
