use sqlx::SqlitePool;
use sqlx::sqlite::SqlitePoolOptions;
use tracing::info;

use crate::AppResult;

/// Open the pool and make sure the schema exists. Safe to call on every
/// startup; all DDL is `IF NOT EXISTS`.
pub async fn connect(database_url: &str) -> AppResult<SqlitePool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(16)
        .connect(database_url)
        .await?;

    sqlx::query("PRAGMA foreign_keys = ON").execute(&pool).await?;
    // WAL lets the location worker write while swipe traffic reads.
    sqlx::query("PRAGMA journal_mode = WAL").execute(&pool).await?;
    sqlx::query("PRAGMA busy_timeout = 5000").execute(&pool).await?;

    init_schema(&pool).await?;
    info!("database ready at {database_url}");
    Ok(pool)
}

pub async fn init_schema(pool: &SqlitePool) -> AppResult<()> {
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS profiles (
            user_id           TEXT NOT NULL,
            guild_id          TEXT NOT NULL,
            age               INTEGER NOT NULL,
            gender            TEXT NOT NULL,
            attracted_genders TEXT NOT NULL,
            bio               TEXT NOT NULL DEFAULT '',
            looking_for       TEXT NOT NULL,
            preferred_min_age INTEGER NOT NULL DEFAULT 18,
            preferred_max_age INTEGER NOT NULL DEFAULT 100,
            matched_with      TEXT,
            location_pref     TEXT NOT NULL DEFAULT 'Anywhere',
            country           TEXT,
            subdivision       TEXT,
            latitude          REAL,
            longitude         REAL,
            created_at        TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at        TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
            PRIMARY KEY (user_id, guild_id)
        )",
    )
    .execute(pool)
    .await?;

    // Append-only ledger. v7 uuids sort by creation time, so the primary
    // key doubles as the event order.
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS swipes (
            id          TEXT PRIMARY KEY,
            guild_id    TEXT NOT NULL,
            swiper_id   TEXT NOT NULL,
            swiped_id   TEXT NOT NULL,
            right_swipe INTEGER NOT NULL,
            created_at  TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        )",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_swipes_pair
         ON swipes (guild_id, swiper_id, swiped_id)",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS location_updates (
            id            TEXT PRIMARY KEY,
            payload       TEXT NOT NULL,
            claimed_until INTEGER,
            created_at    TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        )",
    )
    .execute(pool)
    .await?;

    Ok(())
}

#[cfg(test)]
pub async fn test_pool() -> SqlitePool {
    // One connection only: every connection to :memory: is its own database.
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    init_schema(&pool).await.unwrap();
    pool
}
