//! Swipe recording and the atomic match transition.

use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::{AppError, AppResult};

use super::{swipes, SwipeDirection, SwipeOutcome};

/// Record a swipe and, on a reciprocal right-swipe, commit the match.
///
/// The commit is one conditional UPDATE inside a transaction that touches
/// both rows only where `matched_with IS NULL`; anything other than exactly
/// two affected rows means a concurrent reciprocal event won, and we roll
/// back and report [`SwipeOutcome::LostRace`] rather than a false match.
pub async fn swipe(
    pool: &SqlitePool,
    guild_id: &str,
    actor_id: &str,
    target_id: &str,
    direction: SwipeDirection,
) -> AppResult<SwipeOutcome> {
    if actor_id == target_id {
        return Err(AppError::invalid("cannot swipe on yourself"));
    }

    // The ledger append is durable before anything else happens.
    swipes::record(pool, guild_id, actor_id, target_id, direction).await?;

    if direction == SwipeDirection::Left {
        return Ok(SwipeOutcome::NoMatch);
    }

    if !swipes::has_right_swiped(pool, guild_id, target_id, actor_id).await? {
        debug!(guild_id, actor_id, target_id, "no reciprocal right-swipe yet");
        return Ok(SwipeOutcome::NoMatch);
    }

    let mut tx = pool.begin().await?;
    let result = sqlx::query(
        "UPDATE profiles \
         SET matched_with = CASE user_id WHEN ? THEN ? ELSE ? END, \
             updated_at = CURRENT_TIMESTAMP \
         WHERE guild_id=? AND user_id IN (?,?) AND matched_with IS NULL",
    )
    .bind(actor_id)
    .bind(target_id)
    .bind(actor_id)
    .bind(guild_id)
    .bind(actor_id)
    .bind(target_id)
    .execute(&mut *tx)
    .await?;

    if result.rows_affected() == 2 {
        tx.commit().await?;
        info!(guild_id, actor_id, target_id, "match committed");
        Ok(SwipeOutcome::Matched(target_id.to_owned()))
    } else {
        tx.rollback().await?;
        info!(guild_id, actor_id, target_id, "match commit lost a race");
        Ok(SwipeOutcome::LostRace)
    }
}

/// Clear both sides of a match in one transaction. `Ok(None)` means the
/// actor was not matched; the cleared partner id is returned otherwise.
pub async fn unmatch(
    pool: &SqlitePool,
    guild_id: &str,
    actor_id: &str,
) -> AppResult<Option<String>> {
    let mut tx = pool.begin().await?;

    let row: Option<(Option<String>,)> =
        sqlx::query_as("SELECT matched_with FROM profiles WHERE guild_id=? AND user_id=?")
            .bind(guild_id)
            .bind(actor_id)
            .fetch_optional(&mut *tx)
            .await?;

    let Some((matched_with,)) = row else {
        return Err(AppError::not_found(format!("profile {actor_id} in {guild_id}")));
    };
    let Some(partner) = matched_with else {
        return Ok(None);
    };

    sqlx::query(
        "UPDATE profiles SET matched_with=NULL, updated_at=CURRENT_TIMESTAMP \
         WHERE guild_id=? AND user_id IN (?,?)",
    )
    .bind(guild_id)
    .bind(actor_id)
    .bind(&partner)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    info!(guild_id, actor_id, %partner, "unmatched");
    Ok(Some(partner))
}
