//! Candidate selection. Read-only; the heavy filters run in SQL and the
//! parts that need decoded enums or reference data (mutual attraction,
//! location preferences) run here on the ordered result.

use sqlx::SqlitePool;

use crate::location::geography::{self, Geography};
use crate::profiles::store::{ProfileRow, PROFILE_COLS};
use crate::profiles::{self, LocationPreference, Profile, NEARBY_KM};
use crate::AppResult;

/// Return the next eligible candidate for `user_id`, or None when the pool
/// is exhausted. Requester absent is an error; exhaustion is not.
///
/// Ordering is `created_at, user_id`, so for a fixed store state repeated
/// calls return the same candidate.
pub async fn next_candidate(
    pool: &SqlitePool,
    geography: &Geography,
    guild_id: &str,
    user_id: &str,
) -> AppResult<Option<Profile>> {
    let requester = profiles::get(pool, guild_id, user_id).await?;

    let rows: Vec<ProfileRow> = sqlx::query_as(&format!(
        "SELECT {PROFILE_COLS} FROM profiles \
         WHERE guild_id=? AND user_id != ? \
           AND matched_with IS NULL \
           AND age BETWEEN ? AND ? \
           AND ? BETWEEN preferred_min_age AND preferred_max_age \
           AND looking_for = ? \
           AND NOT EXISTS (SELECT 1 FROM swipes \
                           WHERE swipes.guild_id = profiles.guild_id \
                             AND swipes.swiper_id = ? \
                             AND swipes.swiped_id = profiles.user_id) \
         ORDER BY created_at, user_id"
    ))
    .bind(guild_id)
    .bind(user_id)
    .bind(requester.preferred_min_age)
    .bind(requester.preferred_max_age)
    .bind(requester.age)
    .bind(requester.looking_for.to_string())
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    for row in rows {
        let candidate = Profile::try_from(row)?;
        if !requester.attraction_is_mutual(&candidate) {
            continue;
        }
        if !locations_compatible(geography, &requester, &candidate) {
            continue;
        }
        return Ok(Some(candidate));
    }

    Ok(None)
}

/// Both sides' location preferences must admit the other, the same way the
/// age check is symmetric.
fn locations_compatible(geography: &Geography, a: &Profile, b: &Profile) -> bool {
    preference_admits(geography, a, b) && preference_admits(geography, b, a)
}

/// Whether `who`'s declared preference admits `other`. Missing normalized
/// attributes on either side make every scoped preference unsatisfiable;
/// the filter is never silently bypassed.
fn preference_admits(geography: &Geography, who: &Profile, other: &Profile) -> bool {
    match who.location_pref {
        LocationPreference::Anywhere => true,
        LocationPreference::SameCountry => match (&who.country, &other.country) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        },
        LocationPreference::SameSubdivision => {
            match (&who.country, &other.country, &who.subdivision, &other.subdivision) {
                (Some(ca), Some(cb), Some(sa), Some(sb)) => ca == cb && sa == sb,
                _ => false,
            }
        }
        LocationPreference::SameContinent => match (&who.country, &other.country) {
            (Some(a), Some(b)) => match (geography.continent_of(a), geography.continent_of(b)) {
                (Some(ca), Some(cb)) => ca == cb,
                _ => false,
            },
            _ => false,
        },
        LocationPreference::Nearby => {
            match (who.latitude, who.longitude, other.latitude, other.longitude) {
                (Some(lat1), Some(lon1), Some(lat2), Some(lon2)) => {
                    geography::distance_km(lat1, lon1, lat2, lon2) <= NEARBY_KM
                }
                _ => false,
            }
        }
    }
}
