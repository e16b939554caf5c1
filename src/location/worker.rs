//! Location normalizer: consumes queued location updates one at a time,
//! resolves canonical country/subdivision, geocodes, and writes the result
//! back to the profile. Each message gets a single pass; partial results
//! (null fields) are persisted and acknowledged, never retried.

use std::time::Duration;

use rand::Rng;
use sqlx::SqlitePool;
use tracing::{error, info, warn};

use crate::location::geocode::Geocoder;
use crate::location::geography::Geography;
use crate::{profiles, queue, AppResult};

use super::LocationUpdate;

const POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Consumer loop. Never returns under normal operation; claims, processes
/// and acks messages, sleeping with a little jitter when the queue is
/// empty so parallel workers don't poll in lockstep.
///
/// Acknowledgment always happens after persistence; a crash mid-message
/// leaves it claimable again once the lease runs out.
pub async fn run<G: Geocoder>(
    pool: SqlitePool,
    geography: Geography,
    geocoder: G,
) -> AppResult<()> {
    info!("location worker waiting for messages");

    loop {
        match queue::claim(&pool, queue::DEFAULT_LEASE_SECS).await {
            Ok(Some(msg)) => match process(&pool, &geography, &geocoder, &msg.payload).await {
                Ok(()) => {
                    if let Err(err) = queue::ack(&pool, &msg.id).await {
                        // redelivery is fine, processing is idempotent
                        error!(%err, id = %msg.id, "failed to ack message");
                    }
                }
                Err(err) => {
                    // storage failure: leave the message for redelivery
                    error!(%err, id = %msg.id, "failed to process message");
                    idle().await;
                }
            },
            Ok(None) => idle().await,
            Err(err) => {
                error!(%err, "queue claim failed");
                idle().await;
            }
        }
    }
}

async fn idle() {
    let jitter = Duration::from_millis(rand::rng().random_range(0..500));
    tokio::time::sleep(POLL_INTERVAL + jitter).await;
}

/// One normalization pass. `Ok(())` means the message is done (including
/// the decided degradations: malformed payload, vanished profile,
/// unresolvable text, geocoder trouble); only storage failures bubble up.
pub async fn process<G: Geocoder>(
    pool: &SqlitePool,
    geography: &Geography,
    geocoder: &G,
    payload: &str,
) -> AppResult<()> {
    let update: LocationUpdate = match serde_json::from_str(payload) {
        Ok(update) => update,
        Err(err) => {
            error!(%err, "dropping malformed location update");
            return Ok(());
        }
    };

    info!(
        user_id = %update.user_id,
        guild_id = %update.guild_id,
        "processing location update"
    );

    let country = geography.normalize_country(&update.raw_country);
    if country.is_none() && !update.raw_country.trim().is_empty() {
        warn!(raw = %update.raw_country, "country did not resolve");
    }
    let subdivision =
        country.and_then(|c| geography.normalize_subdivision(&update.raw_state, c));

    let coords = match country {
        Some(country) => {
            let query = match subdivision {
                Some(subdivision) => format!("{}, {}", subdivision.name, country.name),
                None => country.name.clone(),
            };
            match geocoder.geocode(&query).await {
                Ok(coords) => coords,
                Err(err) => {
                    warn!(%err, %query, "geocoding failed, keeping null coordinates");
                    None
                }
            }
        }
        None => None,
    };
    let (latitude, longitude) = match coords {
        Some((lat, lon)) => (Some(lat), Some(lon)),
        None => (None, None),
    };

    let wrote = profiles::set_location(
        pool,
        &update.guild_id,
        &update.user_id,
        country.map(|c| c.name.as_str()),
        subdivision.map(|s| s.name.as_str()),
        latitude,
        longitude,
    )
    .await?;

    if wrote {
        info!(
            user_id = %update.user_id,
            country = country.map(|c| c.name.as_str()).unwrap_or("-"),
            subdivision = subdivision.map(|s| s.name.as_str()).unwrap_or("-"),
            "location persisted"
        );
    } else {
        warn!(
            user_id = %update.user_id,
            guild_id = %update.guild_id,
            "no profile for location update, dropping"
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::profiles::{create, Gender, LocationPreference, LookingFor, NewProfile};

    struct StubGeocoder(Option<(f64, f64)>);

    impl Geocoder for StubGeocoder {
        async fn geocode(&self, _query: &str) -> anyhow::Result<Option<(f64, f64)>> {
            Ok(self.0)
        }
    }

    struct BrokenGeocoder;

    impl Geocoder for BrokenGeocoder {
        async fn geocode(&self, _query: &str) -> anyhow::Result<Option<(f64, f64)>> {
            anyhow::bail!("service unavailable")
        }
    }

    fn seed(user_id: &str) -> NewProfile {
        NewProfile {
            user_id: user_id.to_owned(),
            guild_id: "g1".to_owned(),
            age: 25,
            gender: Gender::Male,
            attracted_genders: vec![Gender::Female],
            bio: String::new(),
            looking_for: LookingFor::Dating,
            preferred_min_age: 18,
            preferred_max_age: 100,
            location_pref: LocationPreference::Anywhere,
        }
    }

    fn payload(raw_country: &str, raw_state: &str) -> String {
        serde_json::to_string(&LocationUpdate {
            user_id: "alice".to_owned(),
            guild_id: "g1".to_owned(),
            raw_country: raw_country.to_owned(),
            raw_state: raw_state.to_owned(),
        })
        .unwrap()
    }

    #[tokio::test]
    async fn full_normalization_persists_all_fields() {
        let pool = db::test_pool().await;
        let geo = Geography::builtin().unwrap();
        create(&pool, seed("alice")).await.unwrap();

        process(&pool, &geo, &StubGeocoder(Some((40.2, -74.7))), &payload("USA", "NJ"))
            .await
            .unwrap();

        let p = profiles::get(&pool, "g1", "alice").await.unwrap();
        assert_eq!(p.country.as_deref(), Some("United States"));
        assert_eq!(p.subdivision.as_deref(), Some("New Jersey"));
        assert_eq!(p.latitude, Some(40.2));
        assert_eq!(p.longitude, Some(-74.7));
    }

    #[tokio::test]
    async fn geocoder_failure_degrades_to_null_coordinates() {
        let pool = db::test_pool().await;
        let geo = Geography::builtin().unwrap();
        create(&pool, seed("alice")).await.unwrap();

        process(&pool, &geo, &BrokenGeocoder, &payload("United States", "New Jersy"))
            .await
            .unwrap();

        let p = profiles::get(&pool, "g1", "alice").await.unwrap();
        assert_eq!(p.country.as_deref(), Some("United States"));
        assert_eq!(p.subdivision.as_deref(), Some("New Jersey"));
        assert_eq!(p.latitude, None);
        assert_eq!(p.longitude, None);
    }

    #[tokio::test]
    async fn unresolved_country_persists_nulls_and_skips_the_rest() {
        let pool = db::test_pool().await;
        let geo = Geography::builtin().unwrap();
        create(&pool, seed("alice")).await.unwrap();

        // pre-existing values get overwritten with the degraded result
        profiles::set_location(&pool, "g1", "alice", Some("Germany"), None, Some(1.0), Some(2.0))
            .await
            .unwrap();

        process(&pool, &geo, &StubGeocoder(Some((0.0, 0.0))), &payload("zzxqvk", "NJ"))
            .await
            .unwrap();

        let p = profiles::get(&pool, "g1", "alice").await.unwrap();
        assert_eq!(p.country, None);
        assert_eq!(p.subdivision, None);
        assert_eq!(p.latitude, None);
        assert_eq!(p.longitude, None);
    }

    #[tokio::test]
    async fn malformed_payload_is_dropped_without_error() {
        let pool = db::test_pool().await;
        let geo = Geography::builtin().unwrap();

        process(&pool, &geo, &StubGeocoder(None), "{not json")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn vanished_profile_is_dropped_without_error() {
        let pool = db::test_pool().await;
        let geo = Geography::builtin().unwrap();

        process(&pool, &geo, &StubGeocoder(None), &payload("US", ""))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn redelivery_is_idempotent() {
        let pool = db::test_pool().await;
        let geo = Geography::builtin().unwrap();
        create(&pool, seed("alice")).await.unwrap();

        let stub = StubGeocoder(Some((40.2, -74.7)));
        process(&pool, &geo, &stub, &payload("US", "NJ")).await.unwrap();
        let first = profiles::get(&pool, "g1", "alice").await.unwrap();

        process(&pool, &geo, &stub, &payload("US", "NJ")).await.unwrap();
        let second = profiles::get(&pool, "g1", "alice").await.unwrap();

        assert_eq!(first.country, second.country);
        assert_eq!(first.subdivision, second.subdivision);
        assert_eq!(first.latitude, second.latitude);
        assert_eq!(first.longitude, second.longitude);
    }
}
