use std::str::FromStr;

use sqlx::SqlitePool;
use tracing::info;

use crate::{AppError, AppResult};

use super::{Gender, LocationPreference, LookingFor, Profile};

pub(crate) const PROFILE_COLS: &str = "user_id, guild_id, age, gender, attracted_genders, \
     bio, looking_for, preferred_min_age, preferred_max_age, matched_with, location_pref, \
     country, subdivision, latitude, longitude";

/// Raw row as stored; enums and the attracted-set JSON are decoded in
/// `TryFrom` so canonicalization happens in exactly one place.
#[derive(sqlx::FromRow)]
pub(crate) struct ProfileRow {
    pub user_id: String,
    pub guild_id: String,
    pub age: i64,
    pub gender: String,
    pub attracted_genders: String,
    pub bio: String,
    pub looking_for: String,
    pub preferred_min_age: i64,
    pub preferred_max_age: i64,
    pub matched_with: Option<String>,
    pub location_pref: String,
    pub country: Option<String>,
    pub subdivision: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl TryFrom<ProfileRow> for Profile {
    type Error = AppError;

    fn try_from(row: ProfileRow) -> AppResult<Profile> {
        let gender = Gender::from_str(&row.gender).map_err(AppError::InvalidInput)?;
        let attracted_genders: Vec<Gender> = serde_json::from_str(&row.attracted_genders)?;
        let looking_for = LookingFor::from_str(&row.looking_for).map_err(AppError::InvalidInput)?;
        let location_pref =
            LocationPreference::from_str(&row.location_pref).map_err(AppError::InvalidInput)?;

        Ok(Profile {
            user_id: row.user_id,
            guild_id: row.guild_id,
            age: row.age,
            gender,
            attracted_genders,
            bio: row.bio,
            looking_for,
            preferred_min_age: row.preferred_min_age,
            preferred_max_age: row.preferred_max_age,
            matched_with: row.matched_with,
            location_pref,
            country: row.country,
            subdivision: row.subdivision,
            latitude: row.latitude,
            longitude: row.longitude,
        })
    }
}

#[derive(Debug, Clone)]
pub struct NewProfile {
    pub user_id: String,
    pub guild_id: String,
    pub age: i64,
    pub gender: Gender,
    pub attracted_genders: Vec<Gender>,
    pub bio: String,
    pub looking_for: LookingFor,
    pub preferred_min_age: i64,
    pub preferred_max_age: i64,
    pub location_pref: LocationPreference,
}

/// Partial edit; `None` leaves the field alone.
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub age: Option<i64>,
    pub gender: Option<Gender>,
    pub attracted_genders: Option<Vec<Gender>>,
    pub bio: Option<String>,
    pub looking_for: Option<LookingFor>,
    pub preferred_min_age: Option<i64>,
    pub preferred_max_age: Option<i64>,
    pub location_pref: Option<LocationPreference>,
}

fn validate(age: i64, min_age: i64, max_age: i64, attracted: &[Gender]) -> AppResult<()> {
    if age < 18 {
        return Err(AppError::invalid("age must be at least 18"));
    }
    if min_age < 18 {
        return Err(AppError::invalid("preferred minimum age must be at least 18"));
    }
    if min_age > max_age {
        return Err(AppError::invalid(
            "preferred minimum age must not exceed preferred maximum age",
        ));
    }
    if attracted.is_empty() {
        return Err(AppError::invalid("attracted genders must not be empty"));
    }
    Ok(())
}

pub async fn try_get(pool: &SqlitePool, guild_id: &str, user_id: &str) -> AppResult<Option<Profile>> {
    let row: Option<ProfileRow> = sqlx::query_as(&format!(
        "SELECT {PROFILE_COLS} FROM profiles WHERE guild_id=? AND user_id=?"
    ))
    .bind(guild_id)
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    row.map(Profile::try_from).transpose()
}

pub async fn get(pool: &SqlitePool, guild_id: &str, user_id: &str) -> AppResult<Profile> {
    try_get(pool, guild_id, user_id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("profile {user_id} in {guild_id}")))
}

/// Create a profile. Exactly one profile may exist per (user, guild).
pub async fn create(pool: &SqlitePool, new: NewProfile) -> AppResult<()> {
    validate(
        new.age,
        new.preferred_min_age,
        new.preferred_max_age,
        &new.attracted_genders,
    )?;

    if try_get(pool, &new.guild_id, &new.user_id).await?.is_some() {
        return Err(AppError::invalid(format!(
            "profile already exists for {} in {}",
            new.user_id, new.guild_id
        )));
    }

    sqlx::query(
        "INSERT INTO profiles (user_id, guild_id, age, gender, attracted_genders, bio, \
         looking_for, preferred_min_age, preferred_max_age, location_pref) \
         VALUES (?,?,?,?,?,?,?,?,?,?)",
    )
    .bind(&new.user_id)
    .bind(&new.guild_id)
    .bind(new.age)
    .bind(new.gender.to_string())
    .bind(serde_json::to_string(&new.attracted_genders)?)
    .bind(&new.bio)
    .bind(new.looking_for.to_string())
    .bind(new.preferred_min_age)
    .bind(new.preferred_max_age)
    .bind(new.location_pref.to_string())
    .execute(pool)
    .await?;

    info!(user_id = %new.user_id, guild_id = %new.guild_id, "profile created");
    Ok(())
}

pub async fn update(
    pool: &SqlitePool,
    guild_id: &str,
    user_id: &str,
    edit: ProfileUpdate,
) -> AppResult<()> {
    let current = get(pool, guild_id, user_id).await?;

    let age = edit.age.unwrap_or(current.age);
    let gender = edit.gender.unwrap_or(current.gender);
    let attracted = edit.attracted_genders.unwrap_or(current.attracted_genders);
    let bio = edit.bio.unwrap_or(current.bio);
    let looking_for = edit.looking_for.unwrap_or(current.looking_for);
    let min_age = edit.preferred_min_age.unwrap_or(current.preferred_min_age);
    let max_age = edit.preferred_max_age.unwrap_or(current.preferred_max_age);
    let location_pref = edit.location_pref.unwrap_or(current.location_pref);

    validate(age, min_age, max_age, &attracted)?;

    sqlx::query(
        "UPDATE profiles SET age=?, gender=?, attracted_genders=?, bio=?, looking_for=?, \
         preferred_min_age=?, preferred_max_age=?, location_pref=?, \
         updated_at=CURRENT_TIMESTAMP \
         WHERE guild_id=? AND user_id=?",
    )
    .bind(age)
    .bind(gender.to_string())
    .bind(serde_json::to_string(&attracted)?)
    .bind(&bio)
    .bind(looking_for.to_string())
    .bind(min_age)
    .bind(max_age)
    .bind(location_pref.to_string())
    .bind(guild_id)
    .bind(user_id)
    .execute(pool)
    .await?;

    Ok(())
}

/// Delete a profile and, in the same transaction, clear the partner's
/// match reference so nothing dangles. Swipe history is kept.
pub async fn delete(pool: &SqlitePool, guild_id: &str, user_id: &str) -> AppResult<()> {
    let mut tx = pool.begin().await?;

    let row: Option<(Option<String>,)> =
        sqlx::query_as("SELECT matched_with FROM profiles WHERE guild_id=? AND user_id=?")
            .bind(guild_id)
            .bind(user_id)
            .fetch_optional(&mut *tx)
            .await?;

    let Some((partner,)) = row else {
        return Err(AppError::not_found(format!("profile {user_id} in {guild_id}")));
    };

    sqlx::query("DELETE FROM profiles WHERE guild_id=? AND user_id=?")
        .bind(guild_id)
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

    if let Some(partner) = partner {
        sqlx::query(
            "UPDATE profiles SET matched_with=NULL, updated_at=CURRENT_TIMESTAMP \
             WHERE guild_id=? AND user_id=? AND matched_with=?",
        )
        .bind(guild_id)
        .bind(&partner)
        .bind(user_id)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    info!(user_id, guild_id, "profile deleted");
    Ok(())
}

/// Write normalized location attributes. Returns false when the profile no
/// longer exists (the worker logs and drops the message in that case).
pub async fn set_location(
    pool: &SqlitePool,
    guild_id: &str,
    user_id: &str,
    country: Option<&str>,
    subdivision: Option<&str>,
    latitude: Option<f64>,
    longitude: Option<f64>,
) -> AppResult<bool> {
    let result = sqlx::query(
        "UPDATE profiles SET country=?, subdivision=?, latitude=?, longitude=?, \
         updated_at=CURRENT_TIMESTAMP \
         WHERE guild_id=? AND user_id=?",
    )
    .bind(country)
    .bind(subdivision)
    .bind(latitude)
    .bind(longitude)
    .bind(guild_id)
    .bind(user_id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    fn new_profile(user_id: &str, guild_id: &str) -> NewProfile {
        NewProfile {
            user_id: user_id.to_owned(),
            guild_id: guild_id.to_owned(),
            age: 25,
            gender: Gender::Male,
            attracted_genders: vec![Gender::Female],
            bio: "hi".to_owned(),
            looking_for: LookingFor::Dating,
            preferred_min_age: 20,
            preferred_max_age: 30,
            location_pref: LocationPreference::Anywhere,
        }
    }

    #[tokio::test]
    async fn create_then_get_round_trips() {
        let pool = db::test_pool().await;
        create(&pool, new_profile("alice", "g1")).await.unwrap();

        let p = get(&pool, "g1", "alice").await.unwrap();
        assert_eq!(p.age, 25);
        assert_eq!(p.gender, Gender::Male);
        assert_eq!(p.attracted_genders, vec![Gender::Female]);
        assert_eq!(p.matched_with, None);
        assert_eq!(p.location_pref, LocationPreference::Anywhere);
        assert_eq!(p.country, None);
    }

    #[tokio::test]
    async fn duplicate_create_is_rejected() {
        let pool = db::test_pool().await;
        create(&pool, new_profile("alice", "g1")).await.unwrap();
        let err = create(&pool, new_profile("alice", "g1")).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));

        // same user in another guild is a distinct profile
        create(&pool, new_profile("alice", "g2")).await.unwrap();
    }

    #[tokio::test]
    async fn validation_rejects_bad_ranges() {
        let pool = db::test_pool().await;

        let mut minor = new_profile("kid", "g1");
        minor.age = 17;
        assert!(matches!(
            create(&pool, minor).await.unwrap_err(),
            AppError::InvalidInput(_)
        ));

        let mut inverted = new_profile("odd", "g1");
        inverted.preferred_min_age = 40;
        inverted.preferred_max_age = 20;
        assert!(matches!(
            create(&pool, inverted).await.unwrap_err(),
            AppError::InvalidInput(_)
        ));

        let mut empty = new_profile("none", "g1");
        empty.attracted_genders = vec![];
        assert!(matches!(
            create(&pool, empty).await.unwrap_err(),
            AppError::InvalidInput(_)
        ));
    }

    #[tokio::test]
    async fn update_applies_partial_edit() {
        let pool = db::test_pool().await;
        create(&pool, new_profile("alice", "g1")).await.unwrap();

        update(
            &pool,
            "g1",
            "alice",
            ProfileUpdate {
                age: Some(26),
                location_pref: Some(LocationPreference::SameCountry),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let p = get(&pool, "g1", "alice").await.unwrap();
        assert_eq!(p.age, 26);
        assert_eq!(p.location_pref, LocationPreference::SameCountry);
        // untouched fields survive
        assert_eq!(p.bio, "hi");
        assert_eq!(p.preferred_max_age, 30);
    }

    #[tokio::test]
    async fn delete_clears_partner_reference() {
        let pool = db::test_pool().await;
        create(&pool, new_profile("alice", "g1")).await.unwrap();
        create(&pool, new_profile("bob", "g1")).await.unwrap();

        sqlx::query("UPDATE profiles SET matched_with='bob' WHERE user_id='alice'")
            .execute(&pool)
            .await
            .unwrap();
        sqlx::query("UPDATE profiles SET matched_with='alice' WHERE user_id='bob'")
            .execute(&pool)
            .await
            .unwrap();

        delete(&pool, "g1", "alice").await.unwrap();

        assert!(try_get(&pool, "g1", "alice").await.unwrap().is_none());
        let bob = get(&pool, "g1", "bob").await.unwrap();
        assert_eq!(bob.matched_with, None);
    }

    #[tokio::test]
    async fn delete_missing_profile_is_not_found() {
        let pool = db::test_pool().await;
        assert!(matches!(
            delete(&pool, "g1", "ghost").await.unwrap_err(),
            AppError::NotFound(_)
        ));
    }

    #[tokio::test]
    async fn set_location_reports_missing_profile() {
        let pool = db::test_pool().await;
        create(&pool, new_profile("alice", "g1")).await.unwrap();

        let hit = set_location(
            &pool,
            "g1",
            "alice",
            Some("United States"),
            Some("New Jersey"),
            Some(40.0),
            Some(-74.5),
        )
        .await
        .unwrap();
        assert!(hit);

        let p = get(&pool, "g1", "alice").await.unwrap();
        assert_eq!(p.country.as_deref(), Some("United States"));
        assert_eq!(p.subdivision.as_deref(), Some("New Jersey"));
        assert_eq!(p.latitude, Some(40.0));

        let miss = set_location(&pool, "g1", "ghost", None, None, None, None)
            .await
            .unwrap();
        assert!(!miss);
    }
}
