pub mod geocode;
pub mod geography;
pub mod worker;

use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

use crate::{queue, AppResult};

/// Queue payload produced by the profile-edit flow whenever the raw
/// location fields change. Field names are the wire schema; `raw_state`
/// is the free-text subdivision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationUpdate {
    pub user_id: String,
    pub guild_id: String,
    #[serde(default)]
    pub raw_country: String,
    #[serde(default)]
    pub raw_state: String,
}

/// Producer side: serialize and enqueue. Returns the message id.
pub async fn publish_update(pool: &SqlitePool, update: &LocationUpdate) -> AppResult<String> {
    queue::publish(pool, &serde_json::to_string(update)?).await
}
