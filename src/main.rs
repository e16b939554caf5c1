use std::time::Duration;

use anyhow::Context;
use matchbook::location::geocode::{self, Nominatim};
use matchbook::location::geography::Geography;
use matchbook::location::worker;
use matchbook::db;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let database_url = dotenv::var("DATABASE_URL").context("DATABASE_URL not set")?;
    let endpoint =
        dotenv::var("GEOCODER_URL").unwrap_or_else(|_| geocode::DEFAULT_ENDPOINT.to_owned());
    let timeout = match dotenv::var("GEOCODER_TIMEOUT_SECS") {
        Ok(secs) => Duration::from_secs(secs.parse().context("GEOCODER_TIMEOUT_SECS")?),
        Err(_) => geocode::DEFAULT_TIMEOUT,
    };

    let pool = db::connect(&database_url).await?;
    let geography = Geography::builtin()?;
    let geocoder = Nominatim::new(endpoint, timeout)?;

    worker::run(pool, geography, geocoder).await?;
    Ok(())
}
