//! Geocoding boundary. The worker only ever needs "place name in, maybe
//! coordinates out"; failures and timeouts are the caller's business to
//! degrade on, so the trait keeps them as plain errors.

use std::time::Duration;

use serde::Deserialize;

use crate::{AppError, AppResult};

pub const DEFAULT_ENDPOINT: &str = "https://nominatim.openstreetmap.org";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

pub trait Geocoder {
    async fn geocode(&self, query: &str) -> anyhow::Result<Option<(f64, f64)>>;
}

/// Nominatim (OpenStreetMap) client with a bounded request timeout.
#[derive(Debug, Clone)]
pub struct Nominatim {
    client: reqwest::Client,
    endpoint: String,
}

#[derive(Deserialize)]
struct Place {
    lat: String,
    lon: String,
}

impl Nominatim {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> AppResult<Nominatim> {
        let client = reqwest::Client::builder()
            .user_agent("matchbook-location-worker")
            .timeout(timeout)
            .build()
            .map_err(|err| AppError::Config(format!("http client: {err}")))?;

        Ok(Nominatim {
            client,
            endpoint: endpoint.into(),
        })
    }
}

impl Geocoder for Nominatim {
    async fn geocode(&self, query: &str) -> anyhow::Result<Option<(f64, f64)>> {
        let places: Vec<Place> = self
            .client
            .get(format!("{}/search", self.endpoint))
            .query(&[("q", query), ("format", "json"), ("limit", "1")])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let Some(place) = places.into_iter().next() else {
            return Ok(None);
        };
        Ok(Some((place.lat.parse()?, place.lon.parse()?)))
    }
}
