//! Canonical geography reference data and free-text normalization.
//!
//! A closed country/subdivision table is embedded at build time; raw user
//! input is resolved against it with a direct code lookup when the input
//! looks like a code, and Jaro-Winkler fuzzy matching otherwise.

use serde::Deserialize;

use crate::{include_res, AppResult};

/// Acceptance threshold for fuzzy matches, on a 0-100 scale.
pub const FUZZY_ACCEPT: f64 = 80.0;

#[derive(Debug, Clone, Deserialize)]
pub struct Subdivision {
    /// Bare code suffix, e.g. "NJ" for US-NJ.
    pub code: String,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Country {
    /// ISO 3166-1 alpha-2.
    pub code: String,
    /// ISO 3166-1 alpha-3.
    pub code3: String,
    pub name: String,
    pub continent: String,
    #[serde(default)]
    pub subdivisions: Vec<Subdivision>,
}

#[derive(Debug, Clone)]
pub struct Geography {
    countries: Vec<Country>,
}

impl Geography {
    /// Load the embedded reference table.
    pub fn builtin() -> AppResult<Geography> {
        let countries: Vec<Country> = serde_json::from_str(include_res!(str, "countries.json"))?;
        Ok(Geography { countries })
    }

    pub fn by_code(&self, code: &str) -> Option<&Country> {
        self.countries
            .iter()
            .find(|c| c.code.eq_ignore_ascii_case(code) || c.code3.eq_ignore_ascii_case(code))
    }

    pub fn by_name(&self, name: &str) -> Option<&Country> {
        self.countries.iter().find(|c| c.name.eq_ignore_ascii_case(name))
    }

    pub fn continent_of(&self, country_name: &str) -> Option<&str> {
        self.by_name(country_name).map(|c| c.continent.as_str())
    }

    /// Resolve raw country text to a canonical country, or None.
    ///
    /// 2-3 character input is tried as an alpha-2/alpha-3 code first and
    /// falls through to fuzzy matching on a miss, mirroring how the closed
    /// table is meant to absorb both "US" and "United States".
    pub fn normalize_country(&self, raw: &str) -> Option<&Country> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }

        if (2..=3).contains(&raw.chars().count()) {
            if let Some(country) = self.by_code(raw) {
                return Some(country);
            }
        }

        let (best, score) = self
            .countries
            .iter()
            .map(|c| (c, similarity(raw, &c.name)))
            .max_by(|a, b| a.1.total_cmp(&b.1))?;

        (score >= FUZZY_ACCEPT).then_some(best)
    }

    /// Resolve raw subdivision text within an already-resolved country.
    /// Exact (case-insensitive) code-suffix match wins over fuzzy names.
    pub fn normalize_subdivision<'a>(
        &self,
        raw: &str,
        country: &'a Country,
    ) -> Option<&'a Subdivision> {
        let raw = raw.trim();
        if raw.is_empty() || country.subdivisions.is_empty() {
            return None;
        }

        if let Some(subdiv) = country
            .subdivisions
            .iter()
            .find(|s| s.code.eq_ignore_ascii_case(raw))
        {
            return Some(subdiv);
        }

        let (best, score) = country
            .subdivisions
            .iter()
            .map(|s| (s, similarity(raw, &s.name)))
            .max_by(|a, b| a.1.total_cmp(&b.1))?;

        (score >= FUZZY_ACCEPT).then_some(best)
    }
}

/// Jaro-Winkler similarity of the lowercased inputs, scaled to 0-100.
pub fn similarity(a: &str, b: &str) -> f64 {
    strsim::jaro_winkler(&a.trim().to_lowercase(), &b.trim().to_lowercase()) * 100.0
}

/// Great-circle distance in kilometers (haversine).
pub fn distance_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    const EARTH_RADIUS_KM: f64 = 6371.0;

    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let dphi = (lat2 - lat1).to_radians();
    let dlambda = (lon2 - lon1).to_radians();

    let a = (dphi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (dlambda / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * a.sqrt().atan2((1.0 - a).sqrt())
}
