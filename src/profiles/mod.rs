pub(crate) mod store;

use serde::{Deserialize, Serialize};

pub use store::{
    create, delete, get, set_location, try_get, update, NewProfile, ProfileUpdate,
};

/// Closed set of genders. The canonical text form is what goes into the
/// store; `FromStr` also accepts the spelling variants that leaked into
/// older data ("NonBinary" vs "Non-Binary").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Gender {
    Male,
    Female,
    Trans,
    #[serde(rename = "Non-Binary", alias = "NonBinary")]
    NonBinary,
}

impl std::fmt::Display for Gender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Gender::Male => "Male",
            Gender::Female => "Female",
            Gender::Trans => "Trans",
            Gender::NonBinary => "Non-Binary",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for Gender {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "male" => Ok(Gender::Male),
            "female" => Ok(Gender::Female),
            "trans" => Ok(Gender::Trans),
            "non-binary" | "nonbinary" | "non binary" => Ok(Gender::NonBinary),
            _ => Err(format!("invalid gender: {s}")),
        }
    }
}

/// What a profile is in the pool for. Cross-category suggestions are never
/// made; this is an exact-match filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LookingFor {
    Dating,
    Friends,
    #[serde(rename = "Prom Night", alias = "PromNight")]
    PromNight,
}

impl std::fmt::Display for LookingFor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            LookingFor::Dating => "Dating",
            LookingFor::Friends => "Friends",
            LookingFor::PromNight => "Prom Night",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for LookingFor {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "dating" => Ok(LookingFor::Dating),
            "friends" => Ok(LookingFor::Friends),
            "prom night" | "promnight" => Ok(LookingFor::PromNight),
            _ => Err(format!("invalid looking_for: {s}")),
        }
    }
}

/// How far afield a profile is willing to match. `Nearby` means within
/// [`NEARBY_KM`] great-circle kilometers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum LocationPreference {
    #[default]
    Anywhere,
    #[serde(rename = "Same Subdivision")]
    SameSubdivision,
    Nearby,
    #[serde(rename = "Same Country")]
    SameCountry,
    #[serde(rename = "Same Continent")]
    SameContinent,
}

/// Distance threshold for [`LocationPreference::Nearby`].
pub const NEARBY_KM: f64 = 500.0;

impl std::fmt::Display for LocationPreference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            LocationPreference::Anywhere => "Anywhere",
            LocationPreference::SameSubdivision => "Same Subdivision",
            LocationPreference::Nearby => "Nearby",
            LocationPreference::SameCountry => "Same Country",
            LocationPreference::SameContinent => "Same Continent",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for LocationPreference {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "anywhere" => Ok(LocationPreference::Anywhere),
            "same subdivision" | "samesubdivision" => Ok(LocationPreference::SameSubdivision),
            "nearby" => Ok(LocationPreference::Nearby),
            "same country" | "samecountry" => Ok(LocationPreference::SameCountry),
            "same continent" | "samecontinent" => Ok(LocationPreference::SameContinent),
            _ => Err(format!("invalid location preference: {s}")),
        }
    }
}

/// One profile per (user_id, guild_id) pair.
///
/// `matched_with` is either null on both sides of a pair or mutually
/// symmetric; the match coordinator is the only writer that sets it and the
/// store's delete path is the only other writer that clears it.
#[derive(Debug, Clone, PartialEq)]
pub struct Profile {
    pub user_id: String,
    pub guild_id: String,
    pub age: i64,
    pub gender: Gender,
    pub attracted_genders: Vec<Gender>,
    pub bio: String,
    pub looking_for: LookingFor,
    pub preferred_min_age: i64,
    pub preferred_max_age: i64,
    pub matched_with: Option<String>,
    pub location_pref: LocationPreference,
    pub country: Option<String>,
    pub subdivision: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl Profile {
    pub fn is_matched(&self) -> bool {
        self.matched_with.is_some()
    }

    /// Both attraction directions must hold for a pair to be shown.
    pub fn attraction_is_mutual(&self, other: &Profile) -> bool {
        self.attracted_genders.contains(&other.gender)
            && other.attracted_genders.contains(&self.gender)
    }

    /// Both stated age ranges must admit the other side.
    pub fn ages_are_compatible(&self, other: &Profile) -> bool {
        other.age >= self.preferred_min_age
            && other.age <= self.preferred_max_age
            && self.age >= other.preferred_min_age
            && self.age <= other.preferred_max_age
    }
}
