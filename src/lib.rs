pub mod db;
pub mod error;
pub mod location;
pub mod matching;
pub mod profiles;
pub mod queue;

pub use error::{AppError, AppResult};
pub use matching::SwipeOutcome;
pub use profiles::{Gender, LocationPreference, LookingFor, Profile};

/// Embed a file from `res/` at compile time.
#[macro_export]
macro_rules! include_res {
    (bytes, $p:expr) => {
        include_bytes!(concat!(env!("CARGO_MANIFEST_DIR"), "/res/", $p))
    };
    (str, $p:expr) => {
        include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/res/", $p))
    };
}
