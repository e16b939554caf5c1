pub mod coordinator;
pub mod selector;
pub mod swipes;

pub use coordinator::{swipe, unmatch};
pub use selector::next_candidate;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwipeDirection {
    Left,
    Right,
}

/// What a right-swipe resolved to. `LostRace` means the reciprocal commit
/// found one side already matched with somebody else; the caller re-fetches
/// candidate state instead of reporting a match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SwipeOutcome {
    NoMatch,
    Matched(String),
    LostRace,
}
