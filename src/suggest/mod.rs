//! Type-ahead suggestions from a local dataset.
//!
//! - `matcher`: the pure `suggest` function plus built-in matchers/formatters
//! - `engine`: debounce, focus/blur grace, keyboard highlight and selection
//! - `anchor`: overlay placement relative to the input

pub mod anchor;
pub mod engine;
pub mod matcher;

pub use anchor::{Bounds, Placement, Side, Viewport, place_overlay};
pub use engine::{Ranking, SuggestConfig, SuggestTimer, Suggestion, SuggestionEngine, SuggestionSet};
pub use matcher::{FuzzyRanker, Searchable, contains_any, first_matching_field, normalize_query, suggest};
