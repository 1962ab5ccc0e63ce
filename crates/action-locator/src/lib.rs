//! Locator resolution - ordered fallback from an action target to an element
//!
//! This crate turns the free-form target of a plan step into a live element:
//! - literal CSS selectors first
//! - attribute, placeholder, label and ARIA role+name fallbacks
//! - visible text matching
//! - a configurable keyword table for clickable targets
//! - the first generic text field as the last resort for fillable targets
//!
//! The first tier with a visible match wins.

pub mod errors;
pub mod keywords;
pub mod resolver;
pub mod strategies;
pub mod types;

pub use errors::LocatorError;
pub use keywords::{normalize_target, KeywordRule, KeywordTable};
pub use resolver::{ElementResolver, TieredResolver};
pub use strategies::{is_literal_selector, Target, GENERIC_INPUT_SELECTOR};
pub use types::{Candidate, CandidateKind, LocatorTier, Resolution};
