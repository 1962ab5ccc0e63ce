//! Core types for locator system

use std::fmt;

use serde::{Deserialize, Serialize};
use surface_driver::{ElementRef, Query};

/// Candidate lookup tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocatorTier {
    /// Target used verbatim as a CSS selector
    LiteralSelector,

    /// Attribute substring match (aria-label, name, title, ...)
    AttributeContains,

    Placeholder,

    Label,

    /// ARIA role plus accessible name
    RoleName,

    VisibleText,

    /// Configured keyword rules
    KeywordTable,

    /// First visible text field on the page
    FirstGenericInput,
}

impl LocatorTier {
    /// Get tier name as string
    pub fn name(&self) -> &'static str {
        match self {
            LocatorTier::LiteralSelector => "literal-selector",
            LocatorTier::AttributeContains => "attribute-contains",
            LocatorTier::Placeholder => "placeholder",
            LocatorTier::Label => "label",
            LocatorTier::RoleName => "role-name",
            LocatorTier::VisibleText => "visible-text",
            LocatorTier::KeywordTable => "keyword-table",
            LocatorTier::FirstGenericInput => "first-generic-input",
        }
    }
}

impl fmt::Display for LocatorTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Kind of element an action needs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateKind {
    Clickable,
    Fillable,
}

impl CandidateKind {
    /// Tiers in fallback order
    pub fn fallback_chain(&self) -> &'static [LocatorTier] {
        match self {
            CandidateKind::Clickable => &[
                LocatorTier::LiteralSelector,
                LocatorTier::AttributeContains,
                LocatorTier::RoleName,
                LocatorTier::VisibleText,
                LocatorTier::KeywordTable,
            ],
            CandidateKind::Fillable => &[
                LocatorTier::LiteralSelector,
                LocatorTier::AttributeContains,
                LocatorTier::Placeholder,
                LocatorTier::Label,
                LocatorTier::RoleName,
                LocatorTier::FirstGenericInput,
            ],
        }
    }
}

impl fmt::Display for CandidateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CandidateKind::Clickable => f.write_str("clickable"),
            CandidateKind::Fillable => f.write_str("fillable"),
        }
    }
}

/// Lookup attempt produced for one tier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub tier: LocatorTier,
    pub query: Query,
}

impl Candidate {
    pub fn new(tier: LocatorTier, query: Query) -> Self {
        Self { tier, query }
    }
}

/// Element resolution result
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// Resolved element
    pub element: ElementRef,

    /// Tier that produced the match
    pub tier: LocatorTier,

    /// Query that matched
    pub query: Query,
}
