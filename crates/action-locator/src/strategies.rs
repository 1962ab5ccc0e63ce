//! Per-tier query generation
//!
//! A target is either a literal CSS selector or free text. Selector targets
//! still feed the textual tiers through the keywords extracted from them
//! (`#start-button` searches for `start`).

use surface_driver::Query;

use crate::keywords::KeywordTable;
use crate::types::{Candidate, CandidateKind, LocatorTier};

const SELECTOR_TAGS: &[&str] = &[
    "input", "textarea", "button", "a", "select", "form", "div", "span", "li", "ul", "label",
    "img",
];

const CLICKABLE_HOSTS: &[&str] = &[
    "button",
    "a",
    "[role=\"button\"]",
    "input[type=\"submit\"]",
];
const CLICKABLE_ATTRIBUTES: &[&str] = &["aria-label", "name", "title", "value"];

const FILLABLE_HOSTS: &[&str] = &["input", "textarea"];
const FILLABLE_ATTRIBUTES: &[&str] = &["placeholder", "aria-label", "name"];

const CLICKABLE_ROLES: &[&str] = &["button", "link", "menuitem"];

/// Text fields that accept typing, hidden and button-like inputs excluded
pub const GENERIC_INPUT_SELECTOR: &str = "input:not([type=\"hidden\"]):not([type=\"submit\"]):not([type=\"button\"]):not([type=\"checkbox\"]):not([type=\"radio\"]), textarea";

/// Pseudo-class names that never describe the element itself
const PSEUDO_WORDS: &[&str] = &[
    "has", "text", "not", "nth", "child", "hover", "first", "last", "visible", "contains",
    "type", "of", "is", "where", "focus", "checked", "disabled", "enabled",
];

/// Parsed action target
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    raw: String,
    selector: Option<String>,
    literal: Option<Query>,
    terms: Vec<String>,
}

impl Target {
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim().to_string();
        if let Some(selector) = literal_selector(&raw) {
            // `tag:has-text("X")` is a text lookup scoped to `tag`, not CSS.
            if let Some((css, text)) = split_has_text(&selector) {
                let mut terms = extract_keywords_from_selector(&css);
                if !text.is_empty() {
                    terms.insert(0, text.clone());
                }
                return Self {
                    raw,
                    literal: Some(Query::text_within(css, text)),
                    selector: Some(selector),
                    terms,
                };
            }
            let terms = extract_keywords_from_selector(&selector);
            return Self {
                raw,
                literal: Some(Query::css(selector.clone())),
                selector: Some(selector),
                terms,
            };
        }
        let term = strip_quotes(&raw).to_string();
        let terms = if term.is_empty() { Vec::new() } else { vec![term] };
        Self {
            raw,
            selector: None,
            literal: None,
            terms,
        }
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Selector text when the target looks like CSS
    pub fn selector(&self) -> Option<&str> {
        self.selector.as_deref()
    }

    /// Query for the literal tier
    pub fn literal_query(&self) -> Option<&Query> {
        self.literal.as_ref()
    }

    /// Search terms for the textual tiers
    pub fn terms(&self) -> &[String] {
        &self.terms
    }
}

/// Queries to try for `tier`, in order
pub fn tier_candidates(
    tier: LocatorTier,
    kind: CandidateKind,
    target: &Target,
    keywords: &KeywordTable,
) -> Vec<Candidate> {
    let queries: Vec<Query> = match tier {
        LocatorTier::LiteralSelector => target.literal_query().cloned().into_iter().collect(),
        LocatorTier::AttributeContains => {
            let (hosts, attributes) = match kind {
                CandidateKind::Clickable => (CLICKABLE_HOSTS, CLICKABLE_ATTRIBUTES),
                CandidateKind::Fillable => (FILLABLE_HOSTS, FILLABLE_ATTRIBUTES),
            };
            target
                .terms()
                .iter()
                .map(|term| Query::css(attribute_selector(hosts, attributes, term)))
                .collect()
        }
        LocatorTier::Placeholder => target.terms().iter().map(Query::placeholder).collect(),
        LocatorTier::Label => target.terms().iter().map(Query::label).collect(),
        LocatorTier::RoleName => {
            let roles: &[&str] = match kind {
                CandidateKind::Clickable => CLICKABLE_ROLES,
                CandidateKind::Fillable => &["textbox"],
            };
            target
                .terms()
                .iter()
                .flat_map(|term| roles.iter().map(move |role| Query::role(*role, term.as_str())))
                .collect()
        }
        LocatorTier::VisibleText => target.terms().iter().map(Query::text).collect(),
        LocatorTier::KeywordTable => keywords.lookup(target.raw()).cloned().into_iter().collect(),
        LocatorTier::FirstGenericInput => vec![Query::css(GENERIC_INPUT_SELECTOR)],
    };
    queries
        .into_iter()
        .map(|query| Candidate::new(tier, query))
        .collect()
}

/// Full fallback plan for a target: every query in tier order
pub fn fallback_plan(target: &Target, kind: CandidateKind, keywords: &KeywordTable) -> Vec<Candidate> {
    kind.fallback_chain()
        .iter()
        .flat_map(|tier| tier_candidates(*tier, kind, target, keywords))
        .collect()
}

/// Whether `target` reads as a CSS selector
pub fn is_literal_selector(target: &str) -> bool {
    literal_selector(target.trim()).is_some()
}

fn literal_selector(target: &str) -> Option<String> {
    if let Some(rest) = target.strip_prefix("css=") {
        let rest = rest.trim();
        return (!rest.is_empty()).then(|| rest.to_string());
    }
    if target.starts_with(['#', '.', '[']) {
        return Some(target.to_string());
    }
    let lowered = target.to_ascii_lowercase();
    SELECTOR_TAGS.iter().find_map(|tag| {
        let rest = lowered.strip_prefix(*tag)?;
        let boundary = rest
            .chars()
            .next()
            .map_or(true, |c| matches!(c, '.' | '#' | '[' | ':') || c.is_whitespace());
        // A bare word followed by prose ("a cat") is text, not a selector.
        let prose = rest.starts_with(' ') && !looks_like_selector_tail(rest);
        (boundary && !prose).then(|| target.to_string())
    })
}

fn looks_like_selector_tail(rest: &str) -> bool {
    if rest.trim_start().starts_with(['#', '.', '[', '>']) {
        return true;
    }
    rest.split_whitespace().next().is_some_and(|word| {
        SELECTOR_TAGS
            .iter()
            .any(|tag| word.starts_with(*tag) && is_selector_word(word, tag))
    })
}

fn is_selector_word(word: &str, tag: &str) -> bool {
    word.len() == tag.len() || word[tag.len()..].starts_with(['.', '#', '[', ':'])
}

/// `css:has-text("text")` split into its scope and text
fn split_has_text(selector: &str) -> Option<(String, String)> {
    let start = selector.find(":has-text(")?;
    let argument = selector[start + ":has-text(".len()..].trim_end();
    let argument = argument.strip_suffix(')')?;
    let css = selector[..start].trim();
    let css = if css.is_empty() { "*" } else { css };
    Some((css.to_string(), strip_quotes(argument).to_string()))
}

/// Selector text with pseudo-class names removed (`a:hover` -> `a `)
fn strip_pseudo_classes(selector: &str) -> String {
    let mut out = String::with_capacity(selector.len());
    let mut chars = selector.chars().peekable();
    while let Some(c) = chars.next() {
        if c == ':' {
            while chars.peek() == Some(&':') {
                chars.next();
            }
            while chars
                .peek()
                .is_some_and(|next| next.is_ascii_alphanumeric() || *next == '-')
            {
                chars.next();
            }
            out.push(' ');
        } else {
            out.push(c);
        }
    }
    out
}

/// Keywords carried by a selector, skipping tag names, pseudo-classes and
/// short tokens
fn extract_keywords_from_selector(selector: &str) -> Vec<String> {
    let mut keywords = Vec::new();

    let cleaned = strip_pseudo_classes(selector)
        .replace(['#', '.', '>', '+', '~', '[', ']', '=', '"', '\'', '(', ')', ':', '*', '^', '$'], " ")
        .replace(['-', '_'], " ");

    for word in cleaned.split_whitespace() {
        let word = word.to_lowercase();
        if word.len() > 2
            && !is_html_tag(&word)
            && !PSEUDO_WORDS.contains(&word.as_str())
            && !keywords.contains(&word)
        {
            keywords.push(word);
        }
    }

    keywords
}

/// Check if string is a common HTML tag
fn is_html_tag(s: &str) -> bool {
    matches!(
        s,
        "div" | "span" | "button" | "input" | "a" | "p" | "h1" | "h2" | "h3" | "ul" | "li"
            | "form" | "textarea" | "select" | "label" | "img" | "nav"
    )
}

fn strip_quotes(text: &str) -> &str {
    text.trim()
        .trim_matches(|c: char| matches!(c, '"' | '\'' | '`'))
        .trim()
}

fn css_string(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

fn attribute_selector(hosts: &[&str], attributes: &[&str], term: &str) -> String {
    let escaped = css_string(term);
    hosts
        .iter()
        .flat_map(|host| {
            let escaped = &escaped;
            attributes
                .iter()
                .map(move |attribute| format!("{host}[{attribute}*=\"{escaped}\" i]"))
        })
        .collect::<Vec<_>>()
        .join(", ")
}
