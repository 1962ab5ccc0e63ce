//! Candidate lookup queries
//!
//! A [`Query`] names both the lookup tier and its argument, so a driver can
//! translate each tier into whatever its backend supports. Every backend must
//! return matches in document order.

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Query {
    /// CSS selector (selector lists allowed)
    Css { selector: String },

    /// Elements whose placeholder contains the text (case-insensitive)
    Placeholder { text: String },

    /// Form controls whose associated label or aria-label contains the text
    Label { text: String },

    /// Elements with the ARIA role whose accessible name contains `name`
    Role { role: String, name: String },

    /// Innermost elements whose visible text matches
    Text { text: String, exact: bool },

    /// Elements matching `css` whose text contains `text`
    TextWithin { css: String, text: String },

    /// Elements matching `css` that contain a match of `inner`
    Has { css: String, inner: Box<Query> },

    /// Elements matching `inner` inside the first match of `container`
    Descendant { container: Box<Query>, inner: String },
}

impl Query {
    pub fn css(selector: impl Into<String>) -> Self {
        Query::Css {
            selector: selector.into(),
        }
    }

    pub fn placeholder(text: impl Into<String>) -> Self {
        Query::Placeholder { text: text.into() }
    }

    pub fn label(text: impl Into<String>) -> Self {
        Query::Label { text: text.into() }
    }

    pub fn role(role: impl Into<String>, name: impl Into<String>) -> Self {
        Query::Role {
            role: role.into(),
            name: name.into(),
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        Query::Text {
            text: text.into(),
            exact: false,
        }
    }

    pub fn exact_text(text: impl Into<String>) -> Self {
        Query::Text {
            text: text.into(),
            exact: true,
        }
    }

    pub fn text_within(css: impl Into<String>, text: impl Into<String>) -> Self {
        Query::TextWithin {
            css: css.into(),
            text: text.into(),
        }
    }

    pub fn has(css: impl Into<String>, inner: Query) -> Self {
        Query::Has {
            css: css.into(),
            inner: Box::new(inner),
        }
    }

    pub fn descendant(container: Query, inner: impl Into<String>) -> Self {
        Query::Descendant {
            container: Box::new(container),
            inner: inner.into(),
        }
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Query::Css { selector } => write!(f, "css={selector}"),
            Query::Placeholder { text } => write!(f, "placeholder={text}"),
            Query::Label { text } => write!(f, "label={text}"),
            Query::Role { role, name } => write!(f, "role={role}[name*={name}]"),
            Query::Text { text, exact: true } => write!(f, "text=\"{text}\""),
            Query::Text { text, exact: false } => write!(f, "text*={text}"),
            Query::TextWithin { css, text } => write!(f, "{css}:has-text(\"{text}\")"),
            Query::Has { css, inner } => write!(f, "{css}:has({inner})"),
            Query::Descendant { container, inner } => write!(f, "{container} >> {inner}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_with_type_tag() {
        let query = Query::descendant(Query::text_within("li", "Buy milk"), "input.toggle");
        let json = serde_json::to_value(&query).unwrap();
        assert_eq!(json["type"], "descendant");
        assert_eq!(json["container"]["type"], "text_within");
        assert_eq!(json["inner"], "input.toggle");
    }

    #[test]
    fn display_is_readable() {
        assert_eq!(Query::css("#start").to_string(), "css=#start");
        assert_eq!(
            Query::text_within("button", "Add to cart").to_string(),
            "button:has-text(\"Add to cart\")"
        );
        assert_eq!(
            Query::has("li", Query::exact_text("Buy milk")).to_string(),
            "li:has(text=\"Buy milk\")"
        );
    }
}
