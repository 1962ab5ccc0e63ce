//! Surface driver capability trait

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::DriverError;
use crate::query::Query;

/// Flat key-value storage snapshot (localStorage of one origin)
pub type StorageMap = BTreeMap<String, String>;

/// Web origin of `url` (`scheme://host[:port]`), used to key storage.
///
/// Unparsable input is returned unchanged.
pub fn origin_of(url: &str) -> String {
    match url::Url::parse(url) {
        Ok(parsed) => parsed.origin().ascii_serialization(),
        Err(_) => url.to_string(),
    }
}

/// Browser cookie as kept between runs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionCookie {
    pub name: String,
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default)]
    pub secure: bool,
    #[serde(default)]
    pub http_only: bool,
}

impl SessionCookie {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            domain: None,
            path: None,
            secure: false,
            http_only: false,
        }
    }
}

/// Reference to a live element returned by [`SurfaceDriver::find_candidates`]
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ElementRef {
    /// Backend-specific handle
    pub handle: String,

    /// Lower-case tag name
    pub tag: String,

    /// Whether the element is currently rendered and visible
    pub visible: bool,
}

impl ElementRef {
    pub fn new(handle: impl Into<String>, tag: impl Into<String>, visible: bool) -> Self {
        Self {
            handle: handle.into(),
            tag: tag.into(),
            visible,
        }
    }
}

/// Keys the engine knows how to press
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Key {
    Enter,
    Tab,
    Escape,
    Space,
}

impl Key {
    /// Parse a key name, case-insensitively
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "enter" | "return" => Some(Key::Enter),
            "tab" => Some(Key::Tab),
            "escape" | "esc" => Some(Key::Escape),
            "space" => Some(Key::Space),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Key::Enter => "Enter",
            Key::Tab => "Tab",
            Key::Escape => "Escape",
            Key::Space => "Space",
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Narrow capability interface over a live UI surface.
///
/// Implementations use interior mutability; the engine drives one surface
/// from a single task and awaits every call before issuing the next.
#[async_trait]
pub trait SurfaceDriver: Send + Sync {
    /// Load `url`, failing with [`DriverError::Timeout`] past `timeout`
    async fn navigate(&self, url: &str, timeout: Duration) -> Result<(), DriverError>;

    /// All elements matching `query`, in document order
    async fn find_candidates(&self, query: &Query) -> Result<Vec<ElementRef>, DriverError>;

    async fn click(&self, element: &ElementRef, timeout: Duration) -> Result<(), DriverError>;

    /// Replace the element's value with `text`
    async fn fill(&self, element: &ElementRef, text: &str) -> Result<(), DriverError>;

    async fn focus(&self, element: &ElementRef) -> Result<(), DriverError>;

    async fn hover(&self, element: &ElementRef) -> Result<(), DriverError>;

    /// Dispatch a key press to the focused element
    async fn press_key(&self, key: Key) -> Result<(), DriverError>;

    async fn wait_millis(&self, millis: u64) -> Result<(), DriverError>;

    /// Write a PNG screenshot to `path`; `false` when none could be taken
    async fn screenshot(&self, path: &Path) -> bool;

    /// Serialized document markup
    async fn read_text(&self) -> Result<String, DriverError>;

    async fn current_url(&self) -> Result<String, DriverError>;

    async fn title(&self) -> Result<String, DriverError>;

    async fn read_local_storage(&self) -> Result<StorageMap, DriverError>;

    async fn write_local_storage(&self, entries: &StorageMap) -> Result<(), DriverError>;

    /// Cookies visible to the current page
    async fn read_cookies(&self) -> Result<Vec<SessionCookie>, DriverError>;

    /// Set `cookies` on the current page, replacing same-named ones
    async fn write_cookies(&self, cookies: &[SessionCookie]) -> Result<(), DriverError>;

    /// Release the underlying session
    async fn close(&self) -> Result<(), DriverError> {
        Ok(())
    }
}
