//! L0 UI Surface Driver
//!
//! The execution engine only talks to the browser through the
//! [`SurfaceDriver`] trait defined here:
//! - navigation, clicking, filling and key presses
//! - candidate lookup through a tier-aware [`Query`]
//! - screenshots, serialized page text, URL and title for state capture
//! - local storage and cookie access for session persistence
//!
//! Two backends ship with the crate: [`memory::MemorySurface`], a scripted
//! in-memory document used by tests and dry runs, and (behind the
//! `webdriver` feature) [`webdriver::WebDriverSurface`] built on fantoccini.

mod css;
pub mod driver;
pub mod errors;
pub mod memory;
pub mod query;
pub mod session;
#[cfg(feature = "webdriver")]
pub mod webdriver;

pub use driver::{origin_of, ElementRef, Key, SessionCookie, StorageMap, SurfaceDriver};
pub use errors::DriverError;
pub use memory::{MemoryElement, MemorySurface, SurfaceEvent};
pub use query::Query;
pub use session::{SessionAwareDriver, SessionSnapshot, SessionStore};
#[cfg(feature = "webdriver")]
pub use webdriver::{WebDriverConfig, WebDriverSurface};
