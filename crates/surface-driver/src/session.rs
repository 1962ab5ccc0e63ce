//! Session persistence across runs
//!
//! Local storage and cookies are saved per app identity as JSON
//! (`<state_dir>/state_<app>.json`, keyed by origin) and replayed into the
//! browser the first time a run reaches each origin.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::driver::{origin_of, ElementRef, Key, SessionCookie, StorageMap, SurfaceDriver};
use crate::errors::DriverError;
use crate::query::Query;

/// Persisted storage for one app identity
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    /// localStorage per origin
    #[serde(default)]
    pub origins: BTreeMap<String, StorageMap>,

    #[serde(default)]
    pub cookies: BTreeMap<String, Vec<SessionCookie>>,
}

impl SessionSnapshot {
    pub fn is_empty(&self) -> bool {
        self.origins.values().all(|entries| entries.is_empty())
            && self.cookies.values().all(|jar| jar.is_empty())
    }

    pub fn entries_for(&self, origin: &str) -> Option<&StorageMap> {
        self.origins.get(origin).filter(|entries| !entries.is_empty())
    }

    pub fn cookies_for(&self, origin: &str) -> Option<&[SessionCookie]> {
        self.cookies
            .get(origin)
            .map(Vec::as_slice)
            .filter(|jar| !jar.is_empty())
    }
}

/// Directory of per-app session files
#[derive(Debug, Clone)]
pub struct SessionStore {
    dir: PathBuf,
}

impl SessionStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, app: &str) -> PathBuf {
        self.dir.join(format!("state_{app}.json"))
    }

    /// Load the snapshot for `app`; a missing or unreadable file yields an
    /// empty snapshot.
    pub async fn load(&self, app: &str) -> SessionSnapshot {
        let path = self.path_for(app);
        let raw = match tokio::fs::read(&path).await {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                debug!(app, path = %path.display(), "no saved session");
                return SessionSnapshot::default();
            }
            Err(err) => {
                warn!(app, path = %path.display(), error = %err, "failed to read session file");
                return SessionSnapshot::default();
            }
        };
        match serde_json::from_slice(&raw) {
            Ok(snapshot) => {
                info!(app, path = %path.display(), "loaded saved session");
                snapshot
            }
            Err(err) => {
                warn!(app, path = %path.display(), error = %err, "ignoring corrupt session file");
                SessionSnapshot::default()
            }
        }
    }

    /// Persist `snapshot` atomically (temp file + rename)
    pub async fn save(&self, app: &str, snapshot: &SessionSnapshot) -> Result<PathBuf, DriverError> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.path_for(app);
        let tmp = path.with_extension("json.tmp");
        let body = serde_json::to_vec_pretty(snapshot)
            .map_err(|err| DriverError::Io(format!("encode session: {err}")))?;
        tokio::fs::write(&tmp, body).await?;
        tokio::fs::rename(&tmp, &path).await?;
        info!(app, path = %path.display(), "saved session");
        Ok(path)
    }
}

/// Decorator that replays saved storage and cookies on first contact with an
/// origin
pub struct SessionAwareDriver {
    inner: Arc<dyn SurfaceDriver>,
    snapshot: Mutex<SessionSnapshot>,
    restored: Mutex<BTreeSet<String>>,
}

impl SessionAwareDriver {
    pub fn new(inner: Arc<dyn SurfaceDriver>, snapshot: SessionSnapshot) -> Self {
        Self {
            inner,
            snapshot: Mutex::new(snapshot),
            restored: Mutex::new(BTreeSet::new()),
        }
    }

    /// Read the current origin's storage and cookies back into the snapshot
    /// and return it
    pub async fn capture_session(&self) -> Result<SessionSnapshot, DriverError> {
        self.remember_current_origin().await?;
        Ok(self.snapshot.lock().clone())
    }

    async fn remember_current_origin(&self) -> Result<(), DriverError> {
        let url = self.inner.current_url().await?;
        if !url.starts_with("http") {
            return Ok(());
        }
        let entries = self.inner.read_local_storage().await?;
        let cookies = self.inner.read_cookies().await?;
        let origin = origin_of(&url);
        debug!(
            origin = %origin,
            keys = entries.len(),
            cookies = cookies.len(),
            "captured session storage"
        );
        let mut snapshot = self.snapshot.lock();
        snapshot.origins.insert(origin.clone(), entries);
        snapshot.cookies.insert(origin, cookies);
        Ok(())
    }

    async fn restore_origin(&self, url: &str, timeout: Duration) -> Result<(), DriverError> {
        let current = self.inner.current_url().await?;
        let origin = origin_of(&current);
        if !self.restored.lock().insert(origin.clone()) {
            return Ok(());
        }
        let (entries, cookies) = {
            let snapshot = self.snapshot.lock();
            (
                snapshot.entries_for(&origin).cloned(),
                snapshot.cookies_for(&origin).map(<[SessionCookie]>::to_vec),
            )
        };
        if entries.is_none() && cookies.is_none() {
            return Ok(());
        }
        if let Some(entries) = &entries {
            self.inner.write_local_storage(entries).await?;
            info!(origin = %origin, keys = entries.len(), "restored session storage");
        }
        if let Some(cookies) = &cookies {
            self.inner.write_cookies(cookies).await?;
            info!(origin = %origin, cookies = cookies.len(), "restored session cookies");
        }
        // Reload so the page boots with the restored state.
        self.inner.navigate(url, timeout).await
    }
}

#[async_trait]
impl SurfaceDriver for SessionAwareDriver {
    async fn navigate(&self, url: &str, timeout: Duration) -> Result<(), DriverError> {
        if let Err(err) = self.remember_current_origin().await {
            debug!(error = %err, "could not capture storage before navigation");
        }
        let result = self.inner.navigate(url, timeout).await;
        match &result {
            Ok(()) => self.restore_origin(url, timeout).await?,
            Err(err) if err.is_timeout() => {
                if let Err(restore_err) = self.restore_origin(url, timeout).await {
                    debug!(error = %restore_err, "session restore after slow load failed");
                }
            }
            Err(_) => {}
        }
        result
    }

    async fn find_candidates(&self, query: &Query) -> Result<Vec<ElementRef>, DriverError> {
        self.inner.find_candidates(query).await
    }

    async fn click(&self, element: &ElementRef, timeout: Duration) -> Result<(), DriverError> {
        self.inner.click(element, timeout).await
    }

    async fn fill(&self, element: &ElementRef, text: &str) -> Result<(), DriverError> {
        self.inner.fill(element, text).await
    }

    async fn focus(&self, element: &ElementRef) -> Result<(), DriverError> {
        self.inner.focus(element).await
    }

    async fn hover(&self, element: &ElementRef) -> Result<(), DriverError> {
        self.inner.hover(element).await
    }

    async fn press_key(&self, key: Key) -> Result<(), DriverError> {
        self.inner.press_key(key).await
    }

    async fn wait_millis(&self, millis: u64) -> Result<(), DriverError> {
        self.inner.wait_millis(millis).await
    }

    async fn screenshot(&self, path: &Path) -> bool {
        self.inner.screenshot(path).await
    }

    async fn read_text(&self) -> Result<String, DriverError> {
        self.inner.read_text().await
    }

    async fn current_url(&self) -> Result<String, DriverError> {
        self.inner.current_url().await
    }

    async fn title(&self) -> Result<String, DriverError> {
        self.inner.title().await
    }

    async fn read_local_storage(&self) -> Result<StorageMap, DriverError> {
        self.inner.read_local_storage().await
    }

    async fn write_local_storage(&self, entries: &StorageMap) -> Result<(), DriverError> {
        self.inner.write_local_storage(entries).await
    }

    async fn read_cookies(&self) -> Result<Vec<SessionCookie>, DriverError> {
        self.inner.read_cookies().await
    }

    async fn write_cookies(&self, cookies: &[SessionCookie]) -> Result<(), DriverError> {
        self.inner.write_cookies(cookies).await
    }

    async fn close(&self) -> Result<(), DriverError> {
        self.inner.close().await
    }
}
