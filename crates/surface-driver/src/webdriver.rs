//! WebDriver backend built on fantoccini
//!
//! Candidate lookup runs a resolver script in the page that evaluates a
//! serialized [`Query`], tags every match with a `data-softlight-ref`
//! attribute and reports `{ref, visible, tag}`. Later interactions locate the
//! element again through that attribute, so a ref whose node left the DOM
//! surfaces as [`DriverError::StaleElement`]. The tags are stripped from the
//! markup returned by `read_text`, so fingerprints stay stable across runs.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use fantoccini::actions::{InputSource, MouseActions, PointerAction};
use fantoccini::cookies::Cookie;
use fantoccini::elements::Element;
use fantoccini::error::CmdError;
use fantoccini::key::Key as WdKey;
use fantoccini::{Client, ClientBuilder, Locator};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::driver::{ElementRef, Key, SessionCookie, StorageMap, SurfaceDriver};
use crate::errors::DriverError;
use crate::query::Query;

const REF_ATTRIBUTE: &str = "data-softlight-ref";

const RESOLVER_SCRIPT: &str = r#"
const query = arguments[0];
const SKIP = new Set(['HTML', 'HEAD', 'SCRIPT', 'STYLE', 'NOSCRIPT', 'TEMPLATE']);
window.__softlightRun = window.__softlightRun || Math.random().toString(36).slice(2, 8);
window.__softlightSeq = window.__softlightSeq || 0;
const norm = s => (s || '').replace(/\s+/g, ' ').trim();
const ci = (hay, needle) => {
  const n = norm(needle).toLowerCase();
  return n.length > 0 && norm(hay).toLowerCase().includes(n);
};
const all = () => Array.from(document.querySelectorAll('body *'));
const textOf = el => norm(el.textContent);
const visible = el => {
  if (!el.isConnected) return false;
  const style = window.getComputedStyle(el);
  if (style.display === 'none' || style.visibility === 'hidden') return false;
  const rect = el.getBoundingClientRect();
  return rect.width > 0 && rect.height > 0;
};
const labelsOf = el => {
  const out = [];
  const aria = el.getAttribute('aria-label');
  if (aria) out.push(aria);
  if (el.labels) for (const label of el.labels) out.push(label.textContent);
  const by = el.getAttribute('aria-labelledby');
  if (by) for (const id of by.split(/\s+/)) {
    const target = document.getElementById(id);
    if (target) out.push(target.textContent);
  }
  return out;
};
const implicitRole = el => {
  const explicit = el.getAttribute('role');
  if (explicit) return explicit;
  const type = (el.getAttribute('type') || 'text').toLowerCase();
  switch (el.tagName) {
    case 'BUTTON': return 'button';
    case 'A': return 'link';
    case 'TEXTAREA': return 'textbox';
    case 'SELECT': return 'combobox';
    case 'LI': return 'listitem';
    case 'INPUT':
      if (['submit', 'button', 'reset'].includes(type)) return 'button';
      if (type === 'checkbox' || type === 'radio') return type;
      if (type === 'hidden') return null;
      return 'textbox';
    default: return null;
  }
};
const accessibleName = el => {
  const labels = labelsOf(el);
  if (labels.length) return labels[0];
  const text = textOf(el);
  if (text) return text;
  return el.getAttribute('value') || el.getAttribute('placeholder') || el.getAttribute('title') || '';
};
const innermost = els => els.filter(el => !els.some(other => other !== el && el.contains(other)));
const resolve = q => {
  switch (q.type) {
    case 'css': return Array.from(document.querySelectorAll(q.selector));
    case 'placeholder': return all().filter(el => ci(el.getAttribute('placeholder'), q.text));
    case 'label': return all().filter(el => el.tagName !== 'LABEL' && labelsOf(el).some(l => ci(l, q.text)));
    case 'role': return all().filter(el =>
      (implicitRole(el) || '').toLowerCase() === q.role.toLowerCase() && ci(accessibleName(el), q.name));
    case 'text': {
      const want = norm(q.text);
      return innermost(all().filter(el => !SKIP.has(el.tagName) &&
        (q.exact ? textOf(el) === want : ci(textOf(el), want))));
    }
    case 'text_within': return Array.from(document.querySelectorAll(q.css)).filter(el => ci(textOf(el), q.text));
    case 'has': {
      const nested = resolve(q.inner);
      return Array.from(document.querySelectorAll(q.css))
        .filter(el => nested.some(found => found !== el && el.contains(found)));
    }
    case 'descendant': {
      const scope = resolve(q.container)[0];
      return scope ? Array.from(scope.querySelectorAll(q.inner)) : [];
    }
    default: throw new Error('unsupported query ' + q.type);
  }
};
return resolve(query).map(el => {
  let ref = el.getAttribute('data-softlight-ref');
  if (!ref) {
    window.__softlightSeq += 1;
    ref = window.__softlightRun + '-' + window.__softlightSeq;
    el.setAttribute('data-softlight-ref', ref);
  }
  return { ref: ref, visible: visible(el), tag: el.tagName.toLowerCase() };
});
"#;

const READ_STORAGE_SCRIPT: &str = r#"
const out = {};
for (let i = 0; i < window.localStorage.length; i++) {
  const key = window.localStorage.key(i);
  out[key] = window.localStorage.getItem(key);
}
return out;
"#;

const WRITE_STORAGE_SCRIPT: &str = r#"
const entries = arguments[0];
for (const key of Object.keys(entries)) window.localStorage.setItem(key, entries[key]);
return null;
"#;

/// Connection settings for a WebDriver endpoint (chromedriver, geckodriver)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WebDriverConfig {
    pub webdriver_url: String,
    /// `chrome` or `firefox`
    pub browser: String,
    pub headless: bool,
    pub window_width: u32,
    pub window_height: u32,
}

impl Default for WebDriverConfig {
    fn default() -> Self {
        Self {
            webdriver_url: "http://localhost:9515".to_string(),
            browser: "chrome".to_string(),
            headless: true,
            window_width: 1280,
            window_height: 800,
        }
    }
}

impl WebDriverConfig {
    fn capabilities(&self) -> Map<String, Value> {
        let mut capabilities = Map::new();
        let size = format!("--window-size={},{}", self.window_width, self.window_height);
        if self.browser.eq_ignore_ascii_case("firefox") {
            let mut args = Vec::new();
            if self.headless {
                args.push(Value::String("-headless".to_string()));
            }
            let mut options = Map::new();
            options.insert("args".to_string(), Value::Array(args));
            capabilities.insert("browserName".to_string(), Value::String("firefox".into()));
            capabilities.insert("moz:firefoxOptions".to_string(), Value::Object(options));
        } else {
            let mut args = vec![Value::String(size)];
            if self.headless {
                args.push(Value::String("--headless=new".to_string()));
                args.push(Value::String("--disable-gpu".to_string()));
            }
            let mut options = Map::new();
            options.insert("args".to_string(), Value::Array(args));
            capabilities.insert("browserName".to_string(), Value::String("chrome".into()));
            capabilities.insert("goog:chromeOptions".to_string(), Value::Object(options));
        }
        capabilities
    }
}

#[derive(Debug, Deserialize)]
struct ResolvedMatch {
    #[serde(rename = "ref")]
    handle: String,
    visible: bool,
    tag: String,
}

/// [`SurfaceDriver`] over a live WebDriver session
pub struct WebDriverSurface {
    client: Client,
}

impl WebDriverSurface {
    pub async fn connect(config: &WebDriverConfig) -> Result<Self, DriverError> {
        let mut builder = ClientBuilder::rustls()
            .map_err(|err| DriverError::Protocol(format!("rustls connector: {err}")))?;
        builder.capabilities(config.capabilities());
        let client = builder.connect(&config.webdriver_url).await.map_err(|err| {
            DriverError::Protocol(format!(
                "failed to connect to WebDriver at {}: {err}",
                config.webdriver_url
            ))
        })?;
        if let Err(err) = client
            .set_window_size(config.window_width, config.window_height)
            .await
        {
            warn!(error = %err, "could not resize browser window");
        }
        info!(url = %config.webdriver_url, browser = %config.browser, "webdriver session started");
        Ok(Self { client })
    }

    fn ref_selector(handle: &str) -> String {
        format!("[{REF_ATTRIBUTE}='{handle}']")
    }

    async fn element(&self, element: &ElementRef) -> Result<Element, DriverError> {
        self.client
            .find(Locator::Css(&Self::ref_selector(&element.handle)))
            .await
            .map_err(|_| DriverError::StaleElement(element.handle.clone()))
    }

    async fn run_on_ref(&self, element: &ElementRef, body: &str) -> Result<(), DriverError> {
        let script = format!(
            "const el = document.querySelector(arguments[0]); if (!el) return false; {body} return true;"
        );
        let found = self
            .client
            .execute(&script, vec![Value::String(Self::ref_selector(&element.handle))])
            .await
            .map_err(|err| classify("script", err))?;
        if found.as_bool() == Some(true) {
            Ok(())
        } else {
            Err(DriverError::StaleElement(element.handle.clone()))
        }
    }
}

fn classify(operation: &str, err: CmdError) -> DriverError {
    let message = err.to_string();
    let lowered = message.to_lowercase();
    if lowered.contains("stale element") || lowered.contains("no such element") {
        DriverError::StaleElement(message)
    } else if lowered.contains("not interactable") || lowered.contains("intercepted") {
        DriverError::Interaction(message)
    } else {
        DriverError::Protocol(format!("{operation}: {message}"))
    }
}

/// Page markup without the lookup tags written by the resolver script
fn strip_ref_attributes(markup: &str) -> String {
    let needle = format!(" {REF_ATTRIBUTE}=");
    let mut out = String::with_capacity(markup.len());
    let mut rest = markup;
    while let Some(start) = rest.find(&needle) {
        out.push_str(&rest[..start]);
        let value = &rest[start + needle.len()..];
        let skip = match value.chars().next() {
            Some(quote @ ('"' | '\'')) => value[1..].find(quote).map(|end| end + 2),
            _ => value.find(|c: char| c.is_whitespace() || c == '>'),
        };
        let Some(skip) = skip else {
            out.push_str(&rest[start..]);
            return out;
        };
        rest = &value[skip..];
    }
    out.push_str(rest);
    out
}

fn to_session_cookie(cookie: &Cookie<'_>) -> SessionCookie {
    SessionCookie {
        name: cookie.name().to_string(),
        value: cookie.value().to_string(),
        domain: cookie.domain().map(str::to_string),
        path: cookie.path().map(str::to_string),
        secure: cookie.secure().unwrap_or(false),
        http_only: cookie.http_only().unwrap_or(false),
    }
}

fn to_wd_cookie(cookie: &SessionCookie) -> Cookie<'static> {
    let mut wd = Cookie::new(cookie.name.clone(), cookie.value.clone());
    if let Some(domain) = &cookie.domain {
        wd.set_domain(domain.clone());
    }
    if let Some(path) = &cookie.path {
        wd.set_path(path.clone());
    }
    wd.set_secure(cookie.secure);
    wd.set_http_only(cookie.http_only);
    wd
}

fn wd_key(key: Key) -> WdKey {
    match key {
        Key::Enter => WdKey::Enter,
        Key::Tab => WdKey::Tab,
        Key::Escape => WdKey::Escape,
        Key::Space => WdKey::Space,
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

#[async_trait]
impl SurfaceDriver for WebDriverSurface {
    async fn navigate(&self, url: &str, timeout: Duration) -> Result<(), DriverError> {
        match tokio::time::timeout(timeout, self.client.goto(url)).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(err)) => Err(DriverError::Navigation(format!("{url}: {err}"))),
            Err(_) => Err(DriverError::timeout("navigate", millis(timeout))),
        }
    }

    async fn find_candidates(&self, query: &Query) -> Result<Vec<ElementRef>, DriverError> {
        let argument = serde_json::to_value(query)
            .map_err(|err| DriverError::Protocol(format!("encode query: {err}")))?;
        let raw = self
            .client
            .execute(RESOLVER_SCRIPT, vec![argument])
            .await
            .map_err(|err| classify("resolve", err))?;
        let matches: Vec<ResolvedMatch> = serde_json::from_value(raw)
            .map_err(|err| DriverError::Protocol(format!("decode matches: {err}")))?;
        debug!(query = %query, count = matches.len(), "webdriver lookup");
        Ok(matches
            .into_iter()
            .map(|m| ElementRef::new(m.handle, m.tag, m.visible))
            .collect())
    }

    async fn click(&self, element: &ElementRef, timeout: Duration) -> Result<(), DriverError> {
        let target = self.element(element).await?;
        match tokio::time::timeout(timeout, target.click()).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(err)) => match classify("click", err) {
                DriverError::Interaction(reason) => {
                    debug!(handle = %element.handle, reason = %reason, "native click rejected, dispatching script click");
                    self.run_on_ref(element, "el.click();").await
                }
                other => Err(other),
            },
            Err(_) => Err(DriverError::timeout("click", millis(timeout))),
        }
    }

    async fn fill(&self, element: &ElementRef, text: &str) -> Result<(), DriverError> {
        let target = self.element(element).await?;
        target.clear().await.map_err(|err| classify("clear", err))?;
        target
            .send_keys(text)
            .await
            .map_err(|err| classify("fill", err))
    }

    async fn focus(&self, element: &ElementRef) -> Result<(), DriverError> {
        self.run_on_ref(element, "el.focus();").await
    }

    async fn hover(&self, element: &ElementRef) -> Result<(), DriverError> {
        let target = self.element(element).await?;
        let actions = MouseActions::new("mouse".to_string()).then(PointerAction::MoveToElement {
            element: target,
            duration: Some(Duration::from_millis(150)),
            x: 0.0,
            y: 0.0,
        });
        self.client
            .perform_actions(actions)
            .await
            .map_err(|err| classify("hover", err))?;
        if let Err(err) = self.client.release_actions().await {
            debug!(error = %err, "release actions after hover failed");
        }
        Ok(())
    }

    async fn press_key(&self, key: Key) -> Result<(), DriverError> {
        let keys = wd_key(key).to_string();
        let target = match self.client.active_element().await {
            Ok(element) => element,
            Err(_) => self
                .client
                .find(Locator::Css("body"))
                .await
                .map_err(|err| classify("press", err))?,
        };
        target
            .send_keys(&keys)
            .await
            .map_err(|err| classify("press", err))
    }

    async fn wait_millis(&self, millis: u64) -> Result<(), DriverError> {
        tokio::time::sleep(Duration::from_millis(millis)).await;
        Ok(())
    }

    async fn screenshot(&self, path: &Path) -> bool {
        let png = match self.client.screenshot().await {
            Ok(png) => png,
            Err(err) => {
                warn!(error = %err, "screenshot failed");
                return false;
            }
        };
        match tokio::fs::write(path, png).await {
            Ok(()) => true,
            Err(err) => {
                warn!(path = %path.display(), error = %err, "failed to write screenshot");
                false
            }
        }
    }

    async fn read_text(&self) -> Result<String, DriverError> {
        let markup = self
            .client
            .source()
            .await
            .map_err(|err| classify("source", err))?;
        Ok(strip_ref_attributes(&markup))
    }

    async fn current_url(&self) -> Result<String, DriverError> {
        self.client
            .current_url()
            .await
            .map(|url| url.to_string())
            .map_err(|err| classify("current_url", err))
    }

    async fn title(&self) -> Result<String, DriverError> {
        self.client
            .title()
            .await
            .map_err(|err| classify("title", err))
    }

    async fn read_local_storage(&self) -> Result<StorageMap, DriverError> {
        let raw = self
            .client
            .execute(READ_STORAGE_SCRIPT, vec![])
            .await
            .map_err(|err| classify("read storage", err))?;
        serde_json::from_value(raw)
            .map_err(|err| DriverError::Protocol(format!("decode storage: {err}")))
    }

    async fn write_local_storage(&self, entries: &StorageMap) -> Result<(), DriverError> {
        let argument = serde_json::to_value(entries)
            .map_err(|err| DriverError::Protocol(format!("encode storage: {err}")))?;
        self.client
            .execute(WRITE_STORAGE_SCRIPT, vec![argument])
            .await
            .map_err(|err| classify("write storage", err))?;
        Ok(())
    }

    async fn read_cookies(&self) -> Result<Vec<SessionCookie>, DriverError> {
        let cookies = self
            .client
            .get_all_cookies()
            .await
            .map_err(|err| classify("read cookies", err))?;
        Ok(cookies.iter().map(to_session_cookie).collect())
    }

    async fn write_cookies(&self, cookies: &[SessionCookie]) -> Result<(), DriverError> {
        for cookie in cookies {
            // One rejected cookie (domain mismatch) must not drop the rest.
            if let Err(err) = self.client.add_cookie(to_wd_cookie(cookie)).await {
                warn!(name = %cookie.name, error = %err, "browser rejected saved cookie");
            }
        }
        Ok(())
    }

    async fn close(&self) -> Result<(), DriverError> {
        self.client
            .clone()
            .close()
            .await
            .map_err(|err| classify("close", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chrome_capabilities_carry_headless_and_size() {
        let config = WebDriverConfig::default();
        let caps = config.capabilities();
        let args = caps["goog:chromeOptions"]["args"].as_array().unwrap();
        assert!(args.iter().any(|a| a == "--headless=new"));
        assert!(args.iter().any(|a| a == "--window-size=1280,800"));
    }

    #[test]
    fn firefox_capabilities_use_moz_options() {
        let config = WebDriverConfig {
            browser: "Firefox".into(),
            headless: false,
            ..WebDriverConfig::default()
        };
        let caps = config.capabilities();
        assert_eq!(caps["browserName"], "firefox");
        assert!(caps["moz:firefoxOptions"]["args"].as_array().unwrap().is_empty());
    }

    #[test]
    fn ref_selector_targets_tag_attribute() {
        assert_eq!(
            WebDriverSurface::ref_selector("ab12-3"),
            "[data-softlight-ref='ab12-3']"
        );
    }

    #[test]
    fn lookup_tags_are_stripped_from_markup() {
        let tagged = r#"<li data-softlight-ref="k3x9q1-4" class="todo"><button data-softlight-ref='k3x9q1-5'>x</button></li>"#;
        let other_run = r#"<li data-softlight-ref="zz01ab-1" class="todo"><button data-softlight-ref='zz01ab-2'>x</button></li>"#;
        let clean = r#"<li class="todo"><button>x</button></li>"#;
        assert_eq!(strip_ref_attributes(tagged), clean);
        assert_eq!(strip_ref_attributes(tagged), strip_ref_attributes(other_run));
        assert_eq!(strip_ref_attributes(clean), clean);
    }

    #[test]
    fn cookie_conversion_keeps_scope_and_flags() {
        let saved = SessionCookie {
            domain: Some("www.saucedemo.com".to_string()),
            path: Some("/".to_string()),
            secure: true,
            ..SessionCookie::new("session-username", "standard_user")
        };
        let wd = to_wd_cookie(&saved);
        assert_eq!(wd.name(), "session-username");
        assert_eq!(wd.domain(), Some("www.saucedemo.com"));
        assert_eq!(to_session_cookie(&wd), saved);
    }
}
