//! Scripted in-memory surface
//!
//! `MemorySurface` holds a small element tree and answers every [`Query`]
//! tier the way a browser would (document order, innermost text matches,
//! ancestor-aware visibility). Tests script it with reactions such as
//! "clicking X reveals Y" and inject failures per element or URL. Every
//! driver call is appended to an event log.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::debug;

use crate::css::{Dom, SelectorList};
use crate::driver::{origin_of, ElementRef, Key, SessionCookie, StorageMap, SurfaceDriver};
use crate::errors::DriverError;
use crate::query::Query;

const HANDLE_PREFIX: &str = "mem-";

/// Element description used to populate a [`MemorySurface`]
#[derive(Debug, Clone)]
pub struct MemoryElement {
    tag: String,
    id: Option<String>,
    classes: Vec<String>,
    attributes: BTreeMap<String, String>,
    text: String,
    visible: bool,
    label: Option<String>,
    role: Option<String>,
}

impl MemoryElement {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into().to_ascii_lowercase(),
            id: None,
            classes: Vec::new(),
            attributes: BTreeMap::new(),
            text: String::new(),
            visible: true,
            label: None,
            role: None,
        }
    }

    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn class(mut self, class: impl Into<String>) -> Self {
        self.classes.push(class.into());
        self
    }

    pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes
            .insert(name.into().to_ascii_lowercase(), value.into());
        self
    }

    /// Own text content (descendant text is appended when matching)
    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    /// Accessible label, as a `<label for>` would provide
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Explicit ARIA role
    pub fn role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }

    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }
}

/// Driver call recorded by [`MemorySurface`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SurfaceEvent {
    Navigate(String),
    Click(String),
    Fill { handle: String, text: String },
    Focus(String),
    Hover(String),
    Press(Key),
    Wait(u64),
    Screenshot(PathBuf),
    WriteStorage { origin: String, entries: StorageMap },
    WriteCookies { origin: String, cookies: Vec<SessionCookie> },
    Close,
}

#[derive(Debug, Clone)]
enum Reaction {
    Reveal(usize),
    Remove(usize),
    Navigate(String),
}

#[derive(Debug)]
struct Node {
    element: MemoryElement,
    parent: Option<usize>,
    removed: bool,
}

struct Tree {
    roots: Vec<usize>,
    children: Vec<Vec<usize>>,
    order: Vec<usize>,
}

#[derive(Default)]
struct SurfaceState {
    nodes: Vec<Node>,
    url: String,
    title: String,
    focused: Option<usize>,
    storage: BTreeMap<String, StorageMap>,
    cookies: BTreeMap<String, Vec<SessionCookie>>,
    screenshot: Option<Vec<u8>>,
    navigation_failures: Vec<(String, DriverError)>,
    failing_clicks: BTreeSet<usize>,
    click_reactions: HashMap<usize, Vec<Reaction>>,
    key_reactions: Vec<(Key, Reaction)>,
    events: Vec<SurfaceEvent>,
}

/// In-memory [`SurfaceDriver`]
#[derive(Default)]
pub struct MemorySurface {
    state: Mutex<SurfaceState>,
}

impl MemorySurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a top-level element, returning its index
    pub fn add(&self, element: MemoryElement) -> usize {
        self.insert(None, element)
    }

    /// Add `element` as the last child of `parent`
    pub fn add_child(&self, parent: usize, element: MemoryElement) -> usize {
        self.insert(Some(parent), element)
    }

    fn insert(&self, parent: Option<usize>, element: MemoryElement) -> usize {
        let mut state = self.state.lock();
        state.nodes.push(Node {
            element,
            parent,
            removed: false,
        });
        state.nodes.len() - 1
    }

    pub fn set_title(&self, title: impl Into<String>) {
        self.state.lock().title = title.into();
    }

    /// PNG bytes written by every subsequent screenshot
    pub fn set_screenshot(&self, png: Vec<u8>) {
        self.state.lock().screenshot = Some(png);
    }

    pub fn set_storage(&self, origin: impl Into<String>, entries: StorageMap) {
        self.state.lock().storage.insert(origin.into(), entries);
    }

    pub fn storage(&self, origin: &str) -> StorageMap {
        self.state
            .lock()
            .storage
            .get(origin)
            .cloned()
            .unwrap_or_default()
    }

    pub fn set_cookies(&self, origin: impl Into<String>, cookies: Vec<SessionCookie>) {
        self.state.lock().cookies.insert(origin.into(), cookies);
    }

    pub fn cookies(&self, origin: &str) -> Vec<SessionCookie> {
        self.state
            .lock()
            .cookies
            .get(origin)
            .cloned()
            .unwrap_or_default()
    }

    /// Fail navigations whose URL contains `pattern`
    pub fn fail_navigation(&self, pattern: impl Into<String>, error: DriverError) {
        self.state
            .lock()
            .navigation_failures
            .push((pattern.into(), error));
    }

    /// Make clicks on `index` fail as if intercepted by an overlay
    pub fn fail_clicks(&self, index: usize) {
        self.state.lock().failing_clicks.insert(index);
    }

    pub fn reveal_on_click(&self, trigger: usize, target: usize) {
        self.add_click_reaction(trigger, Reaction::Reveal(target));
    }

    pub fn remove_on_click(&self, trigger: usize, target: usize) {
        self.add_click_reaction(trigger, Reaction::Remove(target));
    }

    pub fn navigate_on_click(&self, trigger: usize, url: impl Into<String>) {
        self.add_click_reaction(trigger, Reaction::Navigate(url.into()));
    }

    pub fn reveal_on_key(&self, key: Key, target: usize) {
        self.state
            .lock()
            .key_reactions
            .push((key, Reaction::Reveal(target)));
    }

    fn add_click_reaction(&self, trigger: usize, reaction: Reaction) {
        self.state
            .lock()
            .click_reactions
            .entry(trigger)
            .or_default()
            .push(reaction);
    }

    pub fn handle(index: usize) -> String {
        format!("{HANDLE_PREFIX}{index}")
    }

    pub fn url(&self) -> String {
        self.state.lock().url.clone()
    }

    pub fn attribute(&self, index: usize, name: &str) -> Option<String> {
        let state = self.state.lock();
        if index >= state.nodes.len() {
            return None;
        }
        state.attribute(index, name)
    }

    pub fn value(&self, index: usize) -> Option<String> {
        self.attribute(index, "value")
    }

    pub fn is_removed(&self, index: usize) -> bool {
        self.state
            .lock()
            .nodes
            .get(index)
            .map_or(true, |node| node.removed)
    }

    pub fn is_visible(&self, index: usize) -> bool {
        let state = self.state.lock();
        index < state.nodes.len() && state.is_visible(index)
    }

    pub fn focused(&self) -> Option<usize> {
        self.state.lock().focused
    }

    pub fn events(&self) -> Vec<SurfaceEvent> {
        self.state.lock().events.clone()
    }

    pub fn clear_events(&self) {
        self.state.lock().events.clear();
    }
}

impl Dom for SurfaceState {
    fn tag(&self, node: usize) -> &str {
        &self.nodes[node].element.tag
    }

    fn attribute(&self, node: usize, name: &str) -> Option<String> {
        let element = &self.nodes[node].element;
        match name {
            "id" => element.id.clone(),
            "class" if !element.classes.is_empty() => Some(element.classes.join(" ")),
            "role" => element
                .role
                .clone()
                .or_else(|| element.attributes.get("role").cloned()),
            _ => element.attributes.get(name).cloned(),
        }
    }

    fn parent(&self, node: usize) -> Option<usize> {
        self.nodes[node].parent
    }
}

impl SurfaceState {
    fn tree(&self) -> Tree {
        let mut roots = Vec::new();
        let mut children = vec![Vec::new(); self.nodes.len()];
        for (index, node) in self.nodes.iter().enumerate() {
            if node.removed {
                continue;
            }
            match node.parent {
                Some(parent) => children[parent].push(index),
                None => roots.push(index),
            }
        }
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut stack: Vec<usize> = roots.iter().rev().copied().collect();
        while let Some(node) = stack.pop() {
            order.push(node);
            stack.extend(children[node].iter().rev().copied());
        }
        Tree {
            roots,
            children,
            order,
        }
    }

    fn is_visible(&self, node: usize) -> bool {
        let mut current = Some(node);
        while let Some(index) = current {
            let entry = &self.nodes[index];
            if entry.removed || !entry.element.visible {
                return false;
            }
            current = entry.parent;
        }
        true
    }

    fn is_descendant(&self, node: usize, ancestor: usize) -> bool {
        let mut current = self.nodes[node].parent;
        while let Some(index) = current {
            if index == ancestor {
                return true;
            }
            current = self.nodes[index].parent;
        }
        false
    }

    fn full_text(&self, node: usize, tree: &Tree) -> String {
        let mut parts = Vec::new();
        self.collect_text(node, tree, &mut parts);
        parts
            .iter()
            .flat_map(|part| part.split_whitespace())
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn collect_text<'a>(&'a self, node: usize, tree: &Tree, parts: &mut Vec<&'a str>) {
        parts.push(&self.nodes[node].element.text);
        for &child in &tree.children[node] {
            self.collect_text(child, tree, parts);
        }
    }

    fn implicit_role(&self, node: usize) -> Option<String> {
        if let Some(role) = self.attribute(node, "role") {
            return Some(role);
        }
        let role = match self.tag(node) {
            "button" => "button",
            "a" => "link",
            "textarea" => "textbox",
            "select" => "combobox",
            "li" => "listitem",
            "ul" | "ol" => "list",
            "form" => "form",
            "img" => "img",
            "input" => match input_type(self, node).as_str() {
                "submit" | "button" | "reset" => "button",
                "checkbox" => "checkbox",
                "radio" => "radio",
                "hidden" => return None,
                _ => "textbox",
            },
            _ => return None,
        };
        Some(role.to_string())
    }

    fn labels(&self, node: usize, tree: &Tree) -> Vec<String> {
        let element = &self.nodes[node].element;
        let mut labels: Vec<String> = element.label.iter().cloned().collect();
        labels.extend(element.attributes.get("aria-label").cloned());
        if let Some(id) = &element.id {
            for &other in &tree.order {
                if self.tag(other) == "label"
                    && self.attribute(other, "for").as_deref() == Some(id.as_str())
                {
                    labels.push(self.full_text(other, tree));
                }
            }
        }
        let mut current = self.nodes[node].parent;
        while let Some(ancestor) = current {
            if self.tag(ancestor) == "label" {
                labels.push(self.full_text(ancestor, tree));
            }
            current = self.nodes[ancestor].parent;
        }
        labels
    }

    fn accessible_name(&self, node: usize, tree: &Tree) -> String {
        if let Some(label) = self.labels(node, tree).into_iter().next() {
            return label;
        }
        let text = self.full_text(node, tree);
        if !text.is_empty() {
            return text;
        }
        ["value", "placeholder", "title"]
            .iter()
            .find_map(|name| self.attribute(node, name))
            .unwrap_or_default()
    }

    fn evaluate(&self, query: &Query) -> Result<Vec<usize>, DriverError> {
        let tree = self.tree();
        let matches = match query {
            Query::Css { selector } => {
                let list = parse_selector(selector)?;
                self.filter(&tree, |node| list.matches(self, node))
            }
            Query::Placeholder { text } => self.filter(&tree, |node| {
                self.attribute(node, "placeholder")
                    .is_some_and(|placeholder| contains_ci(&placeholder, text))
            }),
            Query::Label { text } => self.filter(&tree, |node| {
                self.tag(node) != "label"
                    && self
                        .labels(node, &tree)
                        .iter()
                        .any(|label| contains_ci(label, text))
            }),
            Query::Role { role, name } => self.filter(&tree, |node| {
                self.implicit_role(node)
                    .is_some_and(|have| have.eq_ignore_ascii_case(role))
                    && contains_ci(&self.accessible_name(node, &tree), name)
            }),
            Query::Text { text, exact } => {
                let wanted = text.trim();
                let matched = self.filter(&tree, |node| {
                    let content = self.full_text(node, &tree);
                    if *exact {
                        content == wanted
                    } else {
                        contains_ci(&content, wanted)
                    }
                });
                self.innermost(matched)
            }
            Query::TextWithin { css, text } => {
                let list = parse_selector(css)?;
                self.filter(&tree, |node| {
                    list.matches(self, node) && contains_ci(&self.full_text(node, &tree), text)
                })
            }
            Query::Has { css, inner } => {
                let list = parse_selector(css)?;
                let nested = self.evaluate(inner)?;
                self.filter(&tree, |node| {
                    list.matches(self, node)
                        && nested.iter().any(|&found| self.is_descendant(found, node))
                })
            }
            Query::Descendant { container, inner } => {
                let Some(&scope) = self.evaluate(container)?.first() else {
                    return Ok(Vec::new());
                };
                let list = parse_selector(inner)?;
                self.filter(&tree, |node| {
                    self.is_descendant(node, scope) && list.matches(self, node)
                })
            }
        };
        Ok(matches)
    }

    fn filter(&self, tree: &Tree, predicate: impl Fn(usize) -> bool) -> Vec<usize> {
        tree.order
            .iter()
            .copied()
            .filter(|&node| predicate(node))
            .collect()
    }

    fn innermost(&self, matched: Vec<usize>) -> Vec<usize> {
        matched
            .iter()
            .copied()
            .filter(|&node| {
                !matched
                    .iter()
                    .any(|&other| other != node && self.is_descendant(other, node))
            })
            .collect()
    }

    fn element_ref(&self, node: usize) -> ElementRef {
        ElementRef::new(
            MemorySurface::handle(node),
            self.nodes[node].element.tag.clone(),
            self.is_visible(node),
        )
    }

    fn resolve(&self, element: &ElementRef) -> Result<usize, DriverError> {
        element
            .handle
            .strip_prefix(HANDLE_PREFIX)
            .and_then(|raw| raw.parse::<usize>().ok())
            .filter(|&index| index < self.nodes.len() && !self.nodes[index].removed)
            .ok_or_else(|| DriverError::StaleElement(element.handle.clone()))
    }

    fn resolve_visible(&self, element: &ElementRef) -> Result<usize, DriverError> {
        let node = self.resolve(element)?;
        if !self.is_visible(node) {
            return Err(DriverError::Interaction(format!(
                "{} is not visible",
                element.handle
            )));
        }
        Ok(node)
    }

    fn apply(&mut self, reaction: Reaction) {
        match reaction {
            Reaction::Reveal(target) => {
                if let Some(node) = self.nodes.get_mut(target) {
                    node.element.visible = true;
                }
            }
            Reaction::Remove(target) => self.remove_subtree(target),
            Reaction::Navigate(url) => self.url = url,
        }
    }

    fn remove_subtree(&mut self, target: usize) {
        if target >= self.nodes.len() {
            return;
        }
        let doomed: Vec<usize> = (0..self.nodes.len())
            .filter(|&node| node == target || self.is_descendant(node, target))
            .collect();
        for node in doomed {
            self.nodes[node].removed = true;
        }
        if self.focused.is_some_and(|focused| self.nodes[focused].removed) {
            self.focused = None;
        }
    }

    fn render(&self) -> String {
        let tree = self.tree();
        let mut body = String::new();
        for &root in &tree.roots {
            self.render_node(root, &tree, &mut body);
        }
        format!(
            "<html><head><title>{}</title></head><body>{}</body></html>",
            self.title, body
        )
    }

    fn render_node(&self, node: usize, tree: &Tree, out: &mut String) {
        let element = &self.nodes[node].element;
        out.push('<');
        out.push_str(&element.tag);
        if let Some(id) = &element.id {
            out.push_str(&format!(" id=\"{id}\""));
        }
        if !element.classes.is_empty() {
            out.push_str(&format!(" class=\"{}\"", element.classes.join(" ")));
        }
        for (name, value) in &element.attributes {
            out.push_str(&format!(" {name}=\"{value}\""));
        }
        if !element.visible {
            out.push_str(" hidden");
        }
        out.push('>');
        out.push_str(&element.text);
        for &child in &tree.children[node] {
            self.render_node(child, tree, out);
        }
        out.push_str(&format!("</{}>", element.tag));
    }
}

fn input_type(dom: &SurfaceState, node: usize) -> String {
    dom.attribute(node, "type")
        .unwrap_or_else(|| "text".to_string())
        .to_ascii_lowercase()
}

fn is_fillable(dom: &SurfaceState, node: usize) -> bool {
    match dom.tag(node) {
        "textarea" => true,
        "input" => !matches!(
            input_type(dom, node).as_str(),
            "hidden" | "submit" | "button" | "reset" | "checkbox" | "radio"
        ),
        _ => dom.attribute(node, "contenteditable").is_some(),
    }
}

fn parse_selector(selector: &str) -> Result<SelectorList, DriverError> {
    SelectorList::parse(selector)
        .map_err(|err| DriverError::Protocol(format!("invalid selector '{selector}': {err}")))
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    let needle = needle.trim();
    !needle.is_empty() && haystack.to_lowercase().contains(&needle.to_lowercase())
}

#[async_trait]
impl SurfaceDriver for MemorySurface {
    async fn navigate(&self, url: &str, _timeout: Duration) -> Result<(), DriverError> {
        let mut state = self.state.lock();
        state.events.push(SurfaceEvent::Navigate(url.to_string()));
        let failure = state
            .navigation_failures
            .iter()
            .find(|(pattern, _)| url.contains(pattern.as_str()))
            .map(|(_, error)| error.clone());
        match failure {
            // A timed-out load still leaves the browser on the new URL.
            Some(error) if error.is_timeout() => {
                state.url = url.to_string();
                Err(error)
            }
            Some(error) => Err(error),
            None => {
                state.url = url.to_string();
                Ok(())
            }
        }
    }

    async fn find_candidates(&self, query: &Query) -> Result<Vec<ElementRef>, DriverError> {
        let state = self.state.lock();
        let matches = state.evaluate(query)?;
        debug!(query = %query, count = matches.len(), "memory lookup");
        Ok(matches
            .into_iter()
            .map(|node| state.element_ref(node))
            .collect())
    }

    async fn click(&self, element: &ElementRef, _timeout: Duration) -> Result<(), DriverError> {
        let mut state = self.state.lock();
        let node = state.resolve_visible(element)?;
        if state.failing_clicks.contains(&node) {
            return Err(DriverError::Interaction(format!(
                "click on {} was intercepted",
                element.handle
            )));
        }
        state.events.push(SurfaceEvent::Click(element.handle.clone()));
        state.focused = Some(node);
        if state.tag(node) == "input" && input_type(&state, node) == "checkbox" {
            let attributes = &mut state.nodes[node].element.attributes;
            if attributes.remove("checked").is_none() {
                attributes.insert("checked".to_string(), "checked".to_string());
            }
        }
        let reactions = state.click_reactions.get(&node).cloned().unwrap_or_default();
        for reaction in reactions {
            state.apply(reaction);
        }
        Ok(())
    }

    async fn fill(&self, element: &ElementRef, text: &str) -> Result<(), DriverError> {
        let mut state = self.state.lock();
        let node = state.resolve_visible(element)?;
        if !is_fillable(&state, node) {
            return Err(DriverError::Interaction(format!(
                "{} <{}> does not accept text",
                element.handle, element.tag
            )));
        }
        state.nodes[node]
            .element
            .attributes
            .insert("value".to_string(), text.to_string());
        state.focused = Some(node);
        state.events.push(SurfaceEvent::Fill {
            handle: element.handle.clone(),
            text: text.to_string(),
        });
        Ok(())
    }

    async fn focus(&self, element: &ElementRef) -> Result<(), DriverError> {
        let mut state = self.state.lock();
        let node = state.resolve(element)?;
        state.focused = Some(node);
        state.events.push(SurfaceEvent::Focus(element.handle.clone()));
        Ok(())
    }

    async fn hover(&self, element: &ElementRef) -> Result<(), DriverError> {
        let mut state = self.state.lock();
        state.resolve_visible(element)?;
        state.events.push(SurfaceEvent::Hover(element.handle.clone()));
        Ok(())
    }

    async fn press_key(&self, key: Key) -> Result<(), DriverError> {
        let mut state = self.state.lock();
        state.events.push(SurfaceEvent::Press(key));
        let reactions: Vec<Reaction> = state
            .key_reactions
            .iter()
            .filter(|(pressed, _)| *pressed == key)
            .map(|(_, reaction)| reaction.clone())
            .collect();
        for reaction in reactions {
            state.apply(reaction);
        }
        Ok(())
    }

    async fn wait_millis(&self, millis: u64) -> Result<(), DriverError> {
        self.state.lock().events.push(SurfaceEvent::Wait(millis));
        Ok(())
    }

    async fn screenshot(&self, path: &Path) -> bool {
        let png = {
            let mut state = self.state.lock();
            state
                .events
                .push(SurfaceEvent::Screenshot(path.to_path_buf()));
            state.screenshot.clone()
        };
        let Some(png) = png else {
            return false;
        };
        match tokio::fs::write(path, png).await {
            Ok(()) => true,
            Err(err) => {
                debug!(path = %path.display(), error = %err, "memory screenshot write failed");
                false
            }
        }
    }

    async fn read_text(&self) -> Result<String, DriverError> {
        Ok(self.state.lock().render())
    }

    async fn current_url(&self) -> Result<String, DriverError> {
        Ok(self.state.lock().url.clone())
    }

    async fn title(&self) -> Result<String, DriverError> {
        Ok(self.state.lock().title.clone())
    }

    async fn read_local_storage(&self) -> Result<StorageMap, DriverError> {
        let state = self.state.lock();
        let origin = origin_of(&state.url);
        Ok(state.storage.get(&origin).cloned().unwrap_or_default())
    }

    async fn write_local_storage(&self, entries: &StorageMap) -> Result<(), DriverError> {
        let mut state = self.state.lock();
        let origin = origin_of(&state.url);
        state
            .storage
            .entry(origin.clone())
            .or_default()
            .extend(entries.iter().map(|(k, v)| (k.clone(), v.clone())));
        state.events.push(SurfaceEvent::WriteStorage {
            origin,
            entries: entries.clone(),
        });
        Ok(())
    }

    async fn read_cookies(&self) -> Result<Vec<SessionCookie>, DriverError> {
        let state = self.state.lock();
        let origin = origin_of(&state.url);
        Ok(state.cookies.get(&origin).cloned().unwrap_or_default())
    }

    async fn write_cookies(&self, cookies: &[SessionCookie]) -> Result<(), DriverError> {
        let mut state = self.state.lock();
        let origin = origin_of(&state.url);
        let jar = state.cookies.entry(origin.clone()).or_default();
        for cookie in cookies {
            jar.retain(|existing| existing.name != cookie.name);
            jar.push(cookie.clone());
        }
        state.events.push(SurfaceEvent::WriteCookies {
            origin,
            cookies: cookies.to_vec(),
        });
        Ok(())
    }

    async fn close(&self) -> Result<(), DriverError> {
        self.state.lock().events.push(SurfaceEvent::Close);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn todo_list() -> (MemorySurface, usize, usize) {
        let surface = MemorySurface::new();
        let list = surface.add(MemoryElement::new("ul").class("todo-list"));
        let item = surface.add_child(list, MemoryElement::new("li"));
        let view = surface.add_child(item, MemoryElement::new("div").class("view"));
        surface.add_child(
            view,
            MemoryElement::new("input").class("toggle").attr("type", "checkbox"),
        );
        surface.add_child(view, MemoryElement::new("label").text("Buy milk"));
        let destroy = surface.add_child(view, MemoryElement::new("button").class("destroy"));
        (surface, item, destroy)
    }

    #[tokio::test]
    async fn text_query_returns_innermost_match() {
        let (surface, _, _) = todo_list();
        let found = surface
            .find_candidates(&Query::exact_text("Buy milk"))
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].tag, "label");
    }

    #[tokio::test]
    async fn descendant_query_scopes_to_container() {
        let (surface, _, destroy) = todo_list();
        let query = Query::descendant(Query::text_within("li", "buy milk"), "button.destroy");
        let found = surface.find_candidates(&query).await.unwrap();
        assert_eq!(found, vec![ElementRef::new(MemorySurface::handle(destroy), "button", true)]);
    }

    #[tokio::test]
    async fn has_query_selects_enclosing_item() {
        let (surface, item, _) = todo_list();
        let query = Query::has("ul.todo-list li", Query::exact_text("Buy milk"));
        let found = surface.find_candidates(&query).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].handle, MemorySurface::handle(item));
        let missing = Query::has("ul.todo-list li", Query::exact_text("Buy"));
        assert!(surface.find_candidates(&missing).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn hidden_ancestor_hides_descendants() {
        let surface = MemorySurface::new();
        let panel = surface.add(MemoryElement::new("div").hidden());
        surface.add_child(panel, MemoryElement::new("button").text("Start"));
        let found = surface.find_candidates(&Query::text("Start")).await.unwrap();
        assert_eq!(found.len(), 1);
        assert!(!found[0].visible);
        let err = surface
            .click(&found[0], Duration::from_millis(10))
            .await
            .unwrap_err();
        assert!(matches!(err, DriverError::Interaction(_)));
    }

    #[tokio::test]
    async fn role_and_label_lookups() {
        let surface = MemorySurface::new();
        let form = surface.add(MemoryElement::new("form"));
        surface.add_child(form, MemoryElement::new("label").attr("for", "email").text("Email address"));
        let email = surface.add_child(form, MemoryElement::new("input").id("email"));
        let submit = surface.add_child(
            form,
            MemoryElement::new("input").attr("type", "submit").attr("value", "Log in"),
        );

        let by_label = surface.find_candidates(&Query::label("email")).await.unwrap();
        assert_eq!(by_label[0].handle, MemorySurface::handle(email));

        let by_role = surface
            .find_candidates(&Query::role("button", "log in"))
            .await
            .unwrap();
        assert_eq!(by_role[0].handle, MemorySurface::handle(submit));
    }

    #[tokio::test]
    async fn wrapping_label_names_its_input() {
        let surface = MemorySurface::new();
        let label = surface.add(MemoryElement::new("label").text("Username"));
        let input = surface.add_child(label, MemoryElement::new("input"));
        let found = surface.find_candidates(&Query::label("username")).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].handle, MemorySurface::handle(input));
    }

    #[tokio::test]
    async fn click_reactions_and_removal() {
        let (surface, item, destroy) = todo_list();
        surface.remove_on_click(destroy, item);
        let button = ElementRef::new(MemorySurface::handle(destroy), "button", true);
        surface.click(&button, Duration::from_millis(10)).await.unwrap();
        assert!(surface.is_removed(item));
        let stale = surface.click(&button, Duration::from_millis(10)).await.unwrap_err();
        assert!(matches!(stale, DriverError::StaleElement(_)));
    }

    #[tokio::test]
    async fn fill_rejects_non_text_controls() {
        let (surface, _, destroy) = todo_list();
        let button = ElementRef::new(MemorySurface::handle(destroy), "button", true);
        assert!(surface.fill(&button, "x").await.is_err());
    }

    #[tokio::test]
    async fn invalid_selector_is_a_protocol_error() {
        let surface = MemorySurface::new();
        let err = surface.find_candidates(&Query::css("#")).await.unwrap_err();
        assert!(matches!(err, DriverError::Protocol(_)));
    }

    #[tokio::test]
    async fn timed_out_navigation_still_moves_url() {
        let surface = MemorySurface::new();
        surface.fail_navigation("slow.test", DriverError::timeout("navigate", 50));
        let err = surface
            .navigate("https://slow.test/", Duration::from_millis(50))
            .await
            .unwrap_err();
        assert!(err.is_timeout());
        assert_eq!(surface.url(), "https://slow.test/");
    }

    #[tokio::test]
    async fn storage_is_keyed_by_origin() {
        let surface = MemorySurface::new();
        surface
            .navigate("https://app.test/a", Duration::from_secs(1))
            .await
            .unwrap();
        let entries = StorageMap::from([("token".to_string(), "abc".to_string())]);
        surface.write_local_storage(&entries).await.unwrap();
        assert_eq!(surface.storage("https://app.test"), entries);
        surface
            .navigate("https://other.test/", Duration::from_secs(1))
            .await
            .unwrap();
        assert!(surface.read_local_storage().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn cookies_replace_by_name_per_origin() {
        let surface = MemorySurface::new();
        surface.set_cookies("https://shop.test", vec![SessionCookie::new("session-username", "old")]);
        surface
            .navigate("https://shop.test/inventory.html", Duration::from_secs(1))
            .await
            .unwrap();
        surface
            .write_cookies(&[
                SessionCookie::new("session-username", "standard_user"),
                SessionCookie::new("theme", "dark"),
            ])
            .await
            .unwrap();
        let names: Vec<_> = surface
            .read_cookies()
            .await
            .unwrap()
            .into_iter()
            .map(|cookie| (cookie.name, cookie.value))
            .collect();
        assert_eq!(
            names,
            vec![
                ("session-username".to_string(), "standard_user".to_string()),
                ("theme".to_string(), "dark".to_string()),
            ]
        );
        surface
            .navigate("https://other.test/", Duration::from_secs(1))
            .await
            .unwrap();
        assert!(surface.read_cookies().await.unwrap().is_empty());
    }
}
