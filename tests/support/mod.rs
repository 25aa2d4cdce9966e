//! Shared test support: a scripted in-memory driver and canned captcha
//! strategies.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;

use calfetch::browser::{js, Driver};
use calfetch::captcha::CaptchaStrategy;
use calfetch::error::CaptchaError;
use calfetch::models::{CaptchaChallenge, CaptchaToken};
use calfetch::portal;

/// One scripted page of the fake portal.
#[derive(Debug, Clone, Default)]
pub struct FakePage {
    pub url: String,
    pub text: String,
    pub source: String,
    /// id -> inner text
    pub elements: HashMap<String, String>,
    /// id -> form value
    pub values: HashMap<String, String>,
    /// Rows of cell texts returned by the generic table scrape.
    pub cell_rows: Vec<Vec<String>>,
    /// When true, scripted value assignment reports success but does not
    /// stick, forcing the keystroke fallback.
    pub reject_scripted_entry: bool,
}

impl FakePage {
    pub fn new(url: &str) -> Self {
        Self {
            url: url.to_string(),
            source: "<html></html>".to_string(),
            ..Default::default()
        }
    }

    pub fn with_text(mut self, text: &str) -> Self {
        self.text = text.to_string();
        self
    }

    pub fn with_element(mut self, id: &str, text: &str) -> Self {
        self.elements.insert(id.to_string(), text.to_string());
        self
    }

    pub fn with_value(mut self, id: &str, value: &str) -> Self {
        self.values.insert(id.to_string(), value.to_string());
        self
    }

    pub fn with_cell_rows(mut self, rows: &[&[&str]]) -> Self {
        self.cell_rows = rows
            .iter()
            .map(|row| row.iter().map(|cell| cell.to_string()).collect())
            .collect();
        self
    }

    pub fn rejecting_scripted_entry(mut self) -> Self {
        self.reject_scripted_entry = true;
        self
    }

    /// Add a grid row on the accounts view, with its detail trigger.
    pub fn with_account_row(
        mut self,
        position: usize,
        number: &str,
        service: &str,
        address: &str,
        status: &str,
    ) -> Self {
        let row_id = format!("{}{}", portal::ACCOUNT_ROW_PREFIX, portal::row_suffix(position));
        self.elements.insert(row_id, String::new());
        self.elements
            .insert(portal::cell_id(portal::CELL_NUMBER, position), number.to_string());
        self.elements
            .insert(portal::cell_id(portal::CELL_SERVICE, position), service.to_string());
        self.elements
            .insert(portal::cell_id(portal::CELL_ADDRESS, position), address.to_string());
        self.elements
            .insert(portal::cell_id(portal::CELL_STATUS, position), status.to_string());
        self.elements
            .insert(portal::detail_control(position), String::new());
        self
    }

    /// Add a line-item grid row on a detail view. `cells` pairs grid cell
    /// variables (e.g. `portal::ITEM_AMOUNT`) with their texts.
    pub fn with_item_row(mut self, position: usize, cells: &[(&str, &str)]) -> Self {
        let row_id = format!("{}{}", portal::ITEM_ROW_PREFIX, portal::row_suffix(position));
        self.elements.insert(row_id, String::new());
        for (variable, text) in cells {
            self.elements
                .insert(portal::cell_id(variable, position), text.to_string());
        }
        self
    }
}

#[derive(Debug, Default)]
struct FakeState {
    pages: HashMap<String, FakePage>,
    current: String,
    history: Vec<String>,
    click_routes: HashMap<(String, String), String>,
    eval_routes: HashMap<String, String>,
    calls: Vec<String>,
}

impl FakeState {
    fn page(&self) -> &FakePage {
        self.pages.get(&self.current).expect("current page exists")
    }

    fn page_mut(&mut self) -> &mut FakePage {
        self.pages
            .get_mut(&self.current)
            .expect("current page exists")
    }

    fn element_exists(&self, id: &str) -> bool {
        let page = self.page();
        page.elements.contains_key(id) || page.values.contains_key(id)
    }

    fn navigate(&mut self, dest: &str) {
        self.pages
            .entry(dest.to_string())
            .or_insert_with(|| FakePage::new(dest));
        self.history.push(self.current.clone());
        self.current = dest.to_string();
    }
}

/// In-memory [`Driver`] over a set of scripted pages.
pub struct FakeDriver {
    state: Mutex<FakeState>,
}

impl FakeDriver {
    pub fn new(start: &str, page: FakePage) -> Self {
        let mut pages = HashMap::new();
        pages.insert(start.to_string(), page);
        Self {
            state: Mutex::new(FakeState {
                pages,
                current: start.to_string(),
                ..Default::default()
            }),
        }
    }

    pub fn add_page(&self, name: &str, page: FakePage) {
        self.state
            .lock()
            .unwrap()
            .pages
            .insert(name.to_string(), page);
    }

    /// Clicking `id` while on `page` lands on `dest`.
    pub fn route_click(&self, page: &str, id: &str, dest: &str) {
        self.state
            .lock()
            .unwrap()
            .click_routes
            .insert((page.to_string(), id.to_string()), dest.to_string());
    }

    /// Evaluating exactly `script` lands on `dest` and returns `true`.
    pub fn route_eval(&self, script: &str, dest: &str) {
        self.state
            .lock()
            .unwrap()
            .eval_routes
            .insert(script.to_string(), dest.to_string());
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn current_page(&self) -> String {
        self.state.lock().unwrap().current.clone()
    }
}

#[async_trait]
impl Driver for FakeDriver {
    async fn goto(&self, url: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("goto:{url}"));
        let dest = state
            .pages
            .iter()
            .find(|(_, page)| page.url == url)
            .map(|(name, _)| name.clone())
            .unwrap_or_else(|| url.to_string());
        state.navigate(&dest);
        Ok(())
    }

    async fn current_url(&self) -> Result<String> {
        Ok(self.state.lock().unwrap().page().url.clone())
    }

    async fn page_text(&self) -> Result<String> {
        let mut state = self.state.lock().unwrap();
        state.calls.push("page_text".to_string());
        Ok(state.page().text.clone())
    }

    async fn page_source(&self) -> Result<String> {
        Ok(self.state.lock().unwrap().page().source.clone())
    }

    async fn screenshot_png(&self) -> Result<Vec<u8>> {
        Ok(b"\x89PNG".to_vec())
    }

    async fn text_of(&self, id: &str) -> Result<Option<String>> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("text_of:{id}"));
        Ok(state.page().elements.get(id).cloned())
    }

    async fn value_of(&self, id: &str) -> Result<Option<String>> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("value_of:{id}"));
        Ok(state.page().values.get(id).cloned())
    }

    async fn count_by_id_prefix(&self, prefix: &str) -> Result<usize> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("count:{prefix}"));
        Ok(state
            .page()
            .elements
            .keys()
            .filter(|id| id.starts_with(prefix))
            .count())
    }

    async fn click(&self, id: &str) -> Result<bool> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("click:{id}"));
        if !state.element_exists(id) {
            return Ok(false);
        }
        let route = state
            .click_routes
            .get(&(state.current.clone(), id.to_string()))
            .cloned();
        if let Some(dest) = route {
            state.navigate(&dest);
        }
        Ok(true)
    }

    async fn set_value(&self, id: &str, value: &str) -> Result<bool> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("set_value:{id}"));
        if !state.element_exists(id) {
            return Ok(false);
        }
        if !state.page().reject_scripted_entry {
            state
                .page_mut()
                .values
                .insert(id.to_string(), value.to_string());
        }
        Ok(true)
    }

    async fn select_value(&self, id: &str, value: &str) -> Result<bool> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("select:{id}={value}"));
        if !state.element_exists(id) {
            return Ok(false);
        }
        state
            .page_mut()
            .values
            .insert(id.to_string(), value.to_string());
        Ok(true)
    }

    async fn type_into(&self, id: &str, text: &str) -> Result<bool> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("type_into:{id}"));
        if !state.element_exists(id) {
            return Ok(false);
        }
        state
            .page_mut()
            .values
            .entry(id.to_string())
            .or_default()
            .push_str(text);
        Ok(true)
    }

    async fn eval(&self, script: &str) -> Result<serde_json::Value> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("eval:{script}"));
        if script == js::TABLE_ROWS {
            return Ok(serde_json::json!(state.page().cell_rows));
        }
        if let Some(dest) = state.eval_routes.get(script).cloned() {
            state.navigate(&dest);
            return Ok(serde_json::Value::Bool(true));
        }
        Ok(serde_json::Value::Null)
    }

    async fn back(&self) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push("back".to_string());
        if let Some(prev) = state.history.pop() {
            state.current = prev;
        }
        Ok(())
    }
}

/// Strategy that succeeds immediately with a fixed token.
pub struct AlwaysSolve;

#[async_trait]
impl CaptchaStrategy for AlwaysSolve {
    fn name(&self) -> &str {
        "always-solve"
    }

    async fn resolve(
        &self,
        _challenge: &CaptchaChallenge,
        _driver: &dyn Driver,
    ) -> Result<CaptchaToken, CaptchaError> {
        Ok(CaptchaToken::new("test-token-0123456789"))
    }
}

/// Strategy that always times out.
pub struct NeverSolve;

#[async_trait]
impl CaptchaStrategy for NeverSolve {
    fn name(&self) -> &str {
        "never-solve"
    }

    async fn resolve(
        &self,
        _challenge: &CaptchaChallenge,
        _driver: &dyn Driver,
    ) -> Result<CaptchaToken, CaptchaError> {
        Err(CaptchaError::Timeout(Duration::ZERO))
    }
}

/// Strategy that resolves by running a page script, mimicking a resolution
/// that completes the login as a side effect.
pub struct SolveByScript {
    pub script: String,
}

#[async_trait]
impl CaptchaStrategy for SolveByScript {
    fn name(&self) -> &str {
        "solve-by-script"
    }

    async fn resolve(
        &self,
        _challenge: &CaptchaChallenge,
        driver: &dyn Driver,
    ) -> Result<CaptchaToken, CaptchaError> {
        driver.eval(&self.script).await?;
        Ok(CaptchaToken::implicit())
    }
}
