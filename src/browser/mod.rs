//! Browser driver boundary.
//!
//! The pipeline consumes browser automation through [`Driver`], a small async
//! surface over what the DevTools protocol provides. Element addressing is by
//! DOM id, which is how the portal exposes every control. Lookups report an
//! absent element as `Ok(None)` / `Ok(false)`; `Err` is reserved for
//! transport-level failures (browser gone, protocol error).

pub mod chrome;
pub mod js;

pub use chrome::{launch, ChromeSession};

use anyhow::Result;
use async_trait::async_trait;

/// Opaque browser-automation capability.
#[async_trait]
pub trait Driver: Send + Sync {
    async fn goto(&self, url: &str) -> Result<()>;

    async fn current_url(&self) -> Result<String>;

    /// Full visible text of the page body.
    async fn page_text(&self) -> Result<String>;

    /// Raw HTML of the current page.
    async fn page_source(&self) -> Result<String>;

    async fn screenshot_png(&self) -> Result<Vec<u8>>;

    /// Inner text of the element with the given id.
    async fn text_of(&self, id: &str) -> Result<Option<String>>;

    /// Current form value of the element with the given id.
    async fn value_of(&self, id: &str) -> Result<Option<String>>;

    /// Number of elements whose id starts with `prefix`.
    async fn count_by_id_prefix(&self, prefix: &str) -> Result<usize>;

    /// Click the element; `false` when it is not present.
    async fn click(&self, id: &str) -> Result<bool>;

    /// Scripted value assignment with focus/input/change/blur dispatch.
    ///
    /// Returns `false` when the element is not present. A `true` result only
    /// means the script ran; callers that care must read the value back.
    async fn set_value(&self, id: &str, value: &str) -> Result<bool>;

    /// Select the option with the given value on a `<select>`.
    async fn select_value(&self, id: &str, value: &str) -> Result<bool>;

    /// Keystroke-level entry into the element.
    async fn type_into(&self, id: &str, text: &str) -> Result<bool>;

    /// Evaluate a script in page context, returning its JSON value.
    async fn eval(&self, script: &str) -> Result<serde_json::Value>;

    /// History-back navigation.
    async fn back(&self) -> Result<()>;
}
