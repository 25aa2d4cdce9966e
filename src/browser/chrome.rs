//! Chrome-backed driver over the DevTools protocol.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::page::CaptureScreenshotFormat;
use chromiumoxide::page::ScreenshotParams;
use chromiumoxide::Page;
use futures::StreamExt;
use tokio::task::JoinHandle;

use super::{js, Driver};

/// A launched Chrome process plus the single page the pipeline drives.
pub struct ChromeSession {
    browser: Browser,
    handler_task: JoinHandle<()>,
    page: Page,
}

/// Launch Chrome and open a blank page.
pub async fn launch(headless: bool) -> Result<ChromeSession> {
    let chrome_path = find_chrome()
        .context("Chrome/Chromium not found. Install Chrome or Chromium to run the portal session.")?;

    let mut builder = BrowserConfig::builder()
        .chrome_executable(chrome_path)
        .viewport(None)
        .arg("--window-size=1920,1080")
        .arg("--disable-blink-features=AutomationControlled")
        .arg("--disable-infobars")
        .arg("--no-first-run")
        .arg("--no-default-browser-check")
        .arg("--disable-dev-shm-usage");
    if !headless {
        builder = builder.with_head();
    }
    let config = builder
        .build()
        .map_err(|e| anyhow::anyhow!("Failed to configure browser: {e}"))?;

    let (browser, mut handler) = Browser::launch(config)
        .await
        .context("Failed to launch browser")?;
    let handler_task = tokio::spawn(async move { while (handler.next().await).is_some() {} });

    let page = browser.new_page("about:blank").await?;

    Ok(ChromeSession {
        browser,
        handler_task,
        page,
    })
}

impl ChromeSession {
    /// Tear the browser down. Errors are logged, not surfaced: teardown runs
    /// on every exit path and must not mask the run's own result.
    pub async fn close(mut self) {
        if let Err(err) = self.browser.close().await {
            tracing::debug!(error = %err, "Browser close reported an error");
        }
        drop(self.browser);
        self.handler_task.abort();
    }

    async fn eval_value(&self, script: &str) -> Result<serde_json::Value> {
        let result = self
            .page
            .evaluate(script.to_string())
            .await
            .context("Script evaluation failed")?;
        Ok(result.value().cloned().unwrap_or(serde_json::Value::Null))
    }
}

#[async_trait]
impl Driver for ChromeSession {
    async fn goto(&self, url: &str) -> Result<()> {
        self.page
            .goto(url)
            .await
            .with_context(|| format!("Failed to navigate to {url}"))?;
        Ok(())
    }

    async fn current_url(&self) -> Result<String> {
        Ok(self.page.url().await?.unwrap_or_default())
    }

    async fn page_text(&self) -> Result<String> {
        let value = self.eval_value(js::PAGE_TEXT).await?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    async fn page_source(&self) -> Result<String> {
        self.page.content().await.context("Failed to read page source")
    }

    async fn screenshot_png(&self) -> Result<Vec<u8>> {
        let params = ScreenshotParams::builder()
            .format(CaptureScreenshotFormat::Png)
            .build();
        self.page
            .screenshot(params)
            .await
            .context("Failed to capture screenshot")
    }

    async fn text_of(&self, id: &str) -> Result<Option<String>> {
        let value = self.eval_value(&js::text_of(id)).await?;
        Ok(value.as_str().map(str::to_string))
    }

    async fn value_of(&self, id: &str) -> Result<Option<String>> {
        let value = self.eval_value(&js::value_of(id)).await?;
        Ok(value.as_str().map(str::to_string))
    }

    async fn count_by_id_prefix(&self, prefix: &str) -> Result<usize> {
        let value = self.eval_value(&js::count_by_id_prefix(prefix)).await?;
        Ok(value.as_u64().unwrap_or(0) as usize)
    }

    async fn click(&self, id: &str) -> Result<bool> {
        let value = self.eval_value(&js::click(id)).await?;
        Ok(value.as_bool().unwrap_or(false))
    }

    async fn set_value(&self, id: &str, value: &str) -> Result<bool> {
        let result = self.eval_value(&js::set_value(id, value)).await?;
        Ok(result.as_bool().unwrap_or(false))
    }

    async fn select_value(&self, id: &str, value: &str) -> Result<bool> {
        let result = self.eval_value(&js::select_value(id, value)).await?;
        Ok(result.as_bool().unwrap_or(false))
    }

    async fn type_into(&self, id: &str, text: &str) -> Result<bool> {
        let selector = format!("#{id}");
        let element = match self.page.find_element(selector).await {
            Ok(element) => element,
            Err(_) => return Ok(false),
        };
        element.click().await.context("Failed to focus element")?;
        element
            .type_str(text)
            .await
            .context("Failed to type into element")?;
        Ok(true)
    }

    async fn eval(&self, script: &str) -> Result<serde_json::Value> {
        self.eval_value(script).await
    }

    async fn back(&self) -> Result<()> {
        self.eval_value("history.back()").await?;
        Ok(())
    }
}

/// Find a Chrome/Chromium executable.
fn find_chrome() -> Option<String> {
    for binary in ["google-chrome", "chromium"] {
        if let Ok(output) = std::process::Command::new("which").arg(binary).output() {
            if output.status.success() {
                let path = String::from_utf8_lossy(&output.stdout).trim().to_string();
                if !path.is_empty() {
                    return Some(path);
                }
            }
        }
    }

    let candidates = [
        "/usr/bin/google-chrome",
        "/usr/bin/google-chrome-stable",
        "/usr/bin/chromium",
        "/usr/bin/chromium-browser",
        "/snap/bin/chromium",
        "/run/current-system/sw/bin/google-chrome",
        "/run/current-system/sw/bin/chromium",
        "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
        "/Applications/Chromium.app/Contents/MacOS/Chromium",
    ];

    candidates
        .into_iter()
        .find(|candidate| std::path::Path::new(candidate).exists())
        .map(str::to_string)
}
