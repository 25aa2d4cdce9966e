//! Debug artifact capture.
//!
//! The portal's UI is outside our control, so when something fails the only
//! useful post-mortem evidence is what the page looked like at that moment.
//! Every fatal path and every per-account detail failure drops a timestamped
//! screenshot + HTML pair here before the failure surfaces.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Local;

use crate::browser::Driver;

/// Writes timestamped page snapshots to a directory. Capture is always
/// best-effort: a failed snapshot is logged and never fails the caller.
#[derive(Debug, Clone)]
pub struct Artifacts {
    dir: Option<PathBuf>,
}

impl Artifacts {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: Some(dir.into()),
        }
    }

    /// A sink that drops everything, for tests and dry runs.
    pub fn disabled() -> Self {
        Self { dir: None }
    }

    /// Save a screenshot and the page HTML under `label`.
    pub async fn capture(&self, driver: &dyn Driver, label: &str) {
        let Some(dir) = self.dir.clone() else {
            return;
        };
        if let Err(err) = try_capture(driver, label, &dir).await {
            tracing::warn!(error = %err, label, "Failed to save debug artifact");
        }
    }
}

async fn try_capture(driver: &dyn Driver, label: &str, dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create debug dir: {}", dir.display()))?;

    let stamp = Local::now().format("%Y%m%d_%H%M%S");

    let png = driver.screenshot_png().await?;
    std::fs::write(dir.join(format!("{label}_{stamp}.png")), png)
        .context("Failed to write screenshot")?;

    let html = driver.page_source().await?;
    std::fs::write(dir.join(format!("{label}_{stamp}.html")), html)
        .context("Failed to write page source")?;

    Ok(())
}
