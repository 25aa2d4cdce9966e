//! Detail view navigation.
//!
//! Opens one account's detail view, parses it, and brings the session back
//! to the list view. The return trip is verified: the next account must not
//! start until the list marker is visible again, or its detail would be
//! read against a stale page.

use tokio::time::{sleep, Duration};

use super::parser::parse_detail;
use crate::artifacts::Artifacts;
use crate::browser::{js, Driver};
use crate::models::{Account, DetailRecord};
use crate::portal;

/// Attempts at history-back navigation before giving up on the return trip.
const BACK_RETRIES: usize = 2;

pub struct DetailNavigator<'a> {
    artifacts: &'a Artifacts,
    settle: Duration,
    list_url: String,
}

impl<'a> DetailNavigator<'a> {
    pub fn new(artifacts: &'a Artifacts, settle: Duration, list_url: impl Into<String>) -> Self {
        Self {
            artifacts,
            settle,
            list_url: list_url.into(),
        }
    }

    /// Extract the detail record for `account`.
    ///
    /// Never fails: a single account's problems are logged and produce an
    /// empty record, and the batch keeps going.
    pub async fn open_detail(
        &self,
        driver: &dyn Driver,
        account: &Account,
        index_in_list: usize,
    ) -> DetailRecord {
        match self.try_open(driver, account, index_in_list).await {
            Ok(record) => record,
            Err(err) => {
                tracing::warn!(
                    account = account.number,
                    error = %err,
                    "Detail extraction failed"
                );
                self.artifacts
                    .capture(driver, &format!("detalle_{}", account.number))
                    .await;
                // Whatever happened, the next account needs the list view.
                if let Err(err) = self.return_to_list(driver).await {
                    tracing::warn!(error = %err, "Could not recover the list view");
                }
                DetailRecord::default()
            }
        }
    }

    async fn try_open(
        &self,
        driver: &dyn Driver,
        account: &Account,
        index_in_list: usize,
    ) -> anyhow::Result<DetailRecord> {
        let Some(position) = self.resolve_row(driver, account, index_in_list).await? else {
            tracing::warn!(account = account.number, "No list row found for account");
            return Ok(DetailRecord::default());
        };

        self.open_row(driver, position).await?;

        let record = parse_detail(driver).await;
        self.artifacts
            .capture(driver, &format!("detalle_{}", account.number))
            .await;

        self.return_to_list(driver).await?;
        Ok(record)
    }

    /// Exact account-number match over the grid rows, else positional
    /// fallback. Positional pairing can mispair when row numbering and
    /// display order diverge after a partial page update; the portal offers
    /// no better handle.
    async fn resolve_row(
        &self,
        driver: &dyn Driver,
        account: &Account,
        index_in_list: usize,
    ) -> anyhow::Result<Option<usize>> {
        let rows = driver.count_by_id_prefix(portal::ACCOUNT_ROW_PREFIX).await?;

        for position in 1..=rows {
            if let Some(text) = driver
                .text_of(&portal::cell_id(portal::CELL_NUMBER, position))
                .await?
            {
                if text.trim() == account.number.to_string() {
                    return Ok(Some(position));
                }
            }
        }

        let position = index_in_list + 1;
        Ok((position <= rows).then_some(position))
    }

    async fn open_row(&self, driver: &dyn Driver, position: usize) -> anyhow::Result<()> {
        let control = portal::detail_control(position);

        if !driver.click(&control).await? {
            // Direct lookup can miss across frame contexts; click by script.
            driver.eval(&js::click(&control)).await?;
        }
        sleep(self.settle).await;

        if self.on_list_view(driver).await? {
            // Still on the list: fire the grid's own row event and give the
            // page another settle window.
            driver.eval(&js::grid_row_event(&control)).await?;
            sleep(self.settle).await;
        }
        Ok(())
    }

    async fn on_list_view(&self, driver: &dyn Driver) -> anyhow::Result<bool> {
        Ok(driver.current_url().await? == self.list_url)
    }

    async fn return_to_list(&self, driver: &dyn Driver) -> anyhow::Result<()> {
        // Scripted click first: the back control is the flakiest element on
        // the page under direct lookup.
        let clicked = match driver.eval(&js::click(portal::BACK_BUTTON)).await {
            Ok(value) => value.as_bool().unwrap_or(false),
            Err(_) => false,
        };
        if !clicked {
            driver.click(portal::BACK_BUTTON).await?;
        }
        sleep(self.settle).await;

        for _ in 0..BACK_RETRIES {
            if self.list_marker_present(driver).await? {
                return Ok(());
            }
            driver.back().await?;
            sleep(self.settle).await;
        }

        if self.list_marker_present(driver).await? {
            return Ok(());
        }
        anyhow::bail!("could not verify return to the account list")
    }

    async fn list_marker_present(&self, driver: &dyn Driver) -> anyhow::Result<bool> {
        Ok(driver.page_text().await?.contains(portal::LIST_MARKER))
    }
}
