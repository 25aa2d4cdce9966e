//! Session controller: owns the browser for the life of one run.

use anyhow::{Context, Result};

use crate::artifacts::Artifacts;
use crate::browser::{self, Driver};
use crate::captcha::CaptchaStrategy;
use crate::config::Config;
use crate::extract::{extract_person, DetailNavigator};
use crate::login::LoginMachine;
use crate::models::PersonRecord;

/// Runs login and extraction over a single exclusively-owned browser
/// session, tearing the browser down on every exit path.
pub struct SessionController {
    config: Config,
    strategy: Box<dyn CaptchaStrategy>,
    artifacts: Artifacts,
}

impl SessionController {
    pub fn new(config: Config, strategy: Box<dyn CaptchaStrategy>) -> Self {
        let artifacts = Artifacts::new(&config.debug_dir);
        Self {
            config,
            strategy,
            artifacts,
        }
    }

    /// Run the full pipeline in a freshly launched browser.
    pub async fn run(&self) -> Result<PersonRecord> {
        let session = browser::launch(self.config.headless).await?;
        let result = self.run_with_driver(&session).await;
        session.close().await;
        result
    }

    /// Pipeline over an already-acquired driver. Seam for tests.
    pub async fn run_with_driver(&self, driver: &dyn Driver) -> Result<PersonRecord> {
        let mut login = LoginMachine::new(&self.config, self.strategy.as_ref(), &self.artifacts);
        login.run(driver).await.context("Login failed")?;
        tracing::info!("Login confirmed");

        let list_url = driver.current_url().await?;
        let mut person = extract_person(driver).await;

        let navigator = DetailNavigator::new(
            &self.artifacts,
            self.config.timeouts.detail_settle,
            list_url,
        );
        for index in 0..person.accounts.len() {
            let account = person.accounts[index].clone();
            tracing::info!(
                account = account.number,
                address = %account.address,
                "Opening account detail"
            );
            person.accounts[index].detail = navigator.open_detail(driver, &account, index).await;
        }

        Ok(person)
    }
}
