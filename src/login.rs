//! Login state machine.
//!
//! One machine, parameterized by the captcha strategy. It walks the portal
//! from the identification form to a confirmed session and performs no
//! retries of its own: whether to re-run (and re-solve the captcha) is the
//! caller's decision.

use std::time::Instant;

use tokio::time::{sleep, Duration};

use crate::artifacts::Artifacts;
use crate::browser::Driver;
use crate::captcha::CaptchaStrategy;
use crate::config::Config;
use crate::error::LoginError;
use crate::models::CaptchaChallenge;
use crate::portal;

const FORM_POLL: Duration = Duration::from_millis(500);
const VERIFY_POLL: Duration = Duration::from_secs(1);

/// Stages of the login flow, recorded in the order they are entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginState {
    Start,
    FormLoaded,
    IdentifierEntered,
    CaptchaPending,
    CaptchaResolved,
    Submitted,
    Verifying,
    Success,
    Failed,
}

pub struct LoginMachine<'a> {
    config: &'a Config,
    strategy: &'a dyn CaptchaStrategy,
    artifacts: &'a Artifacts,
    trail: Vec<LoginState>,
}

impl<'a> LoginMachine<'a> {
    pub fn new(
        config: &'a Config,
        strategy: &'a dyn CaptchaStrategy,
        artifacts: &'a Artifacts,
    ) -> Self {
        Self {
            config,
            strategy,
            artifacts,
            trail: Vec::new(),
        }
    }

    /// States entered so far, in order.
    pub fn trail(&self) -> &[LoginState] {
        &self.trail
    }

    fn enter(&mut self, state: LoginState) {
        tracing::debug!(?state, "Login state");
        self.trail.push(state);
    }

    /// Drive the portal from the login form to an authenticated session.
    ///
    /// Every failure path saves a page snapshot before surfacing.
    pub async fn run(&mut self, driver: &dyn Driver) -> Result<(), LoginError> {
        match self.advance(driver).await {
            Ok(()) => {
                self.enter(LoginState::Success);
                Ok(())
            }
            Err(err) => {
                self.enter(LoginState::Failed);
                self.artifacts.capture(driver, artifact_label(&err)).await;
                Err(err)
            }
        }
    }

    async fn advance(&mut self, driver: &dyn Driver) -> Result<(), LoginError> {
        self.enter(LoginState::Start);
        driver.goto(&self.config.portal_url).await?;

        self.wait_for_form(driver).await?;
        self.enter(LoginState::FormLoaded);

        self.enter_identifier(driver).await?;
        self.enter(LoginState::IdentifierEntered);

        self.enter(LoginState::CaptchaPending);
        let challenge = CaptchaChallenge {
            site_key: self.config.site_key.clone(),
            page_url: driver.current_url().await?,
        };
        self.strategy
            .resolve(&challenge, driver)
            .await
            .map_err(LoginError::CaptchaTimeout)?;
        self.enter(LoginState::CaptchaResolved);

        // A resolution strategy can complete the login as a side effect;
        // submitting again would land on an error page.
        if driver.page_text().await?.contains(portal::LIST_MARKER) {
            return Ok(());
        }

        if !driver.click(portal::LOGIN_BUTTON).await? {
            // Tolerated: the page may have advanced past the form on its own.
            tracing::debug!("Login control absent");
        }
        self.enter(LoginState::Submitted);

        self.enter(LoginState::Verifying);
        self.verify(driver).await
    }

    async fn wait_for_form(&self, driver: &dyn Driver) -> Result<(), LoginError> {
        let timeout = self.config.timeouts.form_wait;
        let start = Instant::now();
        loop {
            if driver.text_of(portal::ID_TYPE_SELECT).await?.is_some() {
                return Ok(());
            }
            if start.elapsed() >= timeout {
                return Err(LoginError::FormNotFound(timeout));
            }
            sleep(FORM_POLL).await;
        }
    }

    async fn enter_identifier(&self, driver: &dyn Driver) -> Result<(), LoginError> {
        if !driver
            .select_value(portal::ID_TYPE_SELECT, &self.config.id_type)
            .await?
        {
            tracing::warn!("Identification type selector missing");
        }

        let entered = driver
            .set_value(portal::ID_NUMBER_FIELD, &self.config.id_number)
            .await?;
        let readback = driver.value_of(portal::ID_NUMBER_FIELD).await?;
        if !entered || readback.as_deref() != Some(self.config.id_number.as_str()) {
            // Scripted assignment did not stick; fall back to real keystrokes.
            tracing::debug!("Scripted identifier entry unverified, typing instead");
            driver.set_value(portal::ID_NUMBER_FIELD, "").await?;
            driver
                .type_into(portal::ID_NUMBER_FIELD, &self.config.id_number)
                .await?;
        }
        Ok(())
    }

    async fn verify(&self, driver: &dyn Driver) -> Result<(), LoginError> {
        let window = self.config.timeouts.submit_verify;
        let start = Instant::now();
        loop {
            let text = driver.page_text().await?;
            if text.contains(portal::LIST_MARKER) {
                return Ok(());
            }
            // The portal names the rejection explicitly; retrying the same
            // token cannot help.
            if text.contains("Error") && text.contains("robot") {
                return Err(LoginError::CaptchaRejected);
            }
            if start.elapsed() >= window {
                break;
            }
            sleep(VERIFY_POLL).await;
        }

        // No marker either way, but leaving the login endpoint still means
        // the portal let us through.
        let url = driver.current_url().await?;
        if !url.to_lowercase().contains(portal::LOGIN_URL_FRAGMENT) {
            return Ok(());
        }
        Err(LoginError::LoginUnconfirmed)
    }
}

fn artifact_label(err: &LoginError) -> &'static str {
    match err {
        LoginError::FormNotFound(_) => "form_timeout",
        LoginError::CaptchaTimeout(_) => "captcha_timeout",
        LoginError::CaptchaRejected => "robot_detected",
        LoginError::LoginUnconfirmed => "login_unconfirmed",
        LoginError::Driver(_) => "login_error",
    }
}
