//! Manual-wait strategy: let a human solve the challenge in the visible
//! browser and watch for the widget to publish its token.

use std::time::{Duration, Instant};

use async_trait::async_trait;

use super::{CaptchaStrategy, POLL_INTERVAL};
use crate::browser::Driver;
use crate::error::CaptchaError;
use crate::models::{CaptchaChallenge, CaptchaToken};
use crate::portal;

/// Tokens shorter than this are the widget's intermediate state, not a
/// solved response.
const MIN_TOKEN_LEN: usize = 10;

/// How long before telling the operator the run is waiting on them.
const NOTICE_AFTER: Duration = Duration::from_secs(5);

/// Poll the hidden response field until someone solves the challenge.
pub struct ManualWait {
    timeout: Duration,
}

impl ManualWait {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

#[async_trait]
impl CaptchaStrategy for ManualWait {
    fn name(&self) -> &str {
        "manual-wait"
    }

    async fn resolve(
        &self,
        _challenge: &CaptchaChallenge,
        driver: &dyn Driver,
    ) -> Result<CaptchaToken, CaptchaError> {
        let start = Instant::now();
        let mut notified = false;

        loop {
            match driver.value_of(portal::RECAPTCHA_RESPONSE).await? {
                // No response field at all: the challenge was never presented.
                None => return Ok(CaptchaToken::implicit()),
                Some(value) if value.len() > MIN_TOKEN_LEN => {
                    tracing::info!("Captcha resolved");
                    return Ok(CaptchaToken::new(value));
                }
                Some(_) => {}
            }

            if !notified && start.elapsed() > NOTICE_AFTER {
                println!(
                    ">> Resuelva el captcha en el navegador (timeout: {}s)",
                    self.timeout.as_secs()
                );
                notified = true;
            }

            if start.elapsed() >= self.timeout {
                return Err(CaptchaError::Timeout(self.timeout));
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }
}
