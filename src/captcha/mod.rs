//! Captcha resolution strategies.
//!
//! The login machine is strategy-agnostic: it hands a [`CaptchaChallenge`]
//! to whichever [`CaptchaStrategy`] it was built with and waits for a token.
//! This keeps the most failure-prone coupling in the system (the portal's
//! anti-bot widget and the third-party solver network) out of the
//! navigation logic.

mod manual;
mod solver;

pub use manual::ManualWait;
pub use solver::{AutoSolve, SolverClient, TaskPoll};

use std::time::Duration;

use async_trait::async_trait;

use crate::browser::Driver;
use crate::error::CaptchaError;
use crate::models::{CaptchaChallenge, CaptchaToken};

/// Interval between resolution polls, for both strategies.
pub(crate) const POLL_INTERVAL: Duration = Duration::from_secs(2);

/// A way of obtaining a captcha token for the login form.
#[async_trait]
pub trait CaptchaStrategy: Send + Sync {
    /// Human-readable name for logs.
    fn name(&self) -> &str;

    /// Produce a token for `challenge`, driving the page as needed.
    async fn resolve(
        &self,
        challenge: &CaptchaChallenge,
        driver: &dyn Driver,
    ) -> Result<CaptchaToken, CaptchaError>;
}
