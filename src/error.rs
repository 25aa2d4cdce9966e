//! Error taxonomy for the session-acquisition pipeline.
//!
//! Only login-phase failures are fatal to a run. Extraction problems are
//! degradations: they are logged, show up as empty fields in the output, and
//! never surface as errors from the extraction modules.

use std::time::Duration;

use thiserror::Error;

/// Failure of a captcha resolution strategy.
#[derive(Debug, Error)]
pub enum CaptchaError {
    #[error("captcha not resolved within {0:?}")]
    Timeout(Duration),
    #[error("solver rejected the task: {0}")]
    Solver(String),
    #[error(transparent)]
    Driver(#[from] anyhow::Error),
}

/// Fatal login failures. Each one aborts the run with a non-zero exit.
#[derive(Debug, Error)]
pub enum LoginError {
    #[error("identification form did not appear within {0:?}")]
    FormNotFound(Duration),
    #[error("no captcha token obtained")]
    CaptchaTimeout(#[source] CaptchaError),
    #[error("portal flagged the session as automated after submit")]
    CaptchaRejected,
    #[error("no login success or failure marker observed")]
    LoginUnconfirmed,
    #[error(transparent)]
    Driver(#[from] anyhow::Error),
}
