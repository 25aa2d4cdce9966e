//! Run configuration, loaded from TOML with environment overrides for the
//! values people prefer to keep out of files.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use secrecy::SecretString;
use serde::Deserialize;

use crate::duration::deserialize_duration;

/// Login endpoint of the production portal.
pub const DEFAULT_PORTAL_URL: &str =
    "https://sixon.com.ar/PortalClientes_CALF_PROD/com.portalclientes.portalloginsinregistro";

fn default_portal_url() -> String {
    DEFAULT_PORTAL_URL.to_string()
}

/// Identification type 4 is the member number, the common case.
fn default_id_type() -> String {
    "4".to_string()
}

fn default_captcha_timeout() -> Duration {
    Duration::from_secs(120)
}

fn default_form_wait() -> Duration {
    Duration::from_secs(30)
}

fn default_submit_verify() -> Duration {
    Duration::from_secs(20)
}

fn default_detail_settle() -> Duration {
    Duration::from_secs(5)
}

fn default_debug_dir() -> PathBuf {
    PathBuf::from("debug")
}

/// Bounded-wait windows used by the pipeline.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TimeoutsConfig {
    /// How long a captcha strategy may take to produce a token.
    #[serde(
        default = "default_captcha_timeout",
        deserialize_with = "deserialize_duration"
    )]
    pub captcha: Duration,

    /// How long the identification form may take to appear.
    #[serde(
        default = "default_form_wait",
        deserialize_with = "deserialize_duration"
    )]
    pub form_wait: Duration,

    /// How long after submit to poll for a login outcome marker.
    #[serde(
        default = "default_submit_verify",
        deserialize_with = "deserialize_duration"
    )]
    pub submit_verify: Duration,

    /// Settle time after triggering a detail-view navigation.
    #[serde(
        default = "default_detail_settle",
        deserialize_with = "deserialize_duration"
    )]
    pub detail_settle: Duration,
}

impl Default for TimeoutsConfig {
    fn default() -> Self {
        Self {
            captcha: default_captcha_timeout(),
            form_wait: default_form_wait(),
            submit_verify: default_submit_verify(),
            detail_settle: default_detail_settle(),
        }
    }
}

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Login endpoint of the customer portal.
    pub portal_url: String,

    /// Identification type code the portal expects (1=DNI, 2=CUIT, 4=SOCIO).
    pub id_type: String,

    /// Identifier value entered into the login form.
    pub id_number: String,

    /// reCAPTCHA site key of the login page, needed by the automated solver.
    pub site_key: String,

    /// Solver API key; presence enables the automated captcha strategy.
    pub solver_api_key: Option<SecretString>,

    /// Run Chrome without a visible window.
    pub headless: bool,

    /// Where page snapshots are written on failures.
    pub debug_dir: PathBuf,

    /// Bounded-wait windows.
    pub timeouts: TimeoutsConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            portal_url: default_portal_url(),
            id_type: default_id_type(),
            id_number: String::new(),
            site_key: String::new(),
            solver_api_key: None,
            headless: false,
            debug_dir: default_debug_dir(),
            timeouts: TimeoutsConfig::default(),
        }
    }
}

impl Config {
    /// Load config from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Load config from a file, or return default config if file doesn't exist.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Apply process-environment overrides on top of file values.
    pub fn apply_env_overrides(&mut self) {
        self.apply_env_from(|name| std::env::var(name).ok());
    }

    fn apply_env_from(&mut self, get: impl Fn(&str) -> Option<String>) {
        if let Some(value) = get("CALF_TIPO_ID") {
            self.id_type = value;
        }
        if let Some(value) = get("CALF_NRO_ID") {
            self.id_number = value;
        }
        if let Some(value) = get("CALF_SITE_KEY") {
            self.site_key = value;
        }
        if let Some(value) = get("ANTICAPTCHA_KEY") {
            self.solver_api_key = Some(SecretString::from(value));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn defaults_match_portal_expectations() {
        let config = Config::default();
        assert_eq!(config.portal_url, DEFAULT_PORTAL_URL);
        assert_eq!(config.id_type, "4");
        assert!(config.id_number.is_empty());
        assert!(!config.headless);
        assert_eq!(config.timeouts.captcha, Duration::from_secs(120));
        assert_eq!(config.timeouts.form_wait, Duration::from_secs(30));
        assert_eq!(config.timeouts.submit_verify, Duration::from_secs(20));
        assert_eq!(config.timeouts.detail_settle, Duration::from_secs(5));
    }

    #[test]
    fn loads_partial_file() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("calfetch.toml");

        let mut file = std::fs::File::create(&path)?;
        writeln!(file, "id_number = \"1234567\"")?;
        writeln!(file, "headless = true")?;
        writeln!(file, "[timeouts]")?;
        writeln!(file, "captcha = \"2m\"")?;

        let config = Config::load(&path)?;
        assert_eq!(config.id_number, "1234567");
        assert!(config.headless);
        assert_eq!(config.timeouts.captcha, Duration::from_secs(120));
        // Untouched sections keep their defaults.
        assert_eq!(config.timeouts.form_wait, Duration::from_secs(30));
        assert_eq!(config.id_type, "4");

        Ok(())
    }

    #[test]
    fn load_or_default_missing_file() -> Result<()> {
        let dir = TempDir::new()?;
        let config = Config::load_or_default(&dir.path().join("missing.toml"))?;
        assert_eq!(config.portal_url, DEFAULT_PORTAL_URL);
        Ok(())
    }

    #[test]
    fn env_overrides_file_values() {
        let mut config = Config {
            id_number: "111".to_string(),
            ..Default::default()
        };

        config.apply_env_from(|name| match name {
            "CALF_NRO_ID" => Some("222".to_string()),
            "CALF_TIPO_ID" => Some("1".to_string()),
            "ANTICAPTCHA_KEY" => Some("key-abc".to_string()),
            _ => None,
        });

        assert_eq!(config.id_number, "222");
        assert_eq!(config.id_type, "1");
        assert!(config.solver_api_key.is_some());
    }

    #[test]
    fn env_absent_keeps_file_values() {
        let mut config = Config {
            id_number: "111".to_string(),
            ..Default::default()
        };

        config.apply_env_from(|_| None);

        assert_eq!(config.id_number, "111");
        assert!(config.solver_api_key.is_none());
    }
}
