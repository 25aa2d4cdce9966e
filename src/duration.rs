//! Parsing for human-readable duration strings like "120s" or "2m".

use std::time::Duration;

use anyhow::{Context, Result};
use serde::{de, Deserialize, Deserializer};

/// Parse a duration string like "2m", "30s" or "1h".
///
/// Supported units: `h` (hours), `m` (minutes), `s` (seconds). Input is
/// case-insensitive and surrounding whitespace is ignored.
pub fn parse_duration(s: &str) -> Result<Duration> {
    let s = s.trim().to_lowercase();
    let (num, unit) = if let Some(num) = s.strip_suffix('h') {
        (num, 60 * 60)
    } else if let Some(num) = s.strip_suffix('m') {
        (num, 60)
    } else if let Some(num) = s.strip_suffix('s') {
        (num, 1)
    } else {
        anyhow::bail!("Duration must end with h, m, or s");
    };

    let num: u64 = num.parse().context("Invalid number in duration")?;
    let secs = num.checked_mul(unit).context("Duration is too large")?;
    Ok(Duration::from_secs(secs))
}

/// Serde deserializer for duration strings.
///
/// Use with `#[serde(deserialize_with = "deserialize_duration")]`.
pub fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    parse_duration(&s).map_err(de::Error::custom)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_each_unit() {
        assert_eq!(parse_duration("120s").unwrap(), Duration::from_secs(120));
        assert_eq!(parse_duration("2m").unwrap(), Duration::from_secs(120));
        assert_eq!(parse_duration("1h").unwrap(), Duration::from_secs(3600));
    }

    #[test]
    fn trims_and_ignores_case() {
        assert_eq!(parse_duration(" 30S ").unwrap(), Duration::from_secs(30));
        assert_eq!(parse_duration("5M").unwrap(), Duration::from_secs(300));
    }

    #[test]
    fn rejects_missing_or_unknown_unit() {
        assert!(parse_duration("120").is_err());
        assert!(parse_duration("1d").is_err());
        assert!(parse_duration("s").is_err());
        assert!(parse_duration("").is_err());
    }

    #[test]
    fn rejects_overflow() {
        let max = u64::MAX.to_string();
        assert!(parse_duration(&format!("{max}h")).is_err());
        assert!(parse_duration(&format!("{max}s")).is_ok());
    }

    #[test]
    fn deserializes_in_toml() {
        #[derive(Deserialize)]
        struct Probe {
            #[serde(deserialize_with = "deserialize_duration")]
            window: Duration,
        }

        let probe: Probe = toml::from_str(r#"window = "20s""#).unwrap();
        assert_eq!(probe.window, Duration::from_secs(20));
    }
}
