//! Configuration loading from environment.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use anyhow::Context;
use secure_envelope::{EnvelopeKey, KeySize};

/// Upper bounds for the duration settings, in seconds.
const MAX_INTENT_TTL_SECS: i64 = 86_400;
const MAX_INTENT_RETENTION_SECS: i64 = 90 * 86_400;

/// Application configuration.
pub struct Config {
    pub port: u16,
    pub database_url: String,
    /// Wraps owner keys at rest. Never logged.
    pub master_key: EnvelopeKey,
    pub admin_token: String,
    pub gateway_url: String,
    /// Shared secret for signing gateway requests, if the switch expects it.
    pub gateway_secret: Option<String>,
    pub gateway_timeout: Duration,
    pub intent_ttl: chrono::Duration,
    pub otp_max_attempts: u32,
    pub txn_id_length: usize,
    pub rate_limit_per_minute: u32,
    pub intent_retention: chrono::Duration,
    pub sweep_interval: Duration,
}

impl Config {
    /// Loads configuration from environment variables.
    pub fn from_env() -> anyhow::Result<Self> {
        let port = parse_or("PORT", 3000)?;

        let database_url = required("DATABASE_URL")?;

        let master_key = EnvelopeKey::from_hex(&required("MASTER_KEY")?)
            .context("MASTER_KEY must be hex-encoded")?;
        if master_key.size() != KeySize::Aes256 {
            anyhow::bail!("MASTER_KEY must be 64 hex characters (256 bits)");
        }

        let admin_token = required("ADMIN_TOKEN")?;
        let gateway_url = required("GATEWAY_URL")?;
        let gateway_secret = env::var("GATEWAY_SECRET").ok().filter(|s| !s.is_empty());

        Ok(Self {
            port,
            database_url,
            master_key,
            admin_token,
            gateway_url,
            gateway_secret,
            gateway_timeout: Duration::from_secs(parse_or("GATEWAY_TIMEOUT_SECS", 15)?),
            intent_ttl: seconds_or("INTENT_TTL_SECS", 300, MAX_INTENT_TTL_SECS)?,
            otp_max_attempts: parse_or("OTP_MAX_ATTEMPTS", 3)?,
            txn_id_length: parse_or("TXN_ID_LENGTH", 35)?,
            rate_limit_per_minute: parse_or("RATE_LIMIT_PER_MINUTE", 60)?,
            intent_retention: seconds_or(
                "INTENT_RETENTION_SECS",
                86_400,
                MAX_INTENT_RETENTION_SECS,
            )?,
            sweep_interval: Duration::from_secs(parse_or("SWEEP_INTERVAL_SECS", 60)?),
        })
    }
}

fn required(name: &str) -> anyhow::Result<String> {
    env::var(name)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| anyhow::anyhow!("{} environment variable is required", name))
}

fn parse_or<T>(name: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    parse_value(name, env::var(name).ok(), default)
}

fn parse_value<T>(name: &str, raw: Option<String>, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match raw {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{} has an invalid value: {}", name, raw)),
        None => Ok(default),
    }
}

fn seconds_or(name: &str, default: i64, max: i64) -> anyhow::Result<chrono::Duration> {
    bounded_seconds(name, env::var(name).ok(), default, max)
}

/// Whole seconds in `1..=max`.
fn bounded_seconds(
    name: &str,
    raw: Option<String>,
    default: i64,
    max: i64,
) -> anyhow::Result<chrono::Duration> {
    let secs: i64 = parse_value(name, raw, default)?;
    if !(1..=max).contains(&secs) {
        anyhow::bail!("{} must be between 1 and {} seconds, got {}", name, max, secs);
    }
    chrono::Duration::try_seconds(secs).with_context(|| format!("{} is out of range", name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seconds_default_when_unset() {
        let ttl = bounded_seconds("INTENT_TTL_SECS", None, 300, MAX_INTENT_TTL_SECS).unwrap();
        assert_eq!(ttl, chrono::Duration::seconds(300));
    }

    #[test]
    fn test_seconds_parsed_and_trimmed() {
        let ttl =
            bounded_seconds("INTENT_TTL_SECS", Some(" 120 ".into()), 300, MAX_INTENT_TTL_SECS)
                .unwrap();
        assert_eq!(ttl, chrono::Duration::seconds(120));
    }

    #[test]
    fn test_huge_seconds_rejected_without_panic() {
        let err = bounded_seconds(
            "INTENT_TTL_SECS",
            Some(i64::MAX.to_string()),
            300,
            MAX_INTENT_TTL_SECS,
        )
        .unwrap_err();
        assert!(err.to_string().contains("INTENT_TTL_SECS"));
    }

    #[test]
    fn test_zero_and_negative_seconds_rejected() {
        for raw in ["0", "-5"] {
            let result = bounded_seconds(
                "INTENT_RETENTION_SECS",
                Some(raw.into()),
                86_400,
                MAX_INTENT_RETENTION_SECS,
            );
            assert!(result.is_err(), "{raw} should be rejected");
        }
    }

    #[test]
    fn test_unparsable_seconds_rejected() {
        let result = bounded_seconds("INTENT_TTL_SECS", Some("5m".into()), 300, MAX_INTENT_TTL_SECS);
        assert!(result.is_err());
    }
}
