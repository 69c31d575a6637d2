use std::time::Duration;
use tracing::warn;

pub const SESSION_TTL_ENV: &str = "PORTAL_SESSION_TTL_SECS";
pub const CHALLENGE_LATENCY_ENV: &str = "PORTAL_CHALLENGE_LATENCY_MS";

const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(24 * 60 * 60);
const DEFAULT_CHALLENGE_LATENCY: Duration = Duration::from_millis(1000);

/// Tunables for [`crate::SessionGate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateConfig {
    /// How long a persisted session stays valid after issue.
    pub session_ttl: Duration,
    /// Simulated round-trip for sending and verifying the OTP.
    pub challenge_latency: Duration,
    pub phone_digits: usize,
    pub otp_digits: usize,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            session_ttl: DEFAULT_SESSION_TTL,
            challenge_latency: DEFAULT_CHALLENGE_LATENCY,
            phone_digits: 10,
            otp_digits: 6,
        }
    }
}

impl GateConfig {
    /// Build from `PORTAL_SESSION_TTL_SECS` and `PORTAL_CHALLENGE_LATENCY_MS`,
    /// keeping defaults for anything unset or unparsable.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(secs) = read_u64(SESSION_TTL_ENV) {
            config.session_ttl = Duration::from_secs(secs);
        }
        if let Some(ms) = read_u64(CHALLENGE_LATENCY_ENV) {
            config.challenge_latency = Duration::from_millis(ms);
        }
        config
    }

    pub fn with_session_ttl(mut self, ttl: Duration) -> Self {
        self.session_ttl = ttl;
        self
    }

    pub fn with_challenge_latency(mut self, latency: Duration) -> Self {
        self.challenge_latency = latency;
        self
    }

    /// TTL in millis, saturating at `i64::MAX` for absurdly long settings.
    pub(crate) fn session_ttl_millis(&self) -> i64 {
        i64::try_from(self.session_ttl.as_millis()).unwrap_or(i64::MAX)
    }
}

fn read_u64(key: &str) -> Option<u64> {
    let raw = std::env::var(key).ok()?;
    match parse_u64(&raw) {
        Some(value) => Some(value),
        None => {
            warn!(key, value = %raw, "ignoring unparsable setting, using default");
            None
        }
    }
}

fn parse_u64(raw: &str) -> Option<u64> {
    raw.trim().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_portal_behaviour() {
        let config = GateConfig::default();
        assert_eq!(config.session_ttl, Duration::from_secs(86_400));
        assert_eq!(config.challenge_latency, Duration::from_secs(1));
        assert_eq!(config.phone_digits, 10);
        assert_eq!(config.otp_digits, 6);
    }

    #[test]
    fn parses_numeric_settings_only() {
        assert_eq!(parse_u64(" 3600 "), Some(3600));
        assert_eq!(parse_u64("soon"), None);
        assert_eq!(parse_u64("-5"), None);
    }

    #[test]
    fn huge_ttl_saturates_instead_of_wrapping() {
        let config = GateConfig::default().with_session_ttl(Duration::from_secs(u64::MAX / 1000));
        assert_eq!(config.session_ttl_millis(), i64::MAX);

        let record = crate::SessionRecord::new("9876543210", crate::Role::Police, 0);
        assert!(record.is_valid_at(1, config.session_ttl_millis()));
    }

    #[test]
    fn builder_overrides() {
        let config = GateConfig::default()
            .with_session_ttl(Duration::from_secs(60))
            .with_challenge_latency(Duration::ZERO);
        assert_eq!(config.session_ttl_millis(), 60_000);
        assert_eq!(config.challenge_latency, Duration::ZERO);
    }
}
