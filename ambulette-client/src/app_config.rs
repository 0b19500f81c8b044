use ambulette_core::otp::{
    OtpPolicy, SendFailureMode, OTP_CODE_LENGTH, OTP_TTL_SECONDS, RESEND_COOLDOWN_SECONDS,
};
use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub otp: OtpConfig,
    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_seconds: default_timeout(),
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_timeout() -> u64 { 30 }

#[derive(Debug, Deserialize, Clone)]
pub struct OtpConfig {
    #[serde(default = "default_expiry")]
    pub expiry_seconds: u32,
    #[serde(default = "default_cooldown")]
    pub resend_cooldown_seconds: u32,
    #[serde(default = "default_code_length")]
    pub code_length: usize,
    /// Degraded mode for flaky SMS gateways, off in production
    #[serde(default)]
    pub fail_open_on_send: bool,
}

impl Default for OtpConfig {
    fn default() -> Self {
        Self {
            expiry_seconds: default_expiry(),
            resend_cooldown_seconds: default_cooldown(),
            code_length: default_code_length(),
            fail_open_on_send: false,
        }
    }
}

fn default_expiry() -> u32 { OTP_TTL_SECONDS }
fn default_cooldown() -> u32 { RESEND_COOLDOWN_SECONDS }
fn default_code_length() -> usize { OTP_CODE_LENGTH }

impl OtpConfig {
    pub fn policy(&self) -> OtpPolicy {
        OtpPolicy {
            expiry_seconds: self.expiry_seconds,
            cooldown_seconds: self.resend_cooldown_seconds,
            code_length: self.code_length,
            send_failure: if self.fail_open_on_send {
                SendFailureMode::FailOpen
            } else {
                SendFailureMode::Strict
            },
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct LogConfig {
    pub filter: Option<String>,
}

impl Config {
    /// Layered load from `./config` and `AMBULETTE__*` environment variables
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::load_from("config", environment())
    }

    pub fn load_from(dir: &str, env_source: config::Environment) -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            .add_source(config::File::with_name(&format!("{}/default", dir)).required(false))
            .add_source(config::File::with_name(&format!("{}/{}", dir, run_mode)).required(false))
            // Local overrides, never checked in
            .add_source(config::File::with_name(&format!("{}/local", dir)).required(false))
            .add_source(env_source)
            .build()?;

        s.try_deserialize()
    }
}

/// `AMBULETTE__API__BASE_URL=...` sets `api.base_url`
pub fn environment() -> config::Environment {
    config::Environment::with_prefix("AMBULETTE")
        .prefix_separator("__")
        .separator("__")
        .try_parsing(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env_with(pairs: &[(&str, &str)]) -> config::Environment {
        let map: config::Map<String, String> =
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        environment().source(Some(map))
    }

    #[test]
    fn test_defaults_without_files() {
        let cfg = Config::load_from("does-not-exist", env_with(&[])).unwrap();
        assert_eq!(cfg.api.base_url, "http://localhost:8000");
        assert_eq!(cfg.api.timeout_seconds, 30);

        let policy = cfg.otp.policy();
        assert_eq!(policy, OtpPolicy::default());
    }

    #[test]
    fn test_environment_overrides() {
        let cfg = Config::load_from(
            "does-not-exist",
            env_with(&[
                ("AMBULETTE__API__BASE_URL", "https://api.example.test"),
                ("AMBULETTE__OTP__FAIL_OPEN_ON_SEND", "true"),
                ("AMBULETTE__OTP__RESEND_COOLDOWN_SECONDS", "30"),
            ]),
        )
        .unwrap();

        assert_eq!(cfg.api.base_url, "https://api.example.test");
        let policy = cfg.otp.policy();
        assert_eq!(policy.send_failure, SendFailureMode::FailOpen);
        assert_eq!(policy.cooldown_seconds, 30);
        assert_eq!(policy.expiry_seconds, 300);
    }
}
