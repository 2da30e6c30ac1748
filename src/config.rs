use std::env;
use std::time::Duration;

use crate::services::phone::PhonePolicy;

pub const DEFAULT_API_URL: &str = "https://bookme-backend-536445311459.europe-central2.run.app/api";

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub port: u16,
    pub api_base_url: String,
    pub fetch_timeout: Duration,
    pub country_code: String,
    pub phone_policy: PhonePolicy,
    pub session_ttl: Duration,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            port: env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3000),
            api_base_url: env::var("BOOKING_API_URL")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .map(|v| v.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            fetch_timeout: Duration::from_secs(
                env::var("BOOKING_FETCH_TIMEOUT_SECS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(10),
            ),
            country_code: env::var("BOOKING_COUNTRY_CODE")
                .ok()
                .filter(|v| !v.is_empty() && v.chars().all(|c| c.is_ascii_digit()))
                .unwrap_or_else(|| "998".to_string()),
            phone_policy: env::var("BOOKING_PHONE_POLICY")
                .map(|v| PhonePolicy::parse(&v))
                .unwrap_or_default(),
            session_ttl: Duration::from_secs(
                60 * env::var("SESSION_TTL_MINUTES")
                    .ok()
                    .and_then(|v| v.parse::<u64>().ok())
                    .unwrap_or(30),
            ),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            api_base_url: DEFAULT_API_URL.to_string(),
            fetch_timeout: Duration::from_secs(10),
            country_code: "998".to_string(),
            phone_policy: PhonePolicy::default(),
            session_ttl: Duration::from_secs(30 * 60),
        }
    }
}
