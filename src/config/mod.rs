//! Application configuration
//!
//! All credentials and tunables are read from the environment exactly once,
//! in [`Config::from_env`], and the resulting struct is passed around
//! explicitly. Nothing reads the environment at request time.

use std::env;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,

    /// Textbelt API key; absent means sends fail unless `test_mode` is on.
    pub textbelt_api_key: Option<String>,
    /// Reply webhook URL forwarded to Textbelt so inbound SMS come back here.
    pub textbelt_webhook_url: Option<String>,

    pub openai_api_key: Option<String>,
    pub openai_model: String,
    pub openai_base_url: String,

    /// Shared secret for webhook signature checks; absent skips validation.
    pub webhook_secret: Option<String>,
    /// When false, a bad signature is logged but the request is still served.
    pub enforce_signature: bool,

    pub tone_sample: String,
    pub leads_csv: String,
    pub chat_dir: String,

    /// Short-circuit outbound sends with synthetic message ids.
    pub test_mode: bool,

    /// Seconds to sleep between leads during a follow-up wave.
    pub delay_sec: u64,
    pub wave_on_start: bool,

    pub request_timeout: Duration,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            host: env::var("HOST").unwrap_or_else(|_| "127.0.0.1".into()),
            port: env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(5000),
            textbelt_api_key: env::var("TEXTBELT_API_KEY").ok(),
            textbelt_webhook_url: env::var("TEXTBELT_WEBHOOK_URL").ok(),
            openai_api_key: env::var("OPENAI_API_KEY").ok(),
            openai_model: env::var("OPENAI_MODEL").unwrap_or_else(|_| "gpt-3.5-turbo".into()),
            openai_base_url: env::var("OPENAI_BASE_URL")
                .unwrap_or_else(|_| "https://api.openai.com/v1".into()),
            webhook_secret: env::var("WEBHOOK_SECRET").ok(),
            enforce_signature: env_flag("ENFORCE_SIGNATURE"),
            tone_sample: env::var("AGENT_TONE_SAMPLE")
                .unwrap_or_else(|_| "Hey, checking in on that property we discussed.".into()),
            leads_csv: env::var("LEADS_CSV").unwrap_or_else(|_| "leads.csv".into()),
            chat_dir: env::var("CHAT_DIR").unwrap_or_else(|_| "chat_history".into()),
            test_mode: env_flag("TEST_MODE"),
            delay_sec: env::var("DELAY_SEC")
                .ok()
                .and_then(|d| d.parse().ok())
                .unwrap_or(60),
            wave_on_start: env_flag("WAVE_ON_START"),
            request_timeout: Duration::from_secs(
                env::var("REQUEST_TIMEOUT_SECS")
                    .ok()
                    .and_then(|t| t.parse().ok())
                    .unwrap_or(30),
            ),
        })
    }

    /// `"test"` or `"live"`, reported by the health endpoint.
    pub fn mode(&self) -> &'static str {
        if self.test_mode {
            "test"
        } else {
            "live"
        }
    }
}

fn env_flag(name: &str) -> bool {
    env::var(name)
        .map(|v| v.eq_ignore_ascii_case("true") || v == "1")
        .unwrap_or(false)
}

#[cfg(test)]
impl Config {
    /// A fully-offline config for tests: no credentials, test mode on.
    pub fn for_tests(chat_dir: &str) -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 0,
            textbelt_api_key: None,
            textbelt_webhook_url: None,
            openai_api_key: None,
            openai_model: "gpt-3.5-turbo".into(),
            openai_base_url: "https://api.openai.com/v1".into(),
            webhook_secret: None,
            enforce_signature: false,
            tone_sample: "Hey, checking in on that property we discussed.".into(),
            leads_csv: "leads.csv".into(),
            chat_dir: chat_dir.into(),
            test_mode: true,
            delay_sec: 0,
            wave_on_start: false,
            request_timeout: Duration::from_secs(5),
        }
    }
}
