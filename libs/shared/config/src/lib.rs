use std::env;
use tracing::warn;

const DEFAULT_HTTP_TIMEOUT_SECONDS: u64 = 30;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub api_base_url: String,
    pub api_auth_token: String,
    pub http_timeout_seconds: u64,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let config = Self {
            api_base_url: env::var("AGENDA_API_URL")
                .unwrap_or_else(|_| {
                    warn!("AGENDA_API_URL not set, using empty value");
                    String::new()
                }),
            api_auth_token: env::var("AGENDA_API_TOKEN")
                .unwrap_or_else(|_| {
                    warn!("AGENDA_API_TOKEN not set, requests will be unauthenticated");
                    String::new()
                }),
            http_timeout_seconds: env::var("AGENDA_HTTP_TIMEOUT_SECONDS")
                .ok()
                .and_then(|raw| {
                    raw.parse()
                        .map_err(|_| {
                            warn!("AGENDA_HTTP_TIMEOUT_SECONDS is not a number, using default");
                        })
                        .ok()
                })
                .unwrap_or(DEFAULT_HTTP_TIMEOUT_SECONDS),
        };

        if !config.is_configured() {
            warn!("Application not fully configured - missing environment variables");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.api_base_url.is_empty()
    }
}
