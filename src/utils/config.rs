use std::env;
use std::path::PathBuf;

use url::Url;

pub const DEFAULT_TELEGRAM_API_URL: &str = "https://api.telegram.org";
pub const DEFAULT_CART_DIR: &str = ".storefront";

#[derive(Debug, Clone)]
pub struct Config {
    pub inventory_url: String,
    pub telegram_token: Option<String>,
    pub telegram_chat_id: Option<String>,
    pub telegram_api_url: String,
    pub cart_dir: PathBuf,
    pub price_grids_path: Option<PathBuf>,
    pub log_level: String,
    pub environment: String,
}

fn optional_var(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenv::dotenv().ok();
        let config = Config {
            inventory_url: optional_var("INVENTORY_URL")
                .ok_or_else(|| anyhow::anyhow!("INVENTORY_URL is not set"))?,
            telegram_token: optional_var("TG_TOKEN"),
            telegram_chat_id: optional_var("TG_CHAT_ID"),
            telegram_api_url: optional_var("TELEGRAM_API_URL")
                .unwrap_or_else(|| DEFAULT_TELEGRAM_API_URL.to_string()),
            cart_dir: optional_var("CART_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_CART_DIR)),
            price_grids_path: optional_var("PRICE_GRIDS_PATH").map(PathBuf::from),
            log_level: optional_var("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            environment: optional_var("APP_ENV").unwrap_or_else(|| "development".to_string()),
        };

        config.validate()?;
        tracing::info!("Config: successfully loaded for {} environment", config.environment);
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        check_http_url("INVENTORY_URL", &self.inventory_url)?;
        check_http_url("TELEGRAM_API_URL", &self.telegram_api_url)?;

        if self.is_production()
            && self.telegram_token.is_some() != self.telegram_chat_id.is_some()
        {
            return Err(anyhow::anyhow!(
                "TG_TOKEN and TG_CHAT_ID must be set together in production"
            ));
        }

        Ok(())
    }

    /// Token and chat id, when both are present.
    pub fn telegram(&self) -> Option<(&str, &str)> {
        match (&self.telegram_token, &self.telegram_chat_id) {
            (Some(token), Some(chat_id)) => Some((token.as_str(), chat_id.as_str())),
            _ => None,
        }
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

fn check_http_url(key: &str, value: &str) -> Result<(), anyhow::Error> {
    let url = Url::parse(value).map_err(|e| anyhow::anyhow!("{} is not a valid url: {}", key, e))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(anyhow::anyhow!("{} must start with 'http://' or 'https://'", key));
    }
    Ok(())
}
