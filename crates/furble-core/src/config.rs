//! Application Configuration
//!
//! Loaded once at startup and shared read-only (`Arc<AppConfig>`) with every
//! component constructor.

use std::path::PathBuf;

use crate::error::{FurbleError, Result};

/// Process-wide settings
#[derive(Clone)]
pub struct AppConfig {
    /// Shared secret for the identifier codec
    pub secret_key: String,

    /// Stripe secret key (None = payments disabled)
    pub payment_api_key: Option<String>,

    /// Stripe webhook signing secret (None = webhook disabled)
    pub payment_webhook_secret: Option<String>,

    /// OpenAI API key (None = generation disabled)
    pub transformer_api_key: Option<String>,

    /// Image model used for edits
    pub transformer_model: String,

    /// Root for uploaded, generated and archived blobs
    pub storage_root: PathBuf,

    /// SQLite database file
    pub database_path: PathBuf,

    /// Portrait template sent with every generation
    pub template_path: PathBuf,

    /// Price of one portrait, in the smallest currency unit
    pub price_cents: i64,

    /// ISO currency code, lowercase
    pub currency: String,

    /// Server listen address
    pub bind_addr: String,
}

impl AppConfig {
    /// Create from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let secret_key = non_empty("FURBLE_SECRET_KEY")
            .ok_or_else(|| FurbleError::Config("FURBLE_SECRET_KEY not set".into()))?;

        let price_cents = match non_empty("FURBLE_PRICE_CENTS") {
            Some(raw) => raw
                .parse::<i64>()
                .ok()
                .filter(|cents| *cents > 0)
                .ok_or_else(|| {
                    FurbleError::Config(format!(
                        "FURBLE_PRICE_CENTS must be a positive integer, got '{raw}'"
                    ))
                })?,
            None => 1900,
        };

        Ok(Self {
            secret_key,
            payment_api_key: non_empty("STRIPE_SECRET_KEY"),
            payment_webhook_secret: non_empty("STRIPE_WEBHOOK_SECRET"),
            transformer_api_key: non_empty("OPENAI_API_KEY"),
            transformer_model: non_empty("OPENAI_IMAGE_MODEL")
                .unwrap_or_else(|| "gpt-image-1".into()),
            storage_root: non_empty("FURBLE_STORAGE_ROOT")
                .map_or_else(|| PathBuf::from("."), PathBuf::from),
            database_path: non_empty("FURBLE_DATABASE_PATH")
                .map_or_else(|| PathBuf::from("furble.db"), PathBuf::from),
            template_path: non_empty("FURBLE_TEMPLATE_PATH").map_or_else(
                || PathBuf::from("image_templates/magistrate_template.png"),
                PathBuf::from,
            ),
            price_cents,
            currency: non_empty("FURBLE_CURRENCY")
                .map_or_else(|| "usd".into(), |c| c.to_lowercase()),
            bind_addr: non_empty("BIND_ADDR").unwrap_or_else(|| "127.0.0.1:8000".into()),
        })
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("payments", &self.payment_api_key.is_some())
            .field("webhook", &self.payment_webhook_secret.is_some())
            .field("transformer", &self.transformer_api_key.is_some())
            .field("transformer_model", &self.transformer_model)
            .field("storage_root", &self.storage_root)
            .field("database_path", &self.database_path)
            .field("template_path", &self.template_path)
            .field("price_cents", &self.price_cents)
            .field("currency", &self.currency)
            .field("bind_addr", &self.bind_addr)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::from_lookup(lookup(&[("FURBLE_SECRET_KEY", "s3cret")])).unwrap();
        assert_eq!(config.price_cents, 1900);
        assert_eq!(config.currency, "usd");
        assert_eq!(config.transformer_model, "gpt-image-1");
        assert_eq!(config.storage_root, PathBuf::from("."));
        assert!(config.payment_api_key.is_none());
        assert!(config.transformer_api_key.is_none());
    }

    #[test]
    fn test_secret_required() {
        assert!(AppConfig::from_lookup(lookup(&[])).is_err());
        assert!(AppConfig::from_lookup(lookup(&[("FURBLE_SECRET_KEY", "  ")])).is_err());
    }

    #[test]
    fn test_price_must_be_positive() {
        let vars = [("FURBLE_SECRET_KEY", "s"), ("FURBLE_PRICE_CENTS", "-5")];
        assert!(AppConfig::from_lookup(lookup(&vars)).is_err());
    }

    #[test]
    fn test_debug_redacts_keys() {
        let vars = [("FURBLE_SECRET_KEY", "s3cret"), ("STRIPE_SECRET_KEY", "sk_test_abc")];
        let config = AppConfig::from_lookup(lookup(&vars)).unwrap();
        let printed = format!("{config:?}");
        assert!(!printed.contains("s3cret"));
        assert!(!printed.contains("sk_test_abc"));
    }
}
