use std::env;

use bazaar_common::Secret;
use log::*;

const DEFAULT_BZR_HOST: &str = "127.0.0.1";
const DEFAULT_BZR_PORT: u16 = 8360;
const DEFAULT_LOW_STOCK_THRESHOLD: i64 = 5;

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub auth: AuthConfig,
    /// The available-units threshold at or below which low-stock alerts are raised.
    pub low_stock_threshold: i64,
    /// Payment provider configuration
    pub provider_config: ProviderConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_BZR_HOST.to_string(),
            port: DEFAULT_BZR_PORT,
            database_url: String::default(),
            auth: AuthConfig::default(),
            low_stock_threshold: DEFAULT_LOW_STOCK_THRESHOLD,
            provider_config: ProviderConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env::var("BZR_HOST").ok().unwrap_or_else(|| DEFAULT_BZR_HOST.into());
        let port = env::var("BZR_PORT")
            .map(|s| {
                s.parse::<u16>().unwrap_or_else(|e| {
                    error!(
                        "🪛️ {s} is not a valid port for BZR_PORT. {e} Using the default, {DEFAULT_BZR_PORT}, \
                         instead."
                    );
                    DEFAULT_BZR_PORT
                })
            })
            .ok()
            .unwrap_or(DEFAULT_BZR_PORT);
        let database_url = env::var("BZR_DATABASE_URL").ok().unwrap_or_else(|| {
            error!("🪛️ BZR_DATABASE_URL is not set. Please set it to the URL for the Bazaar database.");
            String::default()
        });
        let auth = AuthConfig::try_from_env().unwrap_or_else(|e| {
            warn!(
                "🪛️ Could not load the authentication configuration from environment variables. {e}. Reverting to \
                 the default configuration."
            );
            AuthConfig::default()
        });
        let low_stock_threshold = env::var("BZR_LOW_STOCK_THRESHOLD")
            .ok()
            .and_then(|s| {
                s.parse::<i64>()
                    .map_err(|e| warn!("🪛️ Invalid configuration value for BZR_LOW_STOCK_THRESHOLD. {e}"))
                    .ok()
            })
            .unwrap_or(DEFAULT_LOW_STOCK_THRESHOLD);
        let provider_config = ProviderConfig::from_env_or_defaults();
        Self { host, port, database_url, auth, low_stock_threshold, provider_config }
    }
}

//-------------------------------------------------  AuthConfig  -------------------------------------------------------
/// JWT validation settings. This server never issues end-user tokens; the identity service does that with the same
/// shared secret.
#[derive(Clone, Debug)]
pub struct AuthConfig {
    pub jwt_secret: Secret<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        warn!(
            "🚨️🚨️🚨️ The JWT secret has not been set. I'm using an insecure default for this session. DO NOT \
             operate like this in production; set BZR_JWT_SECRET instead. 🚨️🚨️🚨️"
        );
        Self { jwt_secret: Secret::new("bazaar-dev-secret-change-me-32-chars".to_string()) }
    }
}

impl AuthConfig {
    pub fn try_from_env() -> Result<Self, crate::errors::ServerError> {
        let secret = env::var("BZR_JWT_SECRET")
            .map_err(|e| crate::errors::ServerError::ConfigurationError(format!("{e} [BZR_JWT_SECRET]")))?;
        Ok(Self { jwt_secret: Secret::new(secret) })
    }
}

//-----------------------------------------------  ProviderConfig  -----------------------------------------------------
/// Settings for the external payment provider.
///
/// `webhook_secret` is deliberately an `Option`: when it is absent, webhook processing hard-fails instead of
/// skipping verification. An unsigned webhook must never be able to mark orders as paid.
#[derive(Clone, Debug, Default)]
pub struct ProviderConfig {
    /// API key used to create hosted checkout sessions.
    pub secret_key: Secret<String>,
    /// Shared secret for webhook signature verification.
    pub webhook_secret: Option<Secret<String>>,
    /// Base URL of the provider's REST API.
    pub api_url: String,
    /// Where the provider redirects the customer after a successful payment.
    pub success_url: String,
    /// Where the provider redirects the customer after an abandoned payment.
    pub cancel_url: String,
}

impl ProviderConfig {
    pub fn from_env_or_defaults() -> Self {
        let secret_key = Secret::new(env::var("BZR_PAYMENT_SECRET_KEY").unwrap_or_else(|_| {
            error!("🪛️ BZR_PAYMENT_SECRET_KEY is not set. Checkout session creation will be rejected upstream.");
            String::default()
        }));
        let webhook_secret = match env::var("BZR_PAYMENT_WEBHOOK_SECRET") {
            Ok(s) if !s.is_empty() => Some(Secret::new(s)),
            _ => {
                error!(
                    "🪛️ BZR_PAYMENT_WEBHOOK_SECRET is not set. Webhook deliveries will be rejected until it is \
                     configured."
                );
                None
            },
        };
        let api_url = env::var("BZR_PAYMENT_API_URL").unwrap_or_else(|_| {
            info!("🪛️ BZR_PAYMENT_API_URL is not set. Using the provider's public endpoint.");
            "https://api.payments.example.com".to_string()
        });
        let success_url = env::var("BZR_PAYMENT_SUCCESS_URL")
            .unwrap_or_else(|_| "http://localhost:3001/payment/success".to_string());
        let cancel_url =
            env::var("BZR_PAYMENT_CANCEL_URL").unwrap_or_else(|_| "http://localhost:3001/payment/cancel".to_string());
        Self { secret_key, webhook_secret, api_url, success_url, cancel_url }
    }
}
