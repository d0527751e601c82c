// src/config.rs

use std::collections::HashMap;
use std::env;

use anyhow::{Context, Result};
use url::Url;

// A struct to hold all configuration, loaded once at startup from the .env file.
#[derive(Clone, Debug)]
pub struct Config {
    // Server settings
    pub port: u16,

    /// Optional per-network RPC endpoint overrides (network name -> URL).
    /// Networks without an override use the registry's public default.
    pub rpc_url_overrides: HashMap<String, String>,

    // Swap aggregator
    pub swap_api_url: String,
    pub swap_api_key: Option<String>,

    // Bridging provider
    pub bridge_api_url: String,

    /// Fallback signing key for write operations when the caller does not
    /// supply one per call. Never logged.
    pub wallet_private_key: Option<String>,
}

impl Config {
    /// Loads configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        // Load variables from the .env file into the environment
        dotenvy::dotenv().ok();

        let rpc_url_overrides: HashMap<String, String> = match env::var("RPC_URL_OVERRIDES") {
            Ok(raw) => {
                let parsed: HashMap<String, String> = serde_json::from_str(&raw)
                    .context("RPC_URL_OVERRIDES must be a JSON map of network name -> RPC URL")?;
                for (network, url) in &parsed {
                    Url::parse(url).with_context(|| {
                        format!("RPC_URL_OVERRIDES entry for '{}' is not a valid URL", network)
                    })?;
                }
                parsed
            }
            Err(_) => HashMap::new(),
        };

        Ok(Config {
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .context("PORT must be a valid number")?,

            rpc_url_overrides,

            swap_api_url: env::var("SWAP_API_URL")
                .unwrap_or_else(|_| "https://api.1inch.dev/swap/v6.0".to_string()),
            // absence is surfaced as ConfigurationError at call time, not here
            swap_api_key: env::var("SWAP_API_KEY").ok(),

            bridge_api_url: env::var("BRIDGE_API_URL")
                .unwrap_or_else(|_| "https://app.across.to/api".to_string()),

            wallet_private_key: env::var("WALLET_PRIVATE_KEY").ok(),
        })
    }
}
