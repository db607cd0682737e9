//! Settings for talking to the billing backend.
//!
//! Read from an optional `cargobill.{toml,json,yaml}` file in the working
//! directory, then from `CARGOBILL__`-prefixed environment variables
//! (`CARGOBILL__API__BASE_URL`, `CARGOBILL__POLICY__TOTALS_MODE`, ...). A
//! `.env` file is loaded first if present.

use config::{Config, Environment, File, FileFormat};
use serde::Deserialize;

use crate::core::{BillingError, BillingPolicy};

fn default_timeout_secs() -> u64 {
    30
}

/// REST endpoint settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ApiSettings {
    /// Base URL of the REST API, e.g. `https://backoffice.example/api`.
    pub base_url: String,
    /// Bearer token attached to mutating requests.
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Also attach the token to GET requests.
    #[serde(default)]
    pub auth_on_reads: bool,
}

/// Complete crate settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Settings {
    pub api: ApiSettings,
    #[serde(default)]
    pub policy: BillingPolicy,
}

impl Settings {
    /// Load from the optional settings file and the environment.
    pub fn load() -> Result<Self, BillingError> {
        dotenvy::dotenv().ok();

        let config = Config::builder()
            .add_source(File::with_name("cargobill").required(false))
            .add_source(
                Environment::with_prefix("CARGOBILL")
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()
            .map_err(|e| BillingError::Config(e.to_string()))?;

        config
            .try_deserialize()
            .map_err(|e| BillingError::Config(e.to_string()))
    }

    /// Parse settings from TOML text.
    pub fn from_toml(text: &str) -> Result<Self, BillingError> {
        Config::builder()
            .add_source(File::from_str(text, FileFormat::Toml))
            .build()
            .and_then(|config| config.try_deserialize())
            .map_err(|e| BillingError::Config(e.to_string()))
    }
}
