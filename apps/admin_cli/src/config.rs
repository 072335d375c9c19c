use std::{path::Path, time::Duration};

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use shared::domain::Scope;

pub const DEFAULT_CONFIG_FILE: &str = "agent-admin.toml";
const ENV_PREFIX: &str = "AGENT_ADMIN";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Settings {
    pub server_url: String,
    pub scope: Scope,
    pub request_timeout_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_url: "http://127.0.0.1:8010".into(),
            scope: Scope::Local,
            request_timeout_secs: 30,
        }
    }
}

impl Settings {
    pub fn with_overrides(mut self, server_url: Option<String>, scope: Option<Scope>) -> Self {
        if let Some(server_url) = server_url {
            self.server_url = server_url;
        }
        if let Some(scope) = scope {
            self.scope = scope;
        }
        self
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }
}

/// Defaults, then `agent-admin.toml` in the working directory (optional),
/// then an explicit file (required when given), then `AGENT_ADMIN__*` env vars.
pub fn load_settings(explicit_file: Option<&Path>) -> Result<Settings, ConfigError> {
    let defaults = Settings::default();
    let mut builder = Config::builder()
        .set_default("server_url", defaults.server_url)?
        .set_default("scope", defaults.scope.as_str())?
        .set_default("request_timeout_secs", defaults.request_timeout_secs)?
        .add_source(File::from(Path::new(DEFAULT_CONFIG_FILE)).required(false));

    if let Some(path) = explicit_file {
        builder = builder.add_source(File::from(path).required(true));
    }

    builder
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true),
        )
        .build()?
        .try_deserialize()
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
