use super::types::AppConfig;
use crate::llm::config::{API_KEY_ENV, MODEL_ENV};
use anyhow::{Context, Result};
use config::{Config, Environment, File};
use secrecy::SecretString;
use std::path::Path;

/// Prefix for structured environment overrides (`METRIC_QUERY__LLM__TIMEOUT_SECS`)
pub const ENV_PREFIX: &str = "METRIC_QUERY";

/// Well-known bind address override
pub const BIND_ADDR_ENV: &str = "BIND_ADDR";

/// Configuration loader with builder pattern
pub struct ConfigLoader {
    config_file: Option<String>,
    load_env: bool,
}

impl ConfigLoader {
    /// Create a new configuration loader
    pub fn new() -> Self {
        Self {
            config_file: None,
            load_env: false,
        }
    }

    /// Load configuration from file
    pub fn load_from_file(mut self, path: Option<&str>) -> Self {
        self.config_file = path.map(String::from);
        self
    }

    /// Load configuration from environment variables
    pub fn load_from_env(mut self) -> Self {
        self.load_env = true;
        self
    }

    /// Build the final configuration
    pub fn build(self) -> Result<AppConfig> {
        let mut builder = Config::builder().add_source(Config::try_from(&AppConfig::default())?);

        if let Some(config_path) = &self.config_file {
            // 明示的に指定されたファイルは必須
            builder = builder.add_source(File::with_name(config_path).required(true));
        } else {
            builder = builder
                .add_source(File::with_name("metric-query").required(false))
                .add_source(File::with_name("config/metric-query").required(false));
        }

        if self.load_env {
            builder = builder.add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("server.cors_allowed_origins"),
            );
        }

        let mut config: AppConfig = builder
            .build()
            .context("Failed to build configuration")?
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        if self.load_env {
            apply_well_known_env(&mut config);
        }

        config.validate()?;
        Ok(config)
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// 既知の環境変数による個別上書き
fn apply_well_known_env(config: &mut AppConfig) {
    if let Some(api_key) = non_empty_var(API_KEY_ENV) {
        config.llm.api_key = Some(SecretString::new(api_key.into_boxed_str()));
    }
    if let Some(model) = non_empty_var(MODEL_ENV) {
        config.llm.default_model = model;
    }
    if let Some(bind_addr) = non_empty_var(BIND_ADDR_ENV) {
        config.server.bind_addr = bind_addr;
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// サンプル設定ファイルの内容を生成
pub fn sample_config() -> Result<String> {
    let toml_content = toml::to_string_pretty(&AppConfig::default())
        .context("Failed to serialize sample configuration")?;

    Ok(format!(
        r#"# metric-query configuration
#
# Save as metric-query.toml (or config/metric-query.toml), or pass --config.
# Every key can be overridden from the environment, for example
#   METRIC_QUERY__SERVER__BIND_ADDR=0.0.0.0:5000
#   METRIC_QUERY__HISTORY__CONTEXT_WINDOW=3
#
# Secrets are not written here. Provide the API key through {api_key},
# or as an api_key entry under [llm].
# {model} and {bind} are also honoured.

{body}"#,
        api_key = API_KEY_ENV,
        model = MODEL_ENV,
        bind = BIND_ADDR_ENV,
        body = toml_content
    ))
}

/// サンプル設定ファイルを書き出し
pub fn write_sample_config(path: &Path) -> Result<()> {
    let content = sample_config()?;
    std::fs::write(path, content)
        .with_context(|| format!("Failed to write sample configuration to {}", path.display()))?;
    tracing::info!(path = %path.display(), "sample configuration written");
    Ok(())
}
