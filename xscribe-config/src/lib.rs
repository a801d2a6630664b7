//! Loader for xscribe configuration with YAML + environment overlays.
//!
//! Sources are merged in this order, later ones winning:
//!
//! 1. built-in defaults (every section and field is optional)
//! 2. YAML files / inline snippets, in the order they were added
//! 3. `XSCRIBE__<SECTION>__<KEY>` environment variables
//!
//! After merging, every string value goes through `${VAR}` expansion so secrets can
//! stay in the environment while the file references them:
//!
//! ```yaml
//! twitter:
//!   auth_token: "${AUTH_TOKEN}"
//! following:
//!   accounts_dir: ./accounts
//! upload:
//!   api_url: "${FLASK_API_URL}"
//!   api_key: "${FLASK_API_KEY}"
//! ```
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use serde_json::Value;
use std::path::{Path, PathBuf};
use xscribe_common::observability::LogFormat;

const MAXIMUM_ENV_EXPANSION_DEPTH: usize = 8;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct XscribeConfig {
    pub twitter: TwitterSettings,
    pub following: FollowingSettings,
    pub upload: UploadSettings,
    pub logging: LoggingSettings,
}

/// Session and endpoint settings for the Twitter/X web API.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TwitterSettings {
    /// Either the bare `auth_token` cookie value or a full browser cookie string.
    pub auth_token: Option<String>,
    /// Origin used for the session handshake (`/manifest.json`).
    pub web_base: String,
    /// Origin serving `/i/api/graphql/...`.
    pub api_base: String,
    pub following_query_id: String,
    pub handshake_timeout_secs: u64,
    pub request_timeout_secs: u64,
}

impl Default for TwitterSettings {
    fn default() -> Self {
        Self {
            auth_token: None,
            web_base: "https://x.com".into(),
            api_base: "https://x.com".into(),
            following_query_id: "zx6e-TLzRkeDO_a7p4b3JQ".into(),
            handshake_timeout_secs: 30,
            request_timeout_secs: 15,
        }
    }
}

impl TwitterSettings {
    pub fn auth_token(&self) -> Option<&str> {
        resolved(&self.auth_token)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FollowingSettings {
    pub accounts_dir: PathBuf,
    pub page_size: u32,
    pub page_delay_ms: u64,
    pub write_delay_ms: u64,
    /// Stop after this many page requests. Unbounded when unset.
    pub max_pages: Option<u32>,
}

impl Default for FollowingSettings {
    fn default() -> Self {
        Self {
            accounts_dir: PathBuf::from("./accounts"),
            page_size: 100,
            page_delay_ms: 1000,
            write_delay_ms: 50,
            max_pages: None,
        }
    }
}

/// Where the daily tweet archive is read from and sent to.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UploadSettings {
    pub api_url: Option<String>,
    pub api_key: Option<String>,
    pub tweets_dir: PathBuf,
    pub timeout_secs: u64,
}

impl Default for UploadSettings {
    fn default() -> Self {
        Self {
            api_url: None,
            api_key: None,
            tweets_dir: PathBuf::from("./tweets"),
            timeout_secs: 30,
        }
    }
}

impl UploadSettings {
    pub fn api_url(&self) -> Option<&str> {
        resolved(&self.api_url)
    }

    pub fn api_key(&self) -> Option<&str> {
        resolved(&self.api_key)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub format: LogFormat,
    pub emit_stderr: bool,
    pub dir: Option<PathBuf>,
    /// Used when `RUST_LOG` is unset.
    pub filter: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            format: LogFormat::Text,
            emit_stderr: true,
            dir: None,
            filter: "info".into(),
        }
    }
}

/// `${VAR}` placeholders that survived expansion mean the variable is unset.
fn resolved(value: &Option<String>) -> Option<&str> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty() && !is_unresolved_placeholder(s))
}

fn is_unresolved_placeholder(s: &str) -> bool {
    s.starts_with("${") && s.ends_with('}') && !s[2..s.len() - 1].contains("${")
}

fn expand_env_in_value(v: &mut Value) {
    match v {
        Value::String(s) => {
            if s.contains('$') {
                let mut cur = std::mem::take(s);
                for _ in 0..MAXIMUM_ENV_EXPANSION_DEPTH {
                    let expanded = match shellexpand::env(&cur) {
                        Ok(cow) => cow.into_owned(),
                        Err(_) => cur.clone(),
                    };
                    if expanded == cur {
                        break;
                    }
                    cur = expanded;
                }
                *s = cur;
            }
        }
        Value::Array(arr) => arr.iter_mut().for_each(expand_env_in_value),
        Value::Object(obj) => obj.values_mut().for_each(expand_env_in_value),
        _ => {}
    }
}

/// Builder hides the `config` crate wiring (YAML + env overrides).
pub struct XscribeConfigLoader {
    builder: config::ConfigBuilder<config::builder::DefaultState>,
    env_prefix: String,
}

impl Default for XscribeConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl XscribeConfigLoader {
    /// Start from the built-in defaults; `XSCRIBE__` env overrides are applied last.
    ///
    /// ```
    /// use xscribe_config::XscribeConfigLoader;
    ///
    /// let config = XscribeConfigLoader::new().load().expect("defaults load");
    /// assert_eq!(config.following.page_size, 100);
    /// assert_eq!(config.twitter.web_base, "https://x.com");
    /// ```
    pub fn new() -> Self {
        Self {
            builder: Config::builder(),
            env_prefix: "XSCRIBE".into(),
        }
    }

    /// Use a different environment prefix (tests use this to stay isolated).
    pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = prefix.into();
        self
    }

    /// Attach a YAML/TOML/JSON file that must exist; the format is inferred by suffix.
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.builder = self
            .builder
            .add_source(File::from(path.as_ref()).required(true));
        self
    }

    /// Attach a file that is silently skipped when absent.
    pub fn with_optional_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.builder = self
            .builder
            .add_source(File::from(path.as_ref()).required(false));
        self
    }

    /// Merge an inline YAML snippet.
    ///
    /// ```
    /// use xscribe_config::XscribeConfigLoader;
    ///
    /// let cfg = XscribeConfigLoader::new()
    ///     .with_yaml_str(
    ///         r#"
    /// following:
    ///   accounts_dir: "./out"
    ///   max_pages: 3
    /// "#,
    ///     )
    ///     .load()
    ///     .unwrap();
    ///
    /// assert_eq!(cfg.following.accounts_dir, std::path::PathBuf::from("./out"));
    /// assert_eq!(cfg.following.max_pages, Some(3));
    /// assert_eq!(cfg.following.write_delay_ms, 50);
    /// ```
    pub fn with_yaml_str(mut self, yaml: &str) -> Self {
        self.builder = self
            .builder
            .add_source(File::from_str(yaml, config::FileFormat::Yaml));
        self
    }

    /// Consume the builder and deserialize the merged sources into strongly typed config.
    pub fn load(self) -> Result<XscribeConfig, ConfigError> {
        let cfg = self
            .builder
            .add_source(
                Environment::with_prefix(&self.env_prefix)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let mut v: Value = cfg.try_deserialize()?;
        expand_env_in_value(&mut v);

        serde_json::from_value(v).map_err(|e| ConfigError::Message(e.to_string()))
    }
}
