use crate::error::{AuraError, Result};
use crate::model::DEFAULT_GREETING;
use config::{Config, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuraConfig {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub web: WebConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub assistant: AssistantConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_storage_backend")]
    pub backend: String,
    /// Custom path for the SQLite database. Defaults to `~/.config/aura/aura.db`.
    #[serde(default)]
    pub path: Option<String>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: default_storage_backend(),
            path: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebConfig {
    #[serde(default = "default_web_port")]
    pub port: u16,
    #[serde(default = "default_web_host")]
    pub host: String,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            port: default_web_port(),
            host: default_web_host(),
        }
    }
}

/// Generative-language backend shared by the insight banner and the assistant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "default_llm_model")]
    pub model: String,
    #[serde(default)]
    pub api_key: Option<String>,
    /// Environment variable holding the key. Defaults to `API_KEY`,
    /// then `GEMINI_API_KEY` is tried.
    #[serde(default)]
    pub env_var: Option<String>,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default = "default_llm_max_tokens")]
    pub max_tokens: usize,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: default_llm_model(),
            api_key: None,
            env_var: None,
            base_url: None,
            max_tokens: default_llm_max_tokens(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

/// Simulated latency of the stub authentication service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(default = "default_login_latency_ms")]
    pub login_latency_ms: u64,
    #[serde(default = "default_register_latency_ms")]
    pub register_latency_ms: u64,
    #[serde(default = "default_logout_latency_ms")]
    pub logout_latency_ms: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            login_latency_ms: default_login_latency_ms(),
            register_latency_ms: default_register_latency_ms(),
            logout_latency_ms: default_logout_latency_ms(),
        }
    }
}

impl AuthConfig {
    /// No simulated latency at all.
    pub fn instant() -> Self {
        Self {
            login_latency_ms: 0,
            register_latency_ms: 0,
            logout_latency_ms: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssistantConfig {
    #[serde(default = "default_greeting")]
    pub greeting: String,
    /// Upper bound for one pending turn, after which it fails as timed out.
    #[serde(default = "default_turn_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            greeting: default_greeting(),
            timeout_secs: default_turn_timeout_secs(),
        }
    }
}

/// Valid storage backend names.
pub const VALID_STORAGE_BACKENDS: &[&str] = &["sqlite", "memory"];

/// Env var consulted when `llm.env_var` is unset.
pub const DEFAULT_API_KEY_ENV: &str = "API_KEY";

/// Last-resort env var for the Gemini key.
pub const GEMINI_API_KEY_ENV: &str = "GEMINI_API_KEY";

// -- Defaults --

fn default_storage_backend() -> String {
    "sqlite".to_string()
}
fn default_web_port() -> u16 {
    37740
}
fn default_web_host() -> String {
    "127.0.0.1".to_string()
}
fn default_llm_model() -> String {
    "gemini-3-flash-preview".to_string()
}
fn default_llm_max_tokens() -> usize {
    1024
}
fn default_request_timeout_secs() -> u64 {
    30
}
fn default_login_latency_ms() -> u64 {
    800
}
fn default_register_latency_ms() -> u64 {
    1000
}
fn default_logout_latency_ms() -> u64 {
    500
}
fn default_greeting() -> String {
    DEFAULT_GREETING.to_string()
}
fn default_turn_timeout_secs() -> u64 {
    30
}

impl AuraConfig {
    /// Load configuration with three-layer TOML merge:
    /// 1. ~/.config/aura/config.toml (global)
    /// 2. .aura/config.toml (project)
    /// 3. .aura/config.local.toml (local, gitignored)
    ///
    /// `extra` is merged last (the `--config` flag).
    pub fn load(project_dir: Option<&Path>, extra: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder();

        if let Some(global_path) = global_config_path() {
            if global_path.exists() {
                builder = builder.add_source(File::from(global_path).required(false));
            }
        }

        if let Some(dir) = project_dir {
            let project_config = dir.join(".aura").join("config.toml");
            if project_config.exists() {
                builder = builder.add_source(File::from(project_config).required(false));
            }

            let local_config = dir.join(".aura").join("config.local.toml");
            if local_config.exists() {
                builder = builder.add_source(File::from(local_config).required(false));
            }
        }

        if let Some(path) = extra {
            if !path.exists() {
                return Err(AuraError::Config(format!(
                    "config file not found: {}",
                    path.display()
                )));
            }
            builder = builder.add_source(File::from(path.to_path_buf()));
        }

        let config = builder
            .build()
            .map_err(|e| AuraError::Config(e.to_string()))?;

        let mut cfg: Self = config
            .try_deserialize()
            .map_err(|e| AuraError::Config(e.to_string()))?;

        cfg.validate();
        Ok(cfg)
    }

    /// Defaults only (no files).
    pub fn default_config() -> Self {
        Self {
            storage: StorageConfig::default(),
            web: WebConfig::default(),
            llm: LlmConfig::default(),
            auth: AuthConfig::default(),
            assistant: AssistantConfig::default(),
        }
    }

    /// Render as TOML, e.g. to seed a config file.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| AuraError::Config(format!("failed to serialize config: {e}")))
    }

    /// Validate config values, fixing out-of-range values and logging warnings.
    /// Lenient: it repairs values rather than rejecting the config.
    pub fn validate(&mut self) -> Vec<String> {
        let mut warnings = Vec::new();

        if !VALID_STORAGE_BACKENDS.contains(&self.storage.backend.as_str()) {
            warnings.push(format!(
                "unknown storage backend '{}', valid: {}",
                self.storage.backend,
                VALID_STORAGE_BACKENDS.join(", ")
            ));
        }

        if self.llm.model.trim().is_empty() {
            warnings.push(format!(
                "llm.model is empty, using '{}'",
                default_llm_model()
            ));
            self.llm.model = default_llm_model();
        }

        if self.llm.max_tokens == 0 {
            warnings.push("llm.max_tokens = 0, setting to 256".to_string());
            self.llm.max_tokens = 256;
        }

        if self.llm.request_timeout_secs == 0 {
            warnings.push("llm.request_timeout_secs = 0, setting to 1".to_string());
            self.llm.request_timeout_secs = 1;
        }

        if self.assistant.timeout_secs == 0 {
            warnings.push("assistant.timeout_secs = 0, setting to 1".to_string());
            self.assistant.timeout_secs = 1;
        }

        if self.assistant.greeting.trim().is_empty() {
            warnings.push("assistant.greeting is empty, using the default greeting".to_string());
            self.assistant.greeting = default_greeting();
        }

        for w in &warnings {
            tracing::warn!("config: {}", w);
        }

        warnings
    }
}

fn global_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("aura").join("config.toml"))
}

/// Resolve the generative-language API key once at startup.
///
/// Priority: `llm.api_key` → `$<llm.env_var>` (default `API_KEY`) → `$GEMINI_API_KEY`.
/// `None` means both AI collaborators run in their degraded mode.
pub fn resolve_api_key(config: &LlmConfig) -> Option<String> {
    resolve_api_key_with(config, |name| std::env::var(name).ok())
}

fn resolve_api_key_with(
    config: &LlmConfig,
    lookup: impl Fn(&str) -> Option<String>,
) -> Option<String> {
    if let Some(ref key) = config.api_key {
        if !key.trim().is_empty() {
            return Some(key.clone());
        }
    }

    let primary = config.env_var.as_deref().unwrap_or(DEFAULT_API_KEY_ENV);
    [primary, GEMINI_API_KEY_ENV]
        .into_iter()
        .filter_map(lookup)
        .find(|value| !value.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AuraConfig::default_config();
        assert_eq!(config.storage.backend, "sqlite");
        assert!(config.storage.path.is_none());
        assert_eq!(config.web.port, 37740);
        assert_eq!(config.web.host, "127.0.0.1");
        assert_eq!(config.llm.model, "gemini-3-flash-preview");
        assert_eq!(config.auth.login_latency_ms, 800);
        assert_eq!(config.auth.register_latency_ms, 1000);
        assert_eq!(config.auth.logout_latency_ms, 500);
        assert_eq!(config.assistant.greeting, DEFAULT_GREETING);
    }

    #[test]
    fn test_load_config_no_files() {
        let config = AuraConfig::load(Some(Path::new("/nonexistent/path")), None).unwrap();
        assert_eq!(config.web.port, 37740);
        assert_eq!(config.assistant.timeout_secs, 30);
    }

    #[test]
    fn test_load_missing_extra_file_errors() {
        let result = AuraConfig::load(None, Some(Path::new("/nonexistent/aura.toml")));
        assert!(result.unwrap_err().to_string().contains("config file not found"));
    }

    #[test]
    fn test_project_and_local_layers_merge() {
        let dir = std::env::temp_dir().join(format!("aura-config-{}", uuid::Uuid::now_v7()));
        let aura_dir = dir.join(".aura");
        std::fs::create_dir_all(&aura_dir).unwrap();
        std::fs::write(
            aura_dir.join("config.toml"),
            "[web]\nport = 4000\n\n[storage]\nbackend = \"memory\"\n",
        )
        .unwrap();
        std::fs::write(aura_dir.join("config.local.toml"), "[web]\nport = 5000\n").unwrap();

        let config = AuraConfig::load(Some(&dir), None).unwrap();
        assert_eq!(config.web.port, 5000);
        assert_eq!(config.storage.backend, "memory");

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_config_serde_roundtrip() {
        let config = AuraConfig::default_config();
        let toml_str = config.to_toml().unwrap();
        let parsed: AuraConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.web.port, config.web.port);
        assert_eq!(parsed.llm.model, config.llm.model);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let parsed: AuraConfig = toml::from_str("[llm]\nmodel = \"gemini-2.0-flash\"\n").unwrap();
        assert_eq!(parsed.llm.model, "gemini-2.0-flash");
        assert_eq!(parsed.llm.max_tokens, 1024);
        assert_eq!(parsed.auth.login_latency_ms, 800);
    }

    #[test]
    fn test_validate_default_config_no_warnings() {
        let mut config = AuraConfig::default_config();
        assert!(config.validate().is_empty());
    }

    #[test]
    fn test_validate_repairs_zero_values() {
        let mut config = AuraConfig::default_config();
        config.llm.max_tokens = 0;
        config.llm.request_timeout_secs = 0;
        config.assistant.timeout_secs = 0;
        config.assistant.greeting = "  ".into();

        let warnings = config.validate();
        assert_eq!(warnings.len(), 4);
        assert_eq!(config.llm.max_tokens, 256);
        assert_eq!(config.llm.request_timeout_secs, 1);
        assert_eq!(config.assistant.timeout_secs, 1);
        assert_eq!(config.assistant.greeting, DEFAULT_GREETING);
    }

    #[test]
    fn test_validate_unknown_backend() {
        let mut config = AuraConfig::default_config();
        config.storage.backend = "redis".into();
        let warnings = config.validate();
        assert!(warnings[0].contains("unknown storage backend"));
    }

    #[test]
    fn test_resolve_api_key_from_config() {
        let config = LlmConfig {
            api_key: Some("config-key".into()),
            ..Default::default()
        };
        assert_eq!(resolve_api_key(&config).as_deref(), Some("config-key"));
    }

    fn env(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: Vec<(String, String)> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.iter().find(|(k, _)| k == name).map(|(_, v)| v.clone())
    }

    #[test]
    fn test_resolve_api_key_custom_env_var() {
        let config = LlmConfig {
            env_var: Some("AURA_LLM_KEY".into()),
            ..Default::default()
        };
        let lookup = env(&[("AURA_LLM_KEY", "env-llm-key"), (GEMINI_API_KEY_ENV, "gemini-key")]);
        assert_eq!(resolve_api_key_with(&config, lookup).as_deref(), Some("env-llm-key"));
    }

    #[test]
    fn test_resolve_api_key_falls_back_to_gemini_var() {
        let config = LlmConfig::default();
        let lookup = env(&[(DEFAULT_API_KEY_ENV, "  "), (GEMINI_API_KEY_ENV, "gemini-key")]);
        assert_eq!(resolve_api_key_with(&config, lookup).as_deref(), Some("gemini-key"));
    }

    #[test]
    fn test_resolve_api_key_blank_config_value_ignored() {
        let config = LlmConfig {
            api_key: Some("   ".into()),
            ..Default::default()
        };
        assert!(resolve_api_key_with(&config, env(&[])).is_none());
    }
}
