use crate::formatter_config::{FormatterConfig, Preset};
use anyhow::{anyhow, Context, Result};
use dirs::home_dir;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Wire protocol a provider speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Anthropic,
    /// OpenAI chat completions, or any server compatible with it (Ollama, vLLM).
    OpenAi,
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderKind::Anthropic => f.write_str("anthropic"),
            ProviderKind::OpenAi => f.write_str("openai"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub kind: ProviderKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

impl ProviderConfig {
    pub fn new(kind: ProviderKind) -> Self {
        Self {
            kind,
            api_key: None,
            model: None,
            base_url: None,
            max_tokens: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextConfig {
    pub include_history: bool,
    pub history_limit: usize,
    pub include_files: bool,
    pub max_files: usize,
    pub include_git: bool,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            include_history: true,
            history_limit: 10,
            include_files: true,
            max_files: 20,
            include_git: true,
        }
    }
}

/// Display preferences: a preset plus optional per-field overrides.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    pub preset: Preset,
    pub stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub use_colors: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment_prefix: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line_width: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub show_line_numbers: Option<bool>,
}

impl DisplayConfig {
    /// Builds the formatter configuration for `preset` (or the configured
    /// one) with this section's overrides applied.
    pub fn formatter_config(&self, preset: Option<Preset>) -> FormatterConfig {
        let mut config = preset.unwrap_or(self.preset).config();
        if let Some(use_colors) = self.use_colors {
            config.use_colors = use_colors;
        }
        if let Some(prefix) = &self.comment_prefix {
            config.comment_prefix = prefix.clone();
        }
        if let Some(width) = self.line_width {
            config.line_width = width;
        }
        if let Some(numbers) = self.show_line_numbers {
            config.show_line_numbers = numbers;
        }
        config.sanitized()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    pub enabled: bool,
    pub max_entries: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_entries: 100,
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_provider: Option<String>,
    #[serde(default)]
    pub use_mock: bool,
    #[serde(default)]
    pub providers: BTreeMap<String, ProviderConfig>,
    #[serde(default)]
    pub context: ContextConfig,
    #[serde(default)]
    pub display: DisplayConfig,
    #[serde(default)]
    pub history: HistoryConfig,
}

impl Config {
    /// Load configuration from file, environment variables, or create default
    pub fn load() -> Result<Self> {
        let path = Self::get_config_path()?;
        let mut config = Self::load_from(&path)?;
        config.apply_env_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Reads `path`, falling back to defaults when the file does not exist.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        info!("Loaded config from: {}", path.display());
        Ok(config)
    }

    /// Environment variables override the config file.
    pub fn apply_env_overrides<F>(&mut self, var: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(provider) = var("HOW_PROVIDER").filter(|p| !p.is_empty()) {
            self.current_provider = Some(provider);
        }

        for (env_key, kind) in [
            ("ANTHROPIC_API_KEY", ProviderKind::Anthropic),
            ("OPENAI_API_KEY", ProviderKind::OpenAi),
        ] {
            let Some(key) = var(env_key).filter(|k| !k.is_empty()) else {
                continue;
            };
            let mut matched = false;
            for provider in self.providers.values_mut().filter(|p| p.kind == kind) {
                matched = true;
                if provider.api_key.is_none() {
                    provider.api_key = Some(key.clone());
                }
            }
            if !matched {
                let name = kind.to_string();
                let mut provider = ProviderConfig::new(kind);
                provider.api_key = Some(key);
                self.providers.insert(name.clone(), provider);
                if self.current_provider.is_none() {
                    self.current_provider = Some(name);
                }
            }
        }

        if var("HOW_USE_MOCK").is_some() {
            self.use_mock = true;
        }
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::get_config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        info!("Saved config to: {}", path.display());
        Ok(())
    }

    pub fn get_config_path() -> Result<PathBuf> {
        if let Ok(path) = std::env::var("HOW_CONFIG") {
            return Ok(PathBuf::from(path));
        }
        Ok(Self::get_config_dir()?.join("config.toml"))
    }

    pub fn get_config_dir() -> Result<PathBuf> {
        let home = home_dir().ok_or_else(|| anyhow!("Could not find home directory"))?;
        Ok(home.join(".how"))
    }

    /// Name and settings of the provider requests should go to.
    ///
    /// `requested` wins over `current_provider`; with neither set, a single
    /// configured provider is used implicitly.
    pub fn active_provider(&self, requested: Option<&str>) -> Result<(String, ProviderConfig)> {
        let name = match requested.or(self.current_provider.as_deref()) {
            Some(name) => name.to_string(),
            None if self.providers.len() == 1 => self.providers.keys().next().cloned().unwrap_or_default(),
            None => {
                return Err(anyhow!(
                    "No provider configured. Please set one up using one of these methods:

1. Run the setup wizard:
   how setup

2. Set an environment variable:
   export ANTHROPIC_API_KEY=sk-ant-your-key-here
   export OPENAI_API_KEY=sk-your-key-here"
                ));
            }
        };

        let provider = self.providers.get(&name).cloned().ok_or_else(|| {
            let known: Vec<&str> = self.providers.keys().map(String::as_str).collect();
            anyhow!(
                "Unknown provider '{}'. Configured providers: {}",
                name,
                if known.is_empty() { "none".to_string() } else { known.join(", ") }
            )
        })?;
        Ok((name, provider))
    }

    /// Switches the current provider, failing if it is not configured.
    pub fn set_current_provider(&mut self, name: &str) -> Result<()> {
        if !self.providers.contains_key(name) {
            return Err(anyhow!("Provider '{}' is not configured", name));
        }
        self.current_provider = Some(name.to_string());
        Ok(())
    }

    pub fn show_config_info() -> Result<()> {
        let config_path = Self::get_config_path()?;
        println!("Configuration file: {}", config_path.display());

        if config_path.exists() {
            println!("Status: Found");
            let config = Self::load_from(&config_path)?;
            println!(
                "Current provider: {}",
                config.current_provider.as_deref().unwrap_or("not set")
            );
            println!("Providers configured: {}", config.providers.len());
            println!("Display preset: {}", config.display.preset);
            println!("History: {}", if config.history.enabled { "enabled" } else { "disabled" });
        } else {
            println!("Status: Not found (using defaults)");
        }

        println!("\nTo configure a provider:");
        println!("  how setup");
        println!("\nOr set an environment variable:");
        println!("  export ANTHROPIC_API_KEY=<your-key>");

        Ok(())
    }
}
