use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use std::default::Default;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use url::Url;

use crate::errors::TranslationError;

/// Application configuration module
/// This module handles the application configuration including loading,
/// validating and saving configuration settings.
/// Represents the application configuration
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Config {
    /// Translation service settings
    pub translator: TranslatorConfig,

    /// Free-form context sent with every request
    #[serde(default)]
    pub global_context: Option<String>,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// How translated strings are accepted
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum TranslationMode {
    // @mode: Machine output is written as translated
    #[default]
    Automatic,
    // @mode: Every translated string goes through a reviewer
    Interactive,
}

impl TranslationMode {
    // @returns: Lowercase mode identifier
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Automatic => "automatic",
            Self::Interactive => "interactive",
        }
    }
}

impl std::fmt::Display for TranslationMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for TranslationMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "automatic" => Ok(Self::Automatic),
            "interactive" => Ok(Self::Interactive),
            _ => Err(anyhow!("Invalid translation mode: {}", s)),
        }
    }
}

/// Translation service settings
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct TranslatorConfig {
    // @field: Automatic or interactive review
    #[serde(default)]
    pub mode: TranslationMode,

    // @field: Service root, e.g. http://localhost:3000/api/v1
    #[serde(default = "default_base_url")]
    pub base_url: String,

    // @field: Model provider forwarded to the service
    #[serde(default = "default_provider")]
    pub provider: String,

    // @field: HTTP timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    // @field: Overrides the service's maxRetry when set
    #[serde(default)]
    pub max_retry: Option<usize>,

    // @field: Backoff before the second attempt, doubled after each failure
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
}

impl Default for TranslatorConfig {
    fn default() -> Self {
        Self {
            mode: TranslationMode::default(),
            base_url: default_base_url(),
            provider: default_provider(),
            timeout_secs: default_timeout_secs(),
            max_retry: None,
            retry_backoff_ms: default_retry_backoff_ms(),
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:3000/api/v1".to_string()
}

fn default_provider() -> String {
    "openai".to_string()
}

fn default_timeout_secs() -> u64 {
    120
}

fn default_retry_backoff_ms() -> u64 {
    500
}

/// Model configuration served by the translation service
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LlmTranslatorConfig {
    /// Output token limit of the model
    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: usize,

    /// Share of the limit kept in reserve, in [0, 1)
    #[serde(default = "default_buffer")]
    pub buffer: f64,

    /// Attempts per batch
    #[serde(default = "default_max_retry")]
    pub max_retry: usize,

    /// Tokenizer family
    #[serde(default = "default_tokenizer")]
    pub tokenizer: String,

    /// Model name used to pick the encoding
    #[serde(default = "default_tokenizer_model")]
    pub tokenizer_model: String,
}

impl Default for LlmTranslatorConfig {
    fn default() -> Self {
        Self {
            max_output_tokens: default_max_output_tokens(),
            buffer: default_buffer(),
            max_retry: default_max_retry(),
            tokenizer: default_tokenizer(),
            tokenizer_model: default_tokenizer_model(),
        }
    }
}

impl LlmTranslatorConfig {
    pub fn validate(&self) -> Result<(), TranslationError> {
        if self.max_output_tokens == 0 {
            return Err(TranslationError::Config("maxOutputTokens must be positive".to_string()));
        }
        if !(0.0..1.0).contains(&self.buffer) {
            return Err(TranslationError::Config(format!("buffer must be in [0, 1), got {}", self.buffer)));
        }
        if self.max_retry == 0 {
            return Err(TranslationError::Config("maxRetry must be at least 1".to_string()));
        }
        if self.tokenizer != "openai" {
            return Err(TranslationError::Config(format!("Unknown tokenizer: {}", self.tokenizer)));
        }
        Ok(())
    }
}

fn default_max_output_tokens() -> usize {
    4096
}

fn default_buffer() -> f64 {
    0.3
}

fn default_max_retry() -> usize {
    1
}

fn default_tokenizer() -> String {
    "openai".to_string()
}

fn default_tokenizer_model() -> String {
    "gpt-4".to_string()
}

/// Log level
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn to_level_filter(self) -> log::LevelFilter {
        match self {
            Self::Error => log::LevelFilter::Error,
            Self::Warn => log::LevelFilter::Warn,
            Self::Info => log::LevelFilter::Info,
            Self::Debug => log::LevelFilter::Debug,
            Self::Trace => log::LevelFilter::Trace,
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Error => "error",
            Self::Warn => "warn",
            Self::Info => "info",
            Self::Debug => "debug",
            Self::Trace => "trace",
        };
        write!(f, "{}", name)
    }
}

impl std::str::FromStr for LogLevel {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "error" => Ok(Self::Error),
            "warn" | "warning" => Ok(Self::Warn),
            "info" => Ok(Self::Info),
            "debug" => Ok(Self::Debug),
            "trace" => Ok(Self::Trace),
            _ => Err(anyhow!("Invalid log level: {}", s)),
        }
    }
}

impl Config {
    /// Read a configuration file
    pub fn from_file(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .context(format!("Failed to open config file: {}", path.display()))?;
        let reader = BufReader::new(file);
        serde_json::from_reader(reader)
            .context(format!("Failed to parse config file: {}", path.display()))
    }

    /// Write this configuration as pretty JSON
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)
            .context("Failed to serialize config to JSON")?;
        std::fs::write(path, json)
            .context(format!("Failed to write config to file: {}", path.display()))
    }

    /// Read `path`, or write and return the default configuration when it does not exist
    pub fn load_or_create(path: &Path) -> Result<Self> {
        if path.exists() {
            return Self::from_file(path);
        }
        log::warn!("Config file not found at '{}', creating default config.", path.display());
        let config = Self::default();
        config.save(path)?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let url = Url::parse(&self.translator.base_url)
            .context(format!("Invalid translator base URL: {}", self.translator.base_url))?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(anyhow!("Translator base URL must use http or https: {}", self.translator.base_url));
        }

        if self.translator.timeout_secs == 0 {
            return Err(anyhow!("Translator timeout must be greater than zero"));
        }

        if self.translator.max_retry == Some(0) {
            return Err(anyhow!("max_retry must be at least 1 when set"));
        }

        Ok(())
    }
}

/// Default implementation for Config
impl Default for Config {
    fn default() -> Self {
        Config {
            translator: TranslatorConfig::default(),
            global_context: None,
            log_level: LogLevel::default(),
        }
    }
}
