//! Configuration management for VCraft.
//!
//! This module handles loading and merging configuration from multiple sources:
//! - Built-in defaults
//! - A YAML config file (`vcraft.yaml` or `VCRAFT_CONFIG`)
//! - Environment variables
//! - Command-line flags
//!
//! Later sources override earlier ones.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{AppError, AppResult};
use crate::logging::LogFormat;

/// Default config file name looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "vcraft.yaml";

/// Embedding providers understood by the knowledge crate.
pub const KNOWN_EMBEDDING_PROVIDERS: [&str; 2] = ["trigram", "ollama"];

/// LLM providers understood by the llm crate.
pub const KNOWN_LLM_PROVIDERS: [&str; 3] = ["ollama", "openai", "gemini"];

/// Environment variable read for a provider's key when `apiKeyEnv` is unset.
pub fn default_api_key_env(provider: &str) -> Option<&'static str> {
    match provider {
        "openai" => Some("OPENAI_API_KEY"),
        "gemini" => Some("GEMINI_API_KEY"),
        _ => None,
    }
}

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Directory of `.txt` knowledge documents
    pub knowledge_base_path: PathBuf,

    /// Directory holding the persisted vector index
    pub index_path: PathBuf,

    /// Embedding model settings
    pub embedding: EmbeddingSettings,

    /// Generation client settings
    pub llm: LlmSettings,

    /// Retrieval and chunking settings
    pub retrieval: RetrievalSettings,

    /// Log level override
    pub log_level: Option<String>,

    /// Log output format ("pretty" or "json")
    pub log_format: String,

    /// Disable colored output
    pub no_color: bool,

    /// Config file that was merged, if any
    #[serde(skip)]
    pub config_file: Option<PathBuf>,
}

/// Embedding model configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EmbeddingSettings {
    /// Provider name: "trigram" or "ollama"
    pub provider: String,

    /// Model identifier (provider-specific)
    pub model: String,

    /// Embedding vector dimensions
    pub dimensions: usize,

    /// Provider endpoint override
    pub endpoint: Option<String>,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            provider: "trigram".to_string(),
            model: "trigram-v1".to_string(),
            dimensions: 384,
            endpoint: None,
        }
    }
}

/// LLM generation configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LlmSettings {
    /// Provider name: "ollama", "openai" or "gemini"
    pub provider: String,

    /// Model identifier
    pub model: String,

    /// Provider endpoint override
    pub endpoint: Option<String>,

    /// Environment variable holding the API key.
    /// Falls back to `OPENAI_API_KEY` or `GEMINI_API_KEY` for those providers.
    #[serde(rename = "apiKeyEnv")]
    pub api_key_env: Option<String>,

    /// Explicit API key (from `VCRAFT_API_KEY`; never read from YAML)
    #[serde(skip)]
    pub api_key: Option<String>,

    /// Hard timeout for one generation call
    #[serde(rename = "timeoutSecs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    15
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            provider: "ollama".to_string(), // Local-first default
            model: "llama3.2".to_string(),
            endpoint: None,
            api_key_env: None,
            api_key: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Retrieval and chunking configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RetrievalSettings {
    /// Number of chunks retrieved per query
    pub top_k: usize,

    /// Words per chunk
    pub chunk_size: usize,

    /// Words shared by adjacent chunks
    pub chunk_overlap: usize,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self {
            top_k: 5,
            chunk_size: 500,
            chunk_overlap: 50,
        }
    }
}

/// Full configuration file structure.
///
/// Every section is optional, and so is every field inside a section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ConfigFile {
    knowledge_base_path: Option<PathBuf>,
    index_path: Option<PathBuf>,
    embedding: Option<EmbeddingSettings>,
    llm: Option<LlmSettings>,
    retrieval: Option<RetrievalSettings>,
    logging: Option<LoggingConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LoggingConfig {
    level: Option<String>,
    format: Option<String>,
    color: Option<bool>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            knowledge_base_path: PathBuf::from("./rag/knowledge_base"),
            index_path: PathBuf::from("./rag/vector_index"),
            embedding: EmbeddingSettings::default(),
            llm: LlmSettings::default(),
            retrieval: RetrievalSettings::default(),
            log_level: None,
            log_format: "pretty".to_string(),
            no_color: false,
            config_file: None,
        }
    }
}

impl AppConfig {
    /// Load configuration from defaults, the config file and the process environment.
    ///
    /// Environment variables:
    /// - `VCRAFT_CONFIG`: Path to config file
    /// - `VCRAFT_KNOWLEDGE_BASE_PATH`, `VCRAFT_INDEX_PATH`
    /// - `VCRAFT_EMBEDDING_PROVIDER`, `VCRAFT_EMBEDDING_MODEL`
    /// - `VCRAFT_LLM_PROVIDER`, `VCRAFT_LLM_MODEL`, `VCRAFT_API_KEY`
    /// - `RUST_LOG`: Log level
    /// - `NO_COLOR`: Disable colored output
    ///
    /// # Example
    /// ```no_run
    /// use vcraft_core::config::AppConfig;
    ///
    /// let config = AppConfig::load(None).expect("Failed to load config");
    /// println!("Knowledge base: {:?}", config.knowledge_base_path);
    /// ```
    pub fn load(config_file: Option<&Path>) -> AppResult<Self> {
        Self::load_with(config_file, |key| std::env::var(key).ok())
    }

    /// Load configuration using `env` to resolve environment variables.
    pub fn load_with<F>(config_file: Option<&Path>, env: F) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        let explicit = config_file
            .map(Path::to_path_buf)
            .or_else(|| env("VCRAFT_CONFIG").map(PathBuf::from));

        match explicit {
            Some(path) => {
                if !path.exists() {
                    return Err(AppError::Config(format!(
                        "Config file does not exist: {:?}",
                        path
                    )));
                }
                config = config.merge_yaml(&path)?;
            }
            None => {
                let default_path = PathBuf::from(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    config = config.merge_yaml(&default_path)?;
                }
            }
        }

        // Environment variables override YAML config
        config.apply_env(env);

        Ok(config)
    }

    /// Merge YAML configuration file into this config.
    fn merge_yaml(&self, path: &Path) -> AppResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        let config_file: ConfigFile = serde_yaml::from_str(&contents).map_err(|e| {
            AppError::Config(format!("Failed to parse config file {:?}: {}", path, e))
        })?;

        let mut result = self.clone();
        result.config_file = Some(path.to_path_buf());

        if let Some(kb) = config_file.knowledge_base_path {
            result.knowledge_base_path = kb;
        }
        if let Some(index) = config_file.index_path {
            result.index_path = index;
        }
        if let Some(embedding) = config_file.embedding {
            result.embedding = embedding;
        }
        if let Some(llm) = config_file.llm {
            result.llm = llm;
        }
        if let Some(retrieval) = config_file.retrieval {
            result.retrieval = retrieval;
        }

        if let Some(logging) = config_file.logging {
            if let Some(level) = logging.level {
                result.log_level = Some(level);
            }
            if let Some(format) = logging.format {
                result.log_format = format;
            }
            if let Some(color) = logging.color {
                result.no_color = !color;
            }
        }

        tracing::debug!("Merged config file {:?}", path);
        Ok(result)
    }

    fn apply_env<F>(&mut self, env: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(kb) = env("VCRAFT_KNOWLEDGE_BASE_PATH") {
            self.knowledge_base_path = PathBuf::from(kb);
        }
        if let Some(index) = env("VCRAFT_INDEX_PATH") {
            self.index_path = PathBuf::from(index);
        }
        if let Some(provider) = env("VCRAFT_EMBEDDING_PROVIDER") {
            self.embedding.provider = provider;
        }
        if let Some(model) = env("VCRAFT_EMBEDDING_MODEL") {
            self.embedding.model = model;
        }
        if let Some(provider) = env("VCRAFT_LLM_PROVIDER") {
            self.llm.provider = provider;
        }
        if let Some(model) = env("VCRAFT_LLM_MODEL") {
            self.llm.model = model;
        }

        let key_var = self
            .llm
            .api_key_env
            .as_deref()
            .or_else(|| default_api_key_env(&self.llm.provider));
        let api_key = env("VCRAFT_API_KEY").or_else(|| key_var.and_then(|var| env(var)));
        self.llm.api_key = api_key;

        if let Some(level) = env("RUST_LOG") {
            self.log_level = Some(level);
        }
        if env("NO_COLOR").is_some() {
            self.no_color = true;
        }
    }

    /// Apply CLI overrides to the configuration.
    ///
    /// Gives precedence to command-line flags over file and environment values.
    pub fn with_overrides(
        mut self,
        knowledge_base_path: Option<PathBuf>,
        index_path: Option<PathBuf>,
        log_level: Option<String>,
        verbose: bool,
        json_logs: bool,
        no_color: bool,
    ) -> Self {
        if let Some(kb) = knowledge_base_path {
            self.knowledge_base_path = kb;
        }

        if let Some(index) = index_path {
            self.index_path = index;
        }

        if let Some(log_level) = log_level {
            self.log_level = Some(log_level);
        }

        // Verbose mode implies debug logging
        if verbose && self.log_level.is_none() {
            self.log_level = Some("debug".to_string());
        }

        if json_logs {
            self.log_format = "json".to_string();
        }

        if no_color {
            self.no_color = true;
        }

        self
    }

    /// Parsed log format, falling back to pretty output for unknown names.
    pub fn log_format(&self) -> LogFormat {
        LogFormat::parse(&self.log_format).unwrap_or_default()
    }

    /// Validate configuration before services are constructed.
    ///
    /// Failures here are fatal: the affected capability must not be served.
    pub fn validate(&self) -> AppResult<()> {
        self.validate_retrieval()?;
        self.validate_llm()
    }

    /// Validate only the embedding and chunking settings.
    pub fn validate_retrieval(&self) -> AppResult<()> {
        if !KNOWN_EMBEDDING_PROVIDERS.contains(&self.embedding.provider.as_str()) {
            return Err(AppError::Config(format!(
                "Unknown embedding provider: {}. Supported: {}",
                self.embedding.provider,
                KNOWN_EMBEDDING_PROVIDERS.join(", ")
            )));
        }

        if self.embedding.dimensions == 0 {
            return Err(AppError::Config(
                "Embedding dimensions must be greater than zero".to_string(),
            ));
        }

        if self.retrieval.chunk_overlap >= self.retrieval.chunk_size {
            return Err(AppError::Config(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                self.retrieval.chunk_overlap, self.retrieval.chunk_size
            )));
        }

        Ok(())
    }

    /// Validate only the generation settings.
    pub fn validate_llm(&self) -> AppResult<()> {
        if !KNOWN_LLM_PROVIDERS.contains(&self.llm.provider.as_str()) {
            return Err(AppError::Config(format!(
                "Unknown LLM provider: {}. Supported: {}",
                self.llm.provider,
                KNOWN_LLM_PROVIDERS.join(", ")
            )));
        }

        if let Some(default_var) = default_api_key_env(&self.llm.provider) {
            if self.llm.api_key.is_none() {
                let hint = self.llm.api_key_env.as_deref().unwrap_or(default_var);
                return Err(AppError::Config(format!(
                    "API key not found for provider '{}' (set {} or VCRAFT_API_KEY)",
                    self.llm.provider, hint
                )));
            }
        }

        if self.llm.timeout_secs == 0 {
            return Err(AppError::Config(
                "LLM timeout must be at least one second".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.embedding.provider, "trigram");
        assert_eq!(config.embedding.dimensions, 384);
        assert_eq!(config.llm.provider, "ollama");
        assert_eq!(config.llm.timeout_secs, 15);
        assert_eq!(config.retrieval.chunk_size, 500);
        assert_eq!(config.retrieval.chunk_overlap, 50);
        assert_eq!(config.retrieval.top_k, 5);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_yaml_then_env_precedence() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("vcraft.yaml");
        std::fs::write(
            &path,
            r#"
knowledge_base_path: /data/kb
embedding:
  provider: ollama
  model: nomic-embed-text
  dimensions: 768
retrieval:
  top_k: 3
  chunk_size: 200
  chunk_overlap: 20
logging:
  level: warn
  format: json
  color: false
"#,
        )
        .unwrap();

        let env = env_from(&[("VCRAFT_EMBEDDING_MODEL", "mxbai-embed-large")]);
        let config = AppConfig::load_with(Some(&path), env).unwrap();

        assert_eq!(config.knowledge_base_path, PathBuf::from("/data/kb"));
        assert_eq!(config.embedding.provider, "ollama");
        assert_eq!(config.embedding.model, "mxbai-embed-large");
        assert_eq!(config.embedding.dimensions, 768);
        assert_eq!(config.retrieval.top_k, 3);
        assert_eq!(config.log_level.as_deref(), Some("warn"));
        assert_eq!(config.log_format(), LogFormat::Json);
        assert!(config.no_color);
        assert_eq!(config.config_file, Some(path));
    }

    #[test]
    fn test_partial_sections_keep_defaults() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("vcraft.yaml");
        std::fs::write(
            &path,
            "retrieval:\n  top_k: 3\nllm:\n  timeoutSecs: 30\nembedding:\n  dimensions: 256\n",
        )
        .unwrap();

        let config = AppConfig::load_with(Some(&path), |_| None).unwrap();

        assert_eq!(config.retrieval.top_k, 3);
        assert_eq!(config.retrieval.chunk_size, 500);
        assert_eq!(config.retrieval.chunk_overlap, 50);
        assert_eq!(config.llm.timeout_secs, 30);
        assert_eq!(config.llm.provider, "ollama");
        assert_eq!(config.llm.model, "llama3.2");
        assert_eq!(config.embedding.dimensions, 256);
        assert_eq!(config.embedding.provider, "trigram");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_explicit_config_file() {
        let result = AppConfig::load_with(Some(Path::new("/nonexistent/vcraft.yaml")), |_| None);
        assert!(matches!(result, Err(AppError::Config(_))));
    }

    #[test]
    fn test_api_key_from_named_env_var() {
        let mut config = AppConfig::default();
        config.llm.provider = "openai".to_string();
        config.llm.api_key_env = Some("PITCH_LLM_KEY".to_string());

        // A named variable replaces the provider default
        config.apply_env(env_from(&[
            ("PITCH_LLM_KEY", "sk-test"),
            ("OPENAI_API_KEY", "sk-other"),
        ]));
        assert_eq!(config.llm.api_key.as_deref(), Some("sk-test"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_provider_default_key_vars() {
        let env = env_from(&[
            ("VCRAFT_LLM_PROVIDER", "openai"),
            ("OPENAI_API_KEY", "sk-openai"),
            ("GEMINI_API_KEY", "gm-key"),
        ]);
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("vcraft.yaml");
        std::fs::write(&path, "knowledge_base_path: ./kb\n").unwrap();

        // Provider comes from the environment before the key is resolved
        let openai = AppConfig::load_with(Some(&path), env).unwrap();
        assert_eq!(openai.llm.api_key.as_deref(), Some("sk-openai"));

        let mut gemini = AppConfig::default();
        gemini.llm.provider = "gemini".to_string();
        gemini.apply_env(env_from(&[("GEMINI_API_KEY", "gm-key")]));
        assert_eq!(gemini.llm.api_key.as_deref(), Some("gm-key"));
        assert!(gemini.validate().is_ok());

        // Ollama never picks up a key
        let mut ollama = AppConfig::default();
        ollama.apply_env(env_from(&[("OPENAI_API_KEY", "sk-openai")]));
        assert!(ollama.llm.api_key.is_none());
    }

    #[test]
    fn test_gemini_without_key_is_config_error() {
        let mut config = AppConfig::default();
        config.llm.provider = "gemini".to_string();
        match config.validate() {
            Err(AppError::Config(msg)) => assert!(msg.contains("GEMINI_API_KEY")),
            other => panic!("Expected config error, got {:?}", other),
        }
    }

    #[test]
    fn test_openai_without_key_is_config_error() {
        let mut config = AppConfig::default();
        config.llm.provider = "openai".to_string();
        let err = config.validate().unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
        assert!(!err.is_retryable());

        // Retrieval alone does not need the LLM key
        assert!(config.validate_retrieval().is_ok());
    }

    #[test]
    fn test_with_overrides() {
        let config = AppConfig::default().with_overrides(
            Some(PathBuf::from("/kb")),
            None,
            None,
            true,
            true,
            false,
        );

        assert_eq!(config.knowledge_base_path, PathBuf::from("/kb"));
        assert_eq!(config.log_level, Some("debug".to_string()));
        assert_eq!(config.log_format(), LogFormat::Json);
    }

    #[test]
    fn test_validate_rejects_bad_chunk_policy() {
        let mut config = AppConfig::default();
        config.retrieval.chunk_overlap = 500;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_unknown_embedding_provider() {
        let mut config = AppConfig::default();
        config.embedding.provider = "faiss".to_string();
        assert!(config.validate().is_err());
    }
}
