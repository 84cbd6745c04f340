use std::collections::HashMap;
use std::path::PathBuf;

use crate::models::Provider;

/// Application-level constants
pub const APP_NAME: &str = "Docent";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Log filter used when `RUST_LOG` is unset.
pub fn default_log_filter() -> &'static str {
    "docent=info,warn"
}

pub const DEFAULT_GROQ_BASE_URL: &str = "https://api.groq.com/openai/v1";
pub const DEFAULT_GOOGLE_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 120;

/// Retrieved snippets used to ground an analysis.
pub const DEFAULT_CONTEXT_K: usize = 3;

/// API keys per provider. Empty values count as missing.
#[derive(Clone, Default)]
pub struct Credentials {
    keys: HashMap<Provider, String>,
}

impl Credentials {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read `GROQ_API_KEY` and `GOOGLE_API_KEY`.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut creds = Self::new();
        for provider in [Provider::Groq, Provider::Google] {
            if let Some(key) = lookup(provider.credential_var()) {
                creds = creds.with_key(provider, key);
            }
        }
        creds
    }

    pub fn with_key(mut self, provider: Provider, key: impl Into<String>) -> Self {
        let key = key.into();
        if key.trim().is_empty() {
            self.keys.remove(&provider);
        } else {
            self.keys.insert(provider, key.trim().to_string());
        }
        self
    }

    pub fn get(&self, provider: Provider) -> Option<&str> {
        self.keys.get(&provider).map(String::as_str)
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut providers: Vec<&str> = self.keys.keys().map(|p| p.as_str()).collect();
        providers.sort_unstable();
        f.debug_struct("Credentials")
            .field("providers", &providers)
            .finish()
    }
}

/// Where provider HTTP requests go.
#[derive(Debug, Clone)]
pub struct ProviderEndpoints {
    pub groq_base_url: String,
    pub google_base_url: String,
    pub timeout_secs: u64,
}

impl Default for ProviderEndpoints {
    fn default() -> Self {
        Self {
            groq_base_url: DEFAULT_GROQ_BASE_URL.to_string(),
            google_base_url: DEFAULT_GOOGLE_BASE_URL.to_string(),
            timeout_secs: DEFAULT_HTTP_TIMEOUT_SECS,
        }
    }
}

/// External binaries used for extraction.
#[derive(Debug, Clone)]
pub struct ToolPaths {
    pub tesseract: PathBuf,
    pub ffprobe: PathBuf,
    pub ocr_language: String,
}

impl Default for ToolPaths {
    fn default() -> Self {
        Self {
            tesseract: PathBuf::from("tesseract"),
            ffprobe: PathBuf::from("ffprobe"),
            ocr_language: "eng".to_string(),
        }
    }
}

/// How much conversation history an engine keeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RetentionPolicy {
    /// Keep every turn for the life of the session.
    #[default]
    Unbounded,
    /// Keep at most `max_turns` turns, dropping the oldest exchanges first.
    SlidingWindow { max_turns: usize },
}

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub retention: RetentionPolicy,
    pub context_k: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            retention: RetentionPolicy::Unbounded,
            context_k: DEFAULT_CONTEXT_K,
        }
    }
}

/// Everything the pipeline needs, built once at startup.
#[derive(Debug, Clone, Default)]
pub struct AppConfig {
    pub credentials: Credentials,
    pub endpoints: ProviderEndpoints,
    pub tools: ToolPaths,
    pub engine: EngineConfig,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable lookup. Unset or unparsable values
    /// keep their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self {
            credentials: Credentials::from_lookup(&lookup),
            ..Self::default()
        };

        if let Some(url) = lookup("DOCENT_GROQ_BASE_URL") {
            config.endpoints.groq_base_url = url;
        }
        if let Some(url) = lookup("DOCENT_GOOGLE_BASE_URL") {
            config.endpoints.google_base_url = url;
        }
        if let Some(secs) = lookup("DOCENT_HTTP_TIMEOUT_SECS").and_then(|v| v.parse().ok()) {
            config.endpoints.timeout_secs = secs;
        }

        if let Some(path) = lookup("TESSERACT_CMD") {
            config.tools.tesseract = PathBuf::from(path);
        }
        if let Some(path) = lookup("FFPROBE_CMD") {
            config.tools.ffprobe = PathBuf::from(path);
        }
        if let Some(lang) = lookup("DOCENT_OCR_LANG") {
            config.tools.ocr_language = lang;
        }

        if let Some(max_turns) = lookup("DOCENT_MEMORY_WINDOW").and_then(|v| v.parse().ok()) {
            config.engine.retention = RetentionPolicy::SlidingWindow { max_turns };
        }
        if let Some(k) = lookup("DOCENT_CONTEXT_K").and_then(|v| v.parse().ok()) {
            config.engine.context_k = k;
        }

        config
    }
}
