use crate::models::Provider;

/// Instruction sent ahead of every chat-completion conversation.
pub const ASSISTANT_SYSTEM_PROMPT: &str =
    "You are a helpful assistant that can analyze both text and uploaded files.";

pub const DEFAULT_TEMPERATURE: f32 = 0.7;

/// A model the router knows how to reach. Immutable once registered.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelConfig {
    pub identifier: String,
    pub provider: Provider,
    pub temperature: f32,
    pub supports_vision: bool,
    pub system_prompt: Option<String>,
}

impl ModelConfig {
    pub fn new(identifier: &str, provider: Provider) -> Self {
        Self {
            identifier: identifier.to_string(),
            provider,
            temperature: DEFAULT_TEMPERATURE,
            supports_vision: false,
            system_prompt: None,
        }
    }

    pub fn with_vision(mut self) -> Self {
        self.supports_vision = true;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_system_prompt(mut self, prompt: &str) -> Self {
        self.system_prompt = Some(prompt.to_string());
        self
    }
}

/// Registered models, looked up by exact identifier. Built once at startup.
#[derive(Debug, Clone, Default)]
pub struct ModelCatalog {
    models: Vec<ModelConfig>,
}

impl ModelCatalog {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Register a model. A later registration replaces an earlier one with
    /// the same identifier.
    pub fn with_model(mut self, config: ModelConfig) -> Self {
        self.models.retain(|m| m.identifier != config.identifier);
        self.models.push(config);
        self
    }

    pub fn get(&self, identifier: &str) -> Option<&ModelConfig> {
        self.models.iter().find(|m| m.identifier == identifier)
    }

    pub fn identifiers(&self) -> Vec<&str> {
        self.models.iter().map(|m| m.identifier.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}

/// Two Groq chat models and one Google vision model.
pub fn default_catalog() -> ModelCatalog {
    ModelCatalog::empty()
        .with_model(
            ModelConfig::new("mixtral-8x7b-32768", Provider::Groq)
                .with_system_prompt(ASSISTANT_SYSTEM_PROMPT),
        )
        .with_model(
            ModelConfig::new("llama-3.3-70b-versatile", Provider::Groq)
                .with_system_prompt(ASSISTANT_SYSTEM_PROMPT),
        )
        .with_model(ModelConfig::new("gemini-pro", Provider::Google).with_vision())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_catalog_contents() {
        let catalog = default_catalog();
        assert_eq!(
            catalog.identifiers(),
            vec!["mixtral-8x7b-32768", "llama-3.3-70b-versatile", "gemini-pro"]
        );

        let gemini = catalog.get("gemini-pro").unwrap();
        assert_eq!(gemini.provider, Provider::Google);
        assert!(gemini.supports_vision);
        assert!(gemini.system_prompt.is_none());

        let mixtral = catalog.get("mixtral-8x7b-32768").unwrap();
        assert_eq!(mixtral.provider, Provider::Groq);
        assert!(!mixtral.supports_vision);
        assert_eq!(mixtral.temperature, 0.7);
        assert_eq!(mixtral.system_prompt.as_deref(), Some(ASSISTANT_SYSTEM_PROMPT));
    }

    #[test]
    fn lookup_is_exact() {
        let catalog = default_catalog();
        assert!(catalog.get("GEMINI-PRO").is_none());
        assert!(catalog.get("gemini").is_none());
        assert!(catalog.get("").is_none());
    }

    #[test]
    fn re_registration_replaces() {
        let catalog = ModelCatalog::empty()
            .with_model(ModelConfig::new("m", Provider::Groq))
            .with_model(ModelConfig::new("m", Provider::Google).with_temperature(0.1));
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.get("m").unwrap().provider, Provider::Google);
        assert_eq!(catalog.get("m").unwrap().temperature, 0.1);
    }
}
