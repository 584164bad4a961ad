//! Connection settings for an OpenAI-compatible chat completions endpoint.

use secrecy::SecretString;

use ragway_types::config::GenerationConfig;

/// Configuration for [`super::OpenAiCompatibleProvider`].
///
/// Not `Debug`: holds the server-side API key.
pub struct OpenAiCompatConfig {
    /// Human-readable provider name, reported as `gen_ai.system`.
    pub provider_name: String,
    /// Base URL for the API (e.g., "https://api.openai.com/v1").
    pub base_url: String,
    /// Server-side key used when a request carries no credential.
    pub api_key: Option<SecretString>,
}

impl OpenAiCompatConfig {
    /// Build from the `[generation]` section. Empty keys count as absent.
    pub fn from_generation(config: &GenerationConfig) -> Self {
        Self {
            provider_name: provider_name_for(&config.base_url).to_string(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config
                .api_key
                .as_deref()
                .filter(|k| !k.is_empty())
                .map(|k| SecretString::from(k.to_string())),
        }
    }
}

/// Infer a provider name from the base URL host.
fn provider_name_for(base_url: &str) -> &'static str {
    if base_url.contains("api.openai.com") {
        "openai"
    } else if base_url.contains("openai.azure.com") {
        "azure_openai"
    } else if base_url.contains("api.mistral.ai") {
        "mistral"
    } else if base_url.contains("generativelanguage.googleapis.com") {
        "gemini"
    } else {
        "openai_compatible"
    }
}

#[cfg(test)]
mod tests {
    use secrecy::ExposeSecret;

    use super::*;

    #[test]
    fn test_defaults_point_at_openai() {
        let config = OpenAiCompatConfig::from_generation(&GenerationConfig::default());
        assert_eq!(config.provider_name, "openai");
        assert_eq!(config.base_url, "https://api.openai.com/v1");
        assert!(config.api_key.is_none());
    }

    #[test]
    fn test_custom_base_url_and_key() {
        let generation = GenerationConfig {
            base_url: "http://localhost:8080/v1/".to_string(),
            api_key: Some("sk-server".to_string()),
            model: None,
        };
        let config = OpenAiCompatConfig::from_generation(&generation);
        assert_eq!(config.provider_name, "openai_compatible");
        assert_eq!(config.base_url, "http://localhost:8080/v1");
        assert_eq!(
            config.api_key.as_ref().map(|k| k.expose_secret().to_string()),
            Some("sk-server".to_string())
        );
    }

    #[test]
    fn test_empty_key_is_absent() {
        let generation = GenerationConfig {
            api_key: Some(String::new()),
            ..GenerationConfig::default()
        };
        assert!(OpenAiCompatConfig::from_generation(&generation).api_key.is_none());
    }
}
