use anyhow::{Context, Result};
use fields::Model;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: String,
    pub openai: OpenAiConfig,
}

#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    /// Extraction requests fail with a 500 envelope while this is unset.
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: Model,
    pub temperature: f32,
    pub max_tokens: u32,
    pub request_timeout_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:3000".to_string(),
            openai: OpenAiConfig {
                api_key: None,
                base_url: "https://api.openai.com/v1".to_string(),
                model: Model::Gpt4o,
                temperature: 0.5,
                max_tokens: 1000,
                request_timeout_secs: 60,
            },
        }
    }
}

impl OpenAiConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any variable source, starting from the defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(addr) = lookup("WHISPER_BIND_ADDR") {
            config.bind_addr = addr;
        }
        config.openai.api_key = lookup("OPENAI_API_KEY").filter(|k| !k.trim().is_empty());
        if let Some(url) = lookup("OPENAI_BASE_URL") {
            config.openai.base_url = url;
        }
        if let Some(model) = lookup("WHISPER_MODEL") {
            config.openai.model = model.parse().context("Invalid WHISPER_MODEL")?;
        }
        if let Some(value) = parse_var(&lookup, "WHISPER_TEMPERATURE")? {
            config.openai.temperature = value;
        }
        if let Some(value) = parse_var(&lookup, "WHISPER_MAX_TOKENS")? {
            config.openai.max_tokens = value;
        }
        if let Some(value) = parse_var(&lookup, "WHISPER_REQUEST_TIMEOUT_SECS")? {
            config.openai.request_timeout_secs = value;
        }

        Ok(config)
    }
}

fn parse_var<F, T>(lookup: &F, key: &str) -> Result<Option<T>>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    lookup(key)
        .map(|raw| raw.trim().parse::<T>().with_context(|| format!("Invalid {}: {}", key, raw)))
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::from_lookup(lookup(&[])).unwrap();

        assert_eq!(config.bind_addr, "0.0.0.0:3000");
        assert_eq!(config.openai.api_key, None);
        assert_eq!(config.openai.model, Model::Gpt4o);
        assert_eq!(config.openai.max_tokens, 1000);
        assert_eq!(config.openai.request_timeout(), Duration::from_secs(60));
    }

    #[test]
    fn test_overrides() {
        let config = AppConfig::from_lookup(lookup(&[
            ("WHISPER_BIND_ADDR", "127.0.0.1:8080"),
            ("OPENAI_API_KEY", "sk-test"),
            ("WHISPER_MODEL", "gpt-4o-mini"),
            ("WHISPER_TEMPERATURE", "0.2"),
            ("WHISPER_MAX_TOKENS", "400"),
        ]))
        .unwrap();

        assert_eq!(config.bind_addr, "127.0.0.1:8080");
        assert_eq!(config.openai.api_key.as_deref(), Some("sk-test"));
        assert_eq!(config.openai.model, Model::Gpt4oMini);
        assert_eq!(config.openai.temperature, 0.2);
        assert_eq!(config.openai.max_tokens, 400);
    }

    #[test]
    fn test_blank_key_is_unset() {
        let config = AppConfig::from_lookup(lookup(&[("OPENAI_API_KEY", "  ")])).unwrap();
        assert_eq!(config.openai.api_key, None);
    }

    #[test]
    fn test_bad_number_is_an_error() {
        let err = AppConfig::from_lookup(lookup(&[("WHISPER_MAX_TOKENS", "lots")])).unwrap_err();
        assert!(err.to_string().contains("WHISPER_MAX_TOKENS"));
    }
}
