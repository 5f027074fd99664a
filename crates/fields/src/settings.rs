use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::storage::{KeyValueStore, Result, StorageError};

pub const SETTINGS_KEY: &str = "website-whisper-settings";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Model {
    #[default]
    #[serde(rename = "gpt-4o")]
    Gpt4o,
    #[serde(rename = "gpt-4o-mini")]
    Gpt4oMini,
    #[serde(rename = "gpt-4.5-preview")]
    Gpt45Preview,
}

impl Model {
    pub const ALL: [Model; 3] = [Model::Gpt4o, Model::Gpt4oMini, Model::Gpt45Preview];

    pub fn as_str(&self) -> &'static str {
        match self {
            Model::Gpt4o => "gpt-4o",
            Model::Gpt4oMini => "gpt-4o-mini",
            Model::Gpt45Preview => "gpt-4.5-preview",
        }
    }
}

impl fmt::Display for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Model {
    type Err = StorageError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Model::ALL
            .into_iter()
            .find(|m| m.as_str() == s.trim())
            .ok_or_else(|| StorageError::InvalidSetting(format!("unknown model: {}", s)))
    }
}

/// Model and prompt preferences.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub model: Model,
    #[serde(default)]
    pub custom_prompt: Option<String>,
}

/// Reads and writes the single settings record.
pub struct SettingsStore {
    store: Arc<dyn KeyValueStore>,
}

impl SettingsStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub async fn load(&self) -> Result<Settings> {
        match self.store.get(SETTINGS_KEY).await? {
            Some(json) => Ok(serde_json::from_str(&json)?),
            None => Ok(Settings::default()),
        }
    }

    pub async fn set_model(&self, model: Model) -> Result<Settings> {
        let mut settings = self.load().await?;
        settings.model = model;
        self.save(&settings).await?;
        Ok(settings)
    }

    pub async fn save_custom_prompt(&self, prompt: &str) -> Result<Settings> {
        if prompt.trim().is_empty() {
            return Err(StorageError::InvalidSetting("prompt cannot be empty".to_string()));
        }

        let mut settings = self.load().await?;
        settings.custom_prompt = Some(prompt.to_string());
        self.save(&settings).await?;
        Ok(settings)
    }

    pub async fn reset_custom_prompt(&self) -> Result<Settings> {
        let mut settings = self.load().await?;
        settings.custom_prompt = None;
        self.save(&settings).await?;
        Ok(settings)
    }

    async fn save(&self, settings: &Settings) -> Result<()> {
        let json = serde_json::to_string(settings)?;
        self.store.set(SETTINGS_KEY, &json).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    #[test]
    fn test_model_parse() {
        assert_eq!("gpt-4o-mini".parse::<Model>().unwrap(), Model::Gpt4oMini);
        assert!("gpt-2".parse::<Model>().is_err());
        assert_eq!(serde_json::to_string(&Model::Gpt45Preview).unwrap(), "\"gpt-4.5-preview\"");
    }

    #[tokio::test]
    async fn test_defaults_when_nothing_saved() {
        let settings = SettingsStore::new(Arc::new(MemoryStore::new()));
        let loaded = settings.load().await.unwrap();

        assert_eq!(loaded.model, Model::Gpt4o);
        assert_eq!(loaded.custom_prompt, None);
    }

    #[tokio::test]
    async fn test_prompt_save_and_reset() {
        let settings = SettingsStore::new(Arc::new(MemoryStore::new()));

        settings.save_custom_prompt("List the founders").await.unwrap();
        settings.set_model(Model::Gpt4oMini).await.unwrap();

        let loaded = settings.load().await.unwrap();
        assert_eq!(loaded.custom_prompt.as_deref(), Some("List the founders"));
        assert_eq!(loaded.model, Model::Gpt4oMini);

        let reset = settings.reset_custom_prompt().await.unwrap();
        assert_eq!(reset.custom_prompt, None);
        assert_eq!(reset.model, Model::Gpt4oMini);
    }

    #[tokio::test]
    async fn test_empty_prompt_rejected() {
        let settings = SettingsStore::new(Arc::new(MemoryStore::new()));
        assert!(settings.save_custom_prompt("  \n").await.is_err());
    }
}
