use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TideChatError};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub anthropic: Option<AnthropicConfig>,
    #[serde(default)]
    pub auth: Option<AuthConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnthropicConfig {
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub base_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(default)]
    pub secret: Option<String>,
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .map_err(|e| TideChatError::Config(e.to_string()))?;
        let config: Config =
            serde_json::from_str(&content).map_err(|e| TideChatError::Config(e.to_string()))?;
        Ok(config)
    }

    pub fn api_key(&self) -> Option<&str> {
        self.anthropic.as_ref()?.api_key.as_deref()
    }

    pub fn model(&self) -> Option<&str> {
        self.anthropic.as_ref()?.model.as_deref()
    }

    pub fn base_url(&self) -> Option<&str> {
        self.anthropic.as_ref()?.base_url.as_deref()
    }

    pub fn auth_secret(&self) -> Option<&str> {
        self.auth.as_ref()?.secret.as_deref()
    }
}
