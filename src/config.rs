use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

use crate::util::is_local_endpoint_url;

const DEFAULT_API_URL: &str = "https://open.bigmodel.cn/api/paas/v4/chat/completions";
const DEFAULT_MODEL: &str = "glm-4-flash";
const DEFAULT_THINKING_MODEL: &str = "glm-4.5";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub api_key: Option<String>,
    pub api_url: String,
    pub model: String,
    pub thinking_model: String,
    pub system_prompt: Option<String>,
}

impl Config {
    pub fn load() -> Result<Self> {
        let api_url =
            std::env::var("GLINT_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string());
        let api_key = std::env::var("GLINT_API_KEY").ok().and_then(|v| {
            if v.trim().is_empty() {
                None
            } else {
                Some(v)
            }
        });
        let model = std::env::var("GLINT_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());
        let thinking_model = std::env::var("GLINT_THINKING_MODEL")
            .unwrap_or_else(|_| DEFAULT_THINKING_MODEL.to_string());
        let system_prompt = std::env::var("GLINT_SYSTEM_PROMPT")
            .ok()
            .filter(|v| !v.trim().is_empty());

        Ok(Self {
            api_key,
            api_url,
            model,
            thinking_model,
            system_prompt,
        })
    }

    pub fn validate(&self) -> Result<()> {
        if !self.api_url.starts_with("http://") && !self.api_url.starts_with("https://") {
            bail!(
                "Invalid GLINT_API_URL '{}': expected http:// or https:// URL",
                self.api_url
            );
        }

        if !self.is_local_endpoint() && self.api_key.is_none() {
            bail!(
                "GLINT_API_KEY must be set for non-local endpoints (url: '{}')",
                self.api_url
            );
        }

        if self.model.trim().is_empty() || self.thinking_model.trim().is_empty() {
            bail!("GLINT_MODEL and GLINT_THINKING_MODEL must be non-empty");
        }

        Ok(())
    }

    fn is_local_endpoint(&self) -> bool {
        is_local_endpoint_url(&self.api_url)
    }
}
