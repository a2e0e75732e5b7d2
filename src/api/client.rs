use super::logging::{debug_payload_enabled, emit_debug_payload};
use crate::config::Config;
use crate::types::ApiMessage;
use crate::util::is_local_endpoint_url;
use anyhow::{anyhow, Result};
use bytes::Bytes;
use futures::{Stream, StreamExt};
use serde_json::json;
use std::pin::Pin;
#[cfg(test)]
use std::sync::Arc;

pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes>> + Send>>;

const TOP_P: f64 = 0.95;
const MAX_TOKENS: u32 = 8192;

#[cfg(test)]
pub trait MockStreamProducer: Send + Sync {
    fn create_mock_stream(&self, messages: &[ApiMessage]) -> Result<ByteStream>;
}

#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    api_key: Option<String>,
    api_url: String,
    #[cfg(test)]
    mock_stream_producer: Option<Arc<dyn MockStreamProducer>>,
}

impl ApiClient {
    pub fn new(config: &Config) -> Result<Self> {
        Ok(Self {
            http: reqwest::Client::new(),
            api_key: config.api_key.clone(),
            api_url: config.api_url.clone(),
            #[cfg(test)]
            mock_stream_producer: None,
        })
    }

    #[cfg(test)]
    pub fn new_mock(mock_producer: Arc<dyn MockStreamProducer>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key: None,
            api_url: "http://localhost:8000/v1/chat/completions".to_string(),
            mock_stream_producer: Some(mock_producer),
        }
    }

    pub fn is_local_endpoint(&self) -> bool {
        is_local_endpoint_url(&self.api_url)
    }

    /// Open one streaming completion request and hand back the raw byte
    /// stream. Everything before the first byte of the body is fatal here;
    /// per-line decode problems are the stream parser's business.
    pub async fn create_stream(&self, messages: &[ApiMessage], model: &str) -> Result<ByteStream> {
        #[cfg(test)]
        {
            if let Some(producer) = &self.mock_stream_producer {
                return producer.create_mock_stream(messages);
            }
        }

        let payload = json!({
            "model": model,
            "messages": messages,
            "stream": true,
            "temperature": temperature_for_model(model),
            "top_p": TOP_P,
            "max_tokens": MAX_TOKENS,
        });

        let mut request = self
            .http
            .post(&self.api_url)
            .header("content-type", "application/json")
            .json(&payload);

        if let Some(api_key) = &self.api_key {
            request = request.header("authorization", format!("Bearer {api_key}"));
        }

        if debug_payload_enabled() {
            emit_debug_payload(&self.api_url, &payload);
        }

        let response = request
            .send()
            .await
            .map_err(|error| map_api_request_error(error, &self.api_url))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable response body>".to_string());
            return Err(anyhow!("API error: {} - {}", status.as_u16(), body));
        }

        let request_url = self.api_url.clone();
        let stream = response
            .bytes_stream()
            .map(move |item| item.map_err(|error| map_api_request_error(error, &request_url)));
        Ok(Box::pin(stream))
    }
}

/// 0.6 for the reasoning-capable model family, 0.7 otherwise.
pub fn temperature_for_model(model: &str) -> f64 {
    if model.contains("4.5") {
        0.6
    } else {
        0.7
    }
}

fn map_api_request_error(error: reqwest::Error, request_url: &str) -> anyhow::Error {
    if error.is_connect() && is_local_endpoint_url(request_url) {
        return anyhow!(
            "cannot reach local API endpoint '{}': {}. Start your local server or update GLINT_API_URL.",
            request_url,
            error
        );
    }
    if error.is_connect() {
        return anyhow!("cannot reach API endpoint '{}': {}", request_url, error);
    }
    if error.is_timeout() {
        return anyhow!("API request to '{}' timed out: {}", request_url, error);
    }
    if error.is_body() || error.is_decode() {
        return anyhow!(
            "response body from '{}' was not readable: {}",
            request_url,
            error
        );
    }
    anyhow!("API request to '{}' failed: {}", request_url, error)
}
