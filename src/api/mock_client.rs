use crate::api::client::{ByteStream, MockStreamProducer};
use crate::types::ApiMessage;
use anyhow::Result;
use bytes::Bytes;
use futures::stream;
use std::sync::{Arc, Mutex};

/// One scripted streaming response: raw byte chunks (split anywhere, not
/// necessarily on line boundaries) optionally followed by a transport error.
#[derive(Clone)]
pub struct MockResponse {
    pub chunks: Vec<String>,
    pub trailing_error: Option<String>,
}

impl MockResponse {
    pub fn from_chunks(chunks: Vec<String>) -> Self {
        Self {
            chunks,
            trailing_error: None,
        }
    }

    pub fn with_trailing_error(chunks: Vec<String>, error: &str) -> Self {
        Self {
            chunks,
            trailing_error: Some(error.to_string()),
        }
    }
}

#[derive(Clone)]
pub struct MockApiClient {
    responses: Arc<Mutex<Vec<MockResponse>>>,
}

impl MockApiClient {
    pub fn new(responses: Vec<MockResponse>) -> Self {
        Self {
            responses: Arc::new(Mutex::new(responses)),
        }
    }
}

impl MockStreamProducer for MockApiClient {
    fn create_mock_stream(&self, _messages: &[ApiMessage]) -> Result<ByteStream> {
        let mut responses_guard = self.responses.lock().unwrap();
        if responses_guard.is_empty() {
            return Err(anyhow::anyhow!(
                "MockApiClient: No more responses configured"
            ));
        }
        let response = responses_guard.remove(0);

        let mut items: Vec<Result<Bytes>> = response
            .chunks
            .into_iter()
            .map(|chunk| Ok(Bytes::from(chunk)))
            .collect();
        if let Some(error) = response.trailing_error {
            items.push(Err(anyhow::anyhow!(error)));
        }

        Ok(Box::pin(stream::iter(items)))
    }
}
