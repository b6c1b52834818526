//! Remote document service over HTTP.
//!
//! Protocol: `GET {base}/documents/{key}` returns the JSON document or 404,
//! `PUT {base}/documents/{key}` with a JSON body replaces it.

use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde_json::Value;

use super::DocumentStore;
use crate::error::{AppError, Result};

/// HTTP-backed document store.
#[derive(Debug, Clone)]
pub struct HttpStore {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl HttpStore {
    /// Create a client for `base_url` (e.g. "https://docs.example.com/api").
    pub fn new(base_url: &str, token: Option<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::config(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        })
    }

    fn document_url(&self, key: &str) -> String {
        format!("{base}/documents/{key}", base = self.base_url)
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}

impl DocumentStore for HttpStore {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        let response = self
            .authorize(self.client.get(self.document_url(key)))
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = response.error_for_status()?;

        // Some services answer an unknown key with `200 null`.
        match response.json::<Value>().await? {
            Value::Null => Ok(None),
            document => Ok(Some(document)),
        }
    }

    async fn put(&self, key: &str, document: Value) -> Result<()> {
        self.authorize(self.client.put(self.document_url(key)))
            .json(&document)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}
