use crate::core::error::MchatError;
use reqwest::{Client, Response};
use serde::Serialize;
use std::collections::HashMap;

/// Thin JSON-over-HTTP client shared by the provider implementations.
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    endpoint: String,
    extra_headers: HashMap<String, String>,
}

impl HttpClient {
    pub fn new(endpoint: String, extra_headers: Option<HashMap<String, String>>) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.trim_end_matches('/').to_string(),
            extra_headers: extra_headers.unwrap_or_default(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub async fn post<T: Serialize + ?Sized>(
        &self,
        path: &str,
        bearer: &str,
        payload: &T,
    ) -> Result<Response, MchatError> {
        let url = format!("{}/{}", self.endpoint, path);

        let mut request = self
            .client
            .post(&url)
            .bearer_auth(bearer)
            .header("Content-Type", "application/json");

        for (key, value) in &self.extra_headers {
            request = request.header(key, value);
        }

        let response = request.json(payload).send().await?;
        Ok(response)
    }
}
