//! Typed HTTP client for the todo API.
//!
//! Mirrors what the task list frontend does: it loads the list, adds items
//! (never with an empty task), flips `completed` and deletes.

use std::time::Duration;

use reqwest::{Method, RequestBuilder, Response};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::api::{ApiError, CreateTodoRequest, MessageResponse, UpdateTodoRequest};
use crate::domain::{TodoId, TodoItem, TodoPatch};

/// Default request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Errors returned by [`TodoClient`].
#[derive(Debug, Error)]
pub enum ClientError {
    /// Transport failure or undecodable response.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The service answered with a non-success status.
    #[error("API error ({status}): {message}")]
    Api {
        /// Response status code.
        status: u16,
        /// `message` from the error body, or the raw body.
        message: String,
    },

    /// The request was refused before sending.
    #[error("Invalid request: {0}")]
    Validation(String),
}

/// Body of `GET /health`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HealthStatus {
    /// `"ok"` when the service is up.
    pub status: String,
    /// Service version.
    #[serde(default)]
    pub version: String,
}

/// Client for one todo service instance.
#[derive(Debug, Clone)]
pub struct TodoClient {
    client: reqwest::Client,
    base_url: String,
}

impl TodoClient {
    /// Creates a client for `base_url` (e.g. `http://localhost:5000`).
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Http` if the underlying client cannot be built.
    pub fn new(base_url: impl Into<String>) -> Result<Self, ClientError> {
        Self::with_timeout(base_url, DEFAULT_TIMEOUT)
    }

    /// Creates a client with an explicit request timeout.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Http` if the underlying client cannot be built.
    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ClientError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Ok(Self { client, base_url })
    }

    /// Base URL without a trailing slash.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client
            .request(method, format!("{}{path}", self.base_url))
    }

    /// Fetches every item.
    ///
    /// # Errors
    ///
    /// Returns `ClientError` on transport failure or a non-success status.
    pub async fn list(&self) -> Result<Vec<TodoItem>, ClientError> {
        let response = self.request(Method::GET, "/todos").send().await?;
        decode(response).await
    }

    /// Adds an item. Blank task text is refused without a request.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Validation` for a blank task, otherwise
    /// `ClientError` on transport failure or a non-success status.
    pub async fn create(&self, task: &str) -> Result<TodoItem, ClientError> {
        if task.trim().is_empty() {
            return Err(ClientError::Validation("Task is required".to_string()));
        }

        let response = self
            .request(Method::POST, "/todos")
            .json(&CreateTodoRequest::new(task))
            .send()
            .await?;
        decode(response).await
    }

    /// Applies a partial update.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Api` with status 404 for an unknown id, or
    /// another `ClientError` on failure.
    pub async fn update(&self, id: &TodoId, patch: TodoPatch) -> Result<TodoItem, ClientError> {
        let response = self
            .request(Method::PUT, &format!("/todos/{id}"))
            .json(&UpdateTodoRequest::from(patch))
            .send()
            .await?;
        decode(response).await
    }

    /// Flips the completion flag of `item`, sending only `completed`.
    ///
    /// # Errors
    ///
    /// Same as [`TodoClient::update`].
    pub async fn toggle_completed(&self, item: &TodoItem) -> Result<TodoItem, ClientError> {
        self.update(&item.id, TodoPatch::completed(!item.completed))
            .await
    }

    /// Deletes an item. Succeeds whether or not the id existed.
    ///
    /// # Errors
    ///
    /// Returns `ClientError` on transport failure or a non-success status.
    pub async fn delete(&self, id: &TodoId) -> Result<MessageResponse, ClientError> {
        let response = self
            .request(Method::DELETE, &format!("/todos/{id}"))
            .send()
            .await?;
        decode(response).await
    }

    /// Calls the liveness endpoint.
    ///
    /// # Errors
    ///
    /// Returns `ClientError` on transport failure or a non-success status.
    pub async fn health(&self) -> Result<HealthStatus, ClientError> {
        let response = self.request(Method::GET, "/health").send().await?;
        decode(response).await
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response.json().await?);
    }

    let body = response.text().await?;
    let message = serde_json::from_str::<ApiError>(&body).map_or(body, |error| error.message);
    Err(ClientError::Api {
        status: status.as_u16(),
        message,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("http://localhost:5000", "http://localhost:5000")]
    #[case("http://localhost:5000/", "http://localhost:5000")]
    fn test_base_url_normalized(#[case] raw: &str, #[case] expected: &str) {
        assert_eq!(TodoClient::new(raw).unwrap().base_url(), expected);
    }

    #[rstest]
    #[case("")]
    #[case("   ")]
    #[tokio::test]
    async fn test_create_refuses_blank_task(#[case] task: &str) {
        // Port 9 (discard) is never contacted.
        let client = TodoClient::new("http://127.0.0.1:9").unwrap();
        let error = client.create(task).await.unwrap_err();
        assert!(matches!(error, ClientError::Validation(_)));
    }

    #[rstest]
    #[tokio::test]
    async fn test_truncated_error_body_is_transport_error() {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};
        use tokio::net::TcpListener;

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut request = [0_u8; 1024];
            let _ = stream.read(&mut request).await.unwrap();
            stream
                .write_all(
                    b"HTTP/1.1 500 Internal Server Error\r\n\
                      Content-Type: application/json\r\n\
                      Content-Length: 100\r\n\r\n{\"message\":",
                )
                .await
                .unwrap();
        });

        let client = TodoClient::new(format!("http://{address}")).unwrap();
        let error = client.list().await.unwrap_err();

        assert!(matches!(error, ClientError::Http(_)));
    }
}
