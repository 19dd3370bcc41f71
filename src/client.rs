//! HTTP client for the task/project API.
//!
//! Every call is a single round trip: no retry, no caching. Configuration
//! comes from [`ClientConfig`](crate::config::ClientConfig).

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::{Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::config::ClientConfig;
use crate::models::*;

/// Failure of a remote call.
#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// Non-success status other than 401, with the raw response body.
    #[error("server returned {status}: {body}")]
    Status { status: u16, body: String },

    /// 401 from the store. Belongs to the surrounding application, not the board.
    #[error("session expired")]
    SessionExpired,

    #[error("could not decode response: {0}")]
    Decode(String),
}

impl RemoteError {
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::SessionExpired => Some(401),
            Self::Transport(e) => e.status().map(|s| s.as_u16()),
            Self::Decode(_) => None,
        }
    }
}

/// Remote operations the board depends on.
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Tasks dated `date`.
    async fn tasks_for_date(&self, date: NaiveDate) -> Result<Vec<Task>, RemoteError>;

    /// All undated tasks, with or without a project.
    async fn inbox_tasks(&self) -> Result<Vec<Task>, RemoteError>;

    async fn create_task(&self, input: &CreateTaskInput) -> Result<Task, RemoteError>;

    async fn update_task(&self, id: TaskId, input: &UpdateTaskInput) -> Result<Task, RemoteError>;

    async fn toggle_task(&self, id: TaskId) -> Result<Task, RemoteError>;

    async fn delete_task(&self, id: TaskId) -> Result<(), RemoteError>;

    async fn projects(&self) -> Result<Vec<Project>, RemoteError>;

    async fn create_project(&self, input: &CreateProjectInput) -> Result<Project, RemoteError>;

    /// Hand freeform text to the decomposition service. Any tasks it creates
    /// are picked up by the next reload.
    async fn process_brain_dump(&self, request: &BrainDumpRequest) -> Result<(), RemoteError>;
}

/// `reqwest`-backed [`TaskStore`].
#[derive(Debug, Clone)]
pub struct TaskStoreClient {
    base_url: String,
    token: Option<String>,
    client: Client,
}

impl TaskStoreClient {
    pub fn from_env() -> Self {
        Self::from_config(&ClientConfig::from_env())
    }

    pub fn from_config(config: &ClientConfig) -> Self {
        Self::new(config.base_url.clone(), config.token.clone())
    }

    /// Create with explicit configuration. `base_url` includes the `/api` prefix.
    pub fn new(base_url: impl Into<String>, token: Option<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token,
            client: Client::new(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Build a request with the bearer credential attached.
    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        let mut req = self.client.request(method, &url);
        if let Some(ref token) = self.token {
            req = req.bearer_auth(token);
        }
        req
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response, RemoteError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        if status == StatusCode::UNAUTHORIZED {
            return Err(RemoteError::SessionExpired);
        }
        let body = response.text().await.unwrap_or_default();
        Err(RemoteError::Status {
            status: status.as_u16(),
            body,
        })
    }

    async fn handle_response<T: DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, RemoteError> {
        let response = Self::check(response).await?;
        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| RemoteError::Decode(e.to_string()))
    }

    /// Handle a response whose body is irrelevant (204, or a body we ignore).
    async fn handle_empty_response(response: reqwest::Response) -> Result<(), RemoteError> {
        Self::check(response).await.map(|_| ())
    }
}

#[async_trait]
impl TaskStore for TaskStoreClient {
    async fn tasks_for_date(&self, date: NaiveDate) -> Result<Vec<Task>, RemoteError> {
        let response = self
            .request(Method::GET, &format!("/tasks/{}", date.format("%Y-%m-%d")))
            .send()
            .await?;
        Self::handle_response(response).await
    }

    async fn inbox_tasks(&self) -> Result<Vec<Task>, RemoteError> {
        let response = self.request(Method::GET, "/tasks/inbox").send().await?;
        Self::handle_response(response).await
    }

    async fn create_task(&self, input: &CreateTaskInput) -> Result<Task, RemoteError> {
        let response = self
            .request(Method::POST, "/tasks")
            .json(input)
            .send()
            .await?;
        Self::handle_response(response).await
    }

    async fn update_task(&self, id: TaskId, input: &UpdateTaskInput) -> Result<Task, RemoteError> {
        let response = self
            .request(Method::PUT, &format!("/tasks/{}", id))
            .json(input)
            .send()
            .await?;
        Self::handle_response(response).await
    }

    async fn toggle_task(&self, id: TaskId) -> Result<Task, RemoteError> {
        let response = self
            .request(Method::PUT, &format!("/tasks/{}/toggle", id))
            .send()
            .await?;
        Self::handle_response(response).await
    }

    async fn delete_task(&self, id: TaskId) -> Result<(), RemoteError> {
        let response = self
            .request(Method::DELETE, &format!("/tasks/{}", id))
            .send()
            .await?;
        Self::handle_empty_response(response).await
    }

    async fn projects(&self) -> Result<Vec<Project>, RemoteError> {
        let response = self.request(Method::GET, "/projects").send().await?;
        Self::handle_response(response).await
    }

    async fn create_project(&self, input: &CreateProjectInput) -> Result<Project, RemoteError> {
        let response = self
            .request(Method::POST, "/projects")
            .json(input)
            .send()
            .await?;
        Self::handle_response(response).await
    }

    async fn process_brain_dump(&self, request: &BrainDumpRequest) -> Result<(), RemoteError> {
        let response = self
            .request(Method::POST, "/ai/process-braindump")
            .json(request)
            .send()
            .await?;
        Self::handle_empty_response(response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_slash_is_dropped_from_base_url() {
        let client = TaskStoreClient::new("http://localhost:8000/api/", None);
        assert_eq!(client.base_url(), "http://localhost:8000/api");
    }

    #[test]
    fn session_expiry_reports_401() {
        assert_eq!(RemoteError::SessionExpired.status(), Some(401));
        let err = RemoteError::Status {
            status: 500,
            body: "boom".to_string(),
        };
        assert_eq!(err.status(), Some(500));
        assert_eq!(err.to_string(), "server returned 500: boom");
    }
}
