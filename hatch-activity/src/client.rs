//! The control-plane touch call.

use async_trait::async_trait;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Control plane answered {0}")]
    Status(u16),
}

/// Idempotent "workspace was used" call toward the control plane.
#[async_trait]
pub trait ActivityClient: Send + Sync {
    async fn touch(&self, workspace_id: &str) -> Result<(), NotifyError>;
}

/// `PUT <api-endpoint>/activity/<workspace-id>` with an empty body.
pub struct HttpActivityClient {
    client: reqwest::Client,
    api_endpoint: String,
}

impl HttpActivityClient {
    pub fn new(client: reqwest::Client, api_endpoint: impl Into<String>) -> Self {
        Self {
            client,
            api_endpoint: api_endpoint.into(),
        }
    }
}

#[async_trait]
impl ActivityClient for HttpActivityClient {
    async fn touch(&self, workspace_id: &str) -> Result<(), NotifyError> {
        let url = format!(
            "{}/activity/{}",
            self.api_endpoint.trim_end_matches('/'),
            workspace_id
        );
        let response = self.client.put(&url).send().await?;
        if !response.status().is_success() {
            return Err(NotifyError::Status(response.status().as_u16()));
        }
        Ok(())
    }
}
