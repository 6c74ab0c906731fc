//! Client for the remote progress service.
//!
//! `GET  {base}/api/activity/breathing/progress` answers
//! `{"success": true, "progress": {...}}`; `POST` to the same path takes a
//! partial record and sets only the fields it carries.

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::Deserialize;
use tracing::debug;
use url::Url;

use super::ProgressStore;
use crate::error::PersistenceError;
use crate::progress::{ProgressRecord, ProgressUpdate};

const PROGRESS_PATH: &str = "api/activity/breathing/progress";

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    progress: Option<ProgressRecord>,
    #[serde(default)]
    message: Option<String>,
}

pub struct HttpProgressStore {
    endpoint: Url,
    token: Option<String>,
    client: Client,
}

impl HttpProgressStore {
    /// `base_url` is the service root, e.g. `https://api.example.com/`.
    pub fn new(base_url: &str, token: Option<String>) -> Result<Self, PersistenceError> {
        let mut base = Url::parse(base_url)?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        Ok(Self {
            endpoint: base.join(PROGRESS_PATH)?,
            token,
            client: Client::new(),
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn read_envelope(resp: Response) -> Result<Envelope, PersistenceError> {
        let status = resp.status();
        let body = resp.text().await?;
        if !status.is_success() {
            let message = serde_json::from_str::<Envelope>(&body)
                .ok()
                .and_then(|e| e.message)
                .unwrap_or(body);
            return Err(PersistenceError::Service {
                status: status.as_u16(),
                message,
            });
        }

        let envelope: Envelope = serde_json::from_str(&body)?;
        if !envelope.success {
            return Err(PersistenceError::Service {
                status: status.as_u16(),
                message: envelope
                    .message
                    .unwrap_or_else(|| "request was not successful".to_string()),
            });
        }
        Ok(envelope)
    }
}

#[async_trait]
impl ProgressStore for HttpProgressStore {
    async fn get_progress(&self) -> Result<Option<ProgressRecord>, PersistenceError> {
        debug!(url = %self.endpoint, "fetching progress");
        let resp = self
            .authorize(self.client.get(self.endpoint.clone()))
            .send()
            .await?;
        Ok(Self::read_envelope(resp).await?.progress)
    }

    async fn update_progress(&self, update: ProgressUpdate) -> Result<(), PersistenceError> {
        let resp = self
            .authorize(self.client.post(self.endpoint.clone()))
            .json(&update)
            .send()
            .await?;
        Self::read_envelope(resp).await.map(|_| ())
    }
}
