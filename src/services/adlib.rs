//! Ad-lib line generation boundary: given the dialogue so far and what the
//! user just said, the external service proposes follow-up cues that are
//! appended to the live script.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::script::Cue;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Error)]
pub enum AdlibError {
    #[error("ad-lib request failed: {0}")]
    Failed(String),
}

pub type NextLinesFuture = Pin<Box<dyn Future<Output = Result<Vec<Cue>, AdlibError>> + Send>>;

pub trait LineGenerator: Send + Sync {
    fn next_lines(&self, history: Vec<Cue>, user_text: String) -> NextLinesFuture;
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct NextLinesRequest {
    history: Vec<Cue>,
    user_text: String,
}

#[derive(Deserialize)]
struct NextLinesResponse {
    #[serde(default)]
    lines: Vec<Cue>,
}

#[derive(Clone)]
pub struct AdlibClient {
    client: reqwest::Client,
    endpoint: String,
}

impl AdlibClient {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .build()
                .unwrap_or_default(),
            endpoint: endpoint.into(),
        }
    }
}

impl LineGenerator for AdlibClient {
    fn next_lines(&self, history: Vec<Cue>, user_text: String) -> NextLinesFuture {
        let client = self.client.clone();
        let endpoint = self.endpoint.clone();

        Box::pin(async move {
            let response = client
                .post(&endpoint)
                .json(&NextLinesRequest { history, user_text })
                .send()
                .await
                .map_err(|e| AdlibError::Failed(e.to_string()))?;

            if !response.status().is_success() {
                return Err(AdlibError::Failed(format!("status {}", response.status())));
            }

            let body: NextLinesResponse = response
                .json()
                .await
                .map_err(|e| AdlibError::Failed(e.to_string()))?;
            Ok(body.lines)
        })
    }
}
