//! Stats/XP API client.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use url::Url;

use super::result::SessionResult;
use crate::error::ReportError;
use crate::storage::StatsApiConfig;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Body of one result submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultPayload {
    pub game_id: String,
    pub correct: u32,
    pub total: u32,
    /// Whole percent.
    pub accuracy: u32,
    pub xp_awarded: u32,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skill_tags: Vec<String>,
}

impl From<&SessionResult> for ResultPayload {
    fn from(result: &SessionResult) -> Self {
        Self {
            game_id: result.game_id.clone(),
            correct: result.successes,
            total: result.total_rounds,
            accuracy: result.accuracy_percent(),
            xp_awarded: result.xp_awarded,
            timestamp: result.finished_at,
            skill_tags: result.skill_tags.clone(),
        }
    }
}

/// Backend that accepts finished session results.
///
/// The returned future must not borrow `self`; it is spawned onto the
/// runtime and may outlive the engine.
pub trait StatsApi: Send + Sync {
    fn submit_result(&self, payload: ResultPayload) -> BoxFuture<'static, Result<(), ReportError>>;
}

/// `StatsApi` over HTTP: `POST <base_url>/results` with a JSON body.
#[derive(Debug, Clone)]
pub struct HttpStatsApi {
    client: Client,
    endpoint: Url,
    auth_token: Option<String>,
}

impl HttpStatsApi {
    pub fn new(
        base_url: &str,
        auth_token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, ReportError> {
        let mut base = Url::parse(base_url)?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let endpoint = base.join("results")?;
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            endpoint,
            auth_token,
        })
    }

    /// Build a client from the `[stats_api]` section, `None` when disabled.
    pub fn from_config(config: &StatsApiConfig) -> Result<Option<Self>, ReportError> {
        if !config.enabled {
            return Ok(None);
        }
        let token = (!config.auth_token.is_empty()).then(|| config.auth_token.clone());
        Self::new(
            &config.base_url,
            token,
            Duration::from_secs(config.timeout_secs),
        )
        .map(Some)
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

impl StatsApi for HttpStatsApi {
    fn submit_result(&self, payload: ResultPayload) -> BoxFuture<'static, Result<(), ReportError>> {
        let client = self.client.clone();
        let endpoint = self.endpoint.clone();
        let token = self.auth_token.clone();

        Box::pin(async move {
            let mut request = client.post(endpoint).json(&payload);
            if let Some(token) = token {
                request = request.bearer_auth(token);
            }

            let response = request.send().await?;
            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(ReportError::Status {
                    status: status.as_u16(),
                    body,
                });
            }
            Ok(())
        })
    }
}
