use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use super::api::{ResultPayload, StatsApi};
use super::result::SessionResult;
use crate::round::RoundState;

/// Computes the session result once and submits it at most once.
pub struct SessionReporter {
    api: Option<Arc<dyn StatsApi>>,
    cached: Option<SessionResult>,
    submitted: bool,
}

impl SessionReporter {
    /// A reporter that never submits.
    pub fn new() -> Self {
        Self {
            api: None,
            cached: None,
            submitted: false,
        }
    }

    pub fn with_api(api: Arc<dyn StatsApi>) -> Self {
        Self {
            api: Some(api),
            ..Self::new()
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn result(&self) -> Option<&SessionResult> {
        self.cached.as_ref()
    }

    pub fn is_submitted(&self) -> bool {
        self.submitted
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Compute the result of `state`. Later calls return the first
    /// result unchanged, whatever the state looks like by then.
    pub fn finalize(&mut self, state: &RoundState) -> SessionResult {
        self.cached
            .get_or_insert_with(|| SessionResult::from_state(state))
            .clone()
    }

    /// Submit `result` in the background. Returns the task handle when a
    /// submission was spawned.
    ///
    /// Failures are logged and never retried. Only the first call per
    /// session does anything.
    pub fn submit(&mut self, result: &SessionResult) -> Option<JoinHandle<()>> {
        if self.submitted {
            tracing::debug!(session = %result.session_id, "result already submitted");
            return None;
        }
        self.submitted = true;

        let Some(api) = self.api.clone() else {
            tracing::debug!(session = %result.session_id, "no stats API configured, skipping submission");
            return None;
        };
        let Ok(runtime) = Handle::try_current() else {
            tracing::warn!(session = %result.session_id, "no async runtime, result not submitted");
            return None;
        };

        let payload = ResultPayload::from(result);
        let session = result.session_id;
        Some(runtime.spawn(async move {
            match api.submit_result(payload).await {
                Ok(()) => tracing::info!(%session, "session result submitted"),
                Err(e) => tracing::warn!(%session, error = %e, "session result submission failed"),
            }
        }))
    }
}

impl Default for SessionReporter {
    fn default() -> Self {
        Self::new()
    }
}
