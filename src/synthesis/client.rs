use std::{io::Read as _, time::Duration};

use serde::{Deserialize, Serialize};

use super::retry::{AttemptFailure, RetryPolicy};
use crate::foundation::error::{YukkuriError, YukkuriResult};

/// Phoneme/prosody description returned by `/audio_query`.
///
/// Opaque to this crate: it is handed back to `/synthesis` unmodified.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AudioQuery(serde_json::Value);

impl AudioQuery {
    pub fn as_value(&self) -> &serde_json::Value {
        &self.0
    }
}

/// Blocking client for a VOICEVOX-compatible speech service.
pub struct SynthesisClient {
    agent: ureq::Agent,
    base_url: String,
    policy: RetryPolicy,
}

impl SynthesisClient {
    pub fn with_policy(
        base_url: impl Into<String>,
        policy: RetryPolicy,
        timeout: Duration,
    ) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(timeout).build();
        Self {
            agent,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            policy,
        }
    }

    /// `POST /audio_query?text=..&speaker=..`
    #[tracing::instrument(skip(self, text), fields(chars = text.chars().count()))]
    pub fn audio_query(&self, text: &str, speaker: u32) -> YukkuriResult<AudioQuery> {
        let url = format!("{}/audio_query", self.base_url);
        let speaker = speaker.to_string();
        tracing::debug!(%url, speaker = %speaker, "requesting audio_query");

        self.policy
            .run(|attempt| {
                tracing::trace!(attempt, "audio_query attempt");
                let resp = self
                    .agent
                    .post(&url)
                    .query("text", text)
                    .query("speaker", &speaker)
                    .call()
                    .map_err(attempt_failure)?;
                // Read first so a stalled or cut-off body stays retryable.
                let body = resp
                    .into_string()
                    .map_err(|e| AttemptFailure::Transport(e.to_string()))?;
                serde_json::from_str::<AudioQuery>(&body)
                    .map_err(|e| AttemptFailure::Decode(e.to_string()))
            })
            .map_err(|f| failure_to_error(&url, f))
    }

    /// `POST /synthesis?speaker=..` with the query as JSON body; returns WAV bytes.
    #[tracing::instrument(skip(self, query))]
    pub fn synthesize(&self, query: &AudioQuery, speaker: u32) -> YukkuriResult<Vec<u8>> {
        let url = format!("{}/synthesis", self.base_url);
        let speaker = speaker.to_string();
        tracing::debug!(%url, "requesting synthesis");

        let bytes = self
            .policy
            .run(|attempt| {
                tracing::trace!(attempt, "synthesis attempt");
                let resp = self
                    .agent
                    .post(&url)
                    .query("speaker", &speaker)
                    .set("Content-Type", "application/json")
                    .send_json(query)
                    .map_err(attempt_failure)?;
                let mut bytes = Vec::new();
                resp.into_reader()
                    .read_to_end(&mut bytes)
                    .map_err(|e| AttemptFailure::Transport(e.to_string()))?;
                Ok(bytes)
            })
            .map_err(|f| failure_to_error(&url, f))?;

        if bytes.is_empty() {
            return Err(YukkuriError::synthesis(
                url,
                Some(200),
                "service returned an empty audio body",
            ));
        }
        tracing::debug!(bytes = bytes.len(), "synthesis returned audio");
        Ok(bytes)
    }
}

fn attempt_failure(err: ureq::Error) -> AttemptFailure {
    match err {
        ureq::Error::Status(status, resp) => AttemptFailure::Status {
            status,
            body: resp.into_string().unwrap_or_default().trim().to_string(),
        },
        ureq::Error::Transport(transport) => AttemptFailure::Transport(transport.to_string()),
    }
}

fn failure_to_error(url: &str, failure: AttemptFailure) -> YukkuriError {
    YukkuriError::synthesis(url, failure.status(), failure.message())
}
