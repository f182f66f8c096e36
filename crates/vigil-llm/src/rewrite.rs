//! External communication rewriter.
//!
//! Rewrite-only semantics: the deterministic drafts are always produced
//! first; the endpoint may only improve their clarity. Fact preservation is
//! checked by the communication stage, which keeps the drafts whenever the
//! rewrite drops a red flag or a section header.

use std::time::Instant;

use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::client::{ChatClient, ChatMessage};
use crate::config::BackendConfig;
use crate::errors::BackendError;
use crate::harden::sanitize_untrusted;
use crate::json_extract::extract_first_json_object;

/// Version stamp recorded on every communication output.
pub const COMMUNICATION_PROMPT_VERSION: &str = "2026-06.v2";

const SYSTEM_PROMPT: &str = "You are a clinical documentation assistant. \
Rewrite the following for clarity. Do not add new clinical facts, vitals, \
medications, diagnoses, or red flags. Preserve section headers. \
Return JSON with keys `clinician_handoff` and `patient_summary`.";

/// A validated rewrite response.
#[derive(Clone, Debug, PartialEq)]
pub struct ExternalRewrite {
    pub clinician_handoff: String,
    pub patient_summary: String,
    pub model: String,
}

/// Chat-endpoint rewriter for the communication stage.
pub struct ExternalRewriter {
    config: BackendConfig,
    client: ChatClient,
}

impl ExternalRewriter {
    #[must_use]
    pub fn new(config: BackendConfig, client: ChatClient) -> Self {
        Self { config, client }
    }

    /// Rewrite the two drafts. `phi_hits` comes from the structured intake;
    /// the guard applies exactly as for reasoning.
    pub async fn rewrite(
        &self,
        clinician_draft: &str,
        patient_draft: &str,
        phi_hits: &[String],
        deadline: Instant,
        cancel: &CancellationToken,
    ) -> Result<ExternalRewrite, BackendError> {
        if self.config.phi_guard && !phi_hits.is_empty() {
            debug!(hits = phi_hits.len(), "phi guard blocked external rewrite");
            return Err(BackendError::PhiGuard);
        }

        let user = format!(
            "Rewrite these two drafts for clarity. Keep all facts and section headers.\n\n\
Draft clinician_handoff:\n{}\n\n\
Draft patient_summary:\n{}\n\n\
Return ONLY the requested JSON object.",
            sanitize_untrusted(clinician_draft),
            sanitize_untrusted(patient_draft),
        );
        let messages = [ChatMessage::system(SYSTEM_PROMPT), ChatMessage::user(user)];

        let content = self
            .client
            .complete(&self.config, &messages, deadline, cancel)
            .await?;
        let payload = extract_first_json_object(&content)?;

        let clinician_handoff = non_empty_string(payload.get("clinician_handoff"))
            .ok_or_else(|| invalid("clinician_handoff must be a non-empty string"))?;
        let patient_summary = non_empty_string(payload.get("patient_summary"))
            .ok_or_else(|| invalid("patient_summary must be a non-empty string"))?;

        Ok(ExternalRewrite {
            clinician_handoff,
            patient_summary,
            model: self.config.model.clone(),
        })
    }
}

fn non_empty_string(value: Option<&serde_json::Value>) -> Option<String> {
    let s = value?.as_str()?.trim();
    if s.is_empty() {
        None
    } else {
        Some(s.to_string())
    }
}

fn invalid(message: &str) -> BackendError {
    BackendError::InvalidJson {
        message: message.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::circuit::CircuitRegistry;
    use crate::config::{BackendKind, CircuitConfig};
    use std::sync::Arc;
    use std::time::Duration;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn rewriter_for(server: &MockServer) -> ExternalRewriter {
        let client = ChatClient::new(
            reqwest::Client::new(),
            Arc::new(CircuitRegistry::new(CircuitConfig::default())),
        );
        ExternalRewriter::new(
            BackendConfig {
                kind: BackendKind::External,
                base_url: server.uri(),
                model: "rw-model".into(),
                max_retries: 0,
                ..BackendConfig::default()
            },
            client,
        )
    }

    fn deadline() -> Instant {
        Instant::now() + Duration::from_secs(10)
    }

    fn ok_body(content: &str) -> serde_json::Value {
        serde_json::json!({"choices": [{"message": {"content": content}}]})
    }

    #[tokio::test]
    async fn returns_both_rewritten_artifacts() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(ok_body(
                r#"{"clinician_handoff": "Situation: improved wording", "patient_summary": "Plain words."}"#,
            )))
            .mount(&server)
            .await;

        let result = rewriter_for(&server)
            .rewrite("Situation: x", "y", &[], deadline(), &CancellationToken::new())
            .await
            .unwrap();
        assert!(result.clinician_handoff.contains("Situation"));
        assert_eq!(result.model, "rw-model");
    }

    #[tokio::test]
    async fn missing_key_is_invalid_json() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(ok_body(
                r#"{"clinician_handoff": "only one key"}"#,
            )))
            .mount(&server)
            .await;

        let err = rewriter_for(&server)
            .rewrite("a", "b", &[], deadline(), &CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(err.wire_label(), "invalid_json");
    }

    #[tokio::test]
    async fn phi_guard_blocks_rewrite() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(ok_body("{}")))
            .expect(0)
            .mount(&server)
            .await;

        let err = rewriter_for(&server)
            .rewrite(
                "a",
                "b",
                &["history:ssn".to_string()],
                deadline(),
                &CancellationToken::new(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::PhiGuard));
    }
}
