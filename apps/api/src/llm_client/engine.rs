//! Invocation Engine: one timeout-bounded call with the active credential.

use std::fmt;
use std::time::Duration;

use tracing::debug;

use super::credentials::CredentialPool;
use super::payload::RequestPayload;
use super::ModelBackend;

/// Failure half of an [`Outcome`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallFailure {
    pub reason: String,
    pub is_timeout: bool,
    /// Pool index of the credential the failed attempt used.
    pub credential_index: usize,
}

impl fmt::Display for CallFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.reason)
    }
}

/// Terminal value of one call: the raw model text, or why it failed.
pub type Outcome = Result<String, CallFailure>;

/// Sends `payload` once using the pool's active credential and races it
/// against `timeout`. When the timer fires first the call future is dropped.
///
/// Reads the pool but never rotates it.
pub async fn invoke(
    backend: &dyn ModelBackend,
    pool: &CredentialPool,
    payload: &RequestPayload,
    timeout: Duration,
) -> Outcome {
    let (credential_index, credential) = pool.active_credential();
    debug!(
        "Invoking model with credential index {credential_index} (timeout {}ms)",
        timeout.as_millis()
    );

    match tokio::time::timeout(timeout, backend.generate(&credential, payload)).await {
        Ok(Ok(text)) => Ok(text),
        Ok(Err(e)) => Err(CallFailure {
            reason: e.to_string(),
            is_timeout: false,
            credential_index,
        }),
        Err(_) => Err(CallFailure {
            reason: format!("Request timed out ({}s limit).", timeout.as_secs_f64()),
            is_timeout: true,
            credential_index,
        }),
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::llm_client::{Credential, LlmError};

    struct Echo;

    #[async_trait]
    impl ModelBackend for Echo {
        async fn generate(
            &self,
            credential: &Credential,
            payload: &RequestPayload,
        ) -> Result<String, LlmError> {
            Ok(format!("{}:{}", credential.expose(), payload.message_text()))
        }
    }

    struct NeverResolves;

    #[async_trait]
    impl ModelBackend for NeverResolves {
        async fn generate(&self, _: &Credential, _: &RequestPayload) -> Result<String, LlmError> {
            std::future::pending().await
        }
    }

    struct Rejects;

    #[async_trait]
    impl ModelBackend for Rejects {
        async fn generate(&self, _: &Credential, _: &RequestPayload) -> Result<String, LlmError> {
            Err(LlmError::Api {
                status: 429,
                message: "Resource has been exhausted".to_string(),
            })
        }
    }

    fn pool() -> CredentialPool {
        CredentialPool::new(vec!["k0", "k1"]).unwrap()
    }

    #[tokio::test]
    async fn test_success_uses_active_credential() {
        let pool = pool();
        pool.rotate();
        let outcome = invoke(
            &Echo,
            &pool,
            &RequestPayload::prompt("hi"),
            Duration::from_secs(5),
        )
        .await;
        assert_eq!(outcome.unwrap(), "k1:hi");
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_yields_timeout_failure() {
        let pool = pool();
        let started = tokio::time::Instant::now();
        let failure = invoke(
            &NeverResolves,
            &pool,
            &RequestPayload::prompt("hi"),
            Duration::from_millis(1),
        )
        .await
        .unwrap_err();

        assert!(failure.is_timeout);
        assert_eq!(failure.credential_index, 0);
        assert!(started.elapsed() < Duration::from_millis(50));
    }

    #[tokio::test]
    async fn test_remote_rejection_is_not_a_timeout() {
        let pool = pool();
        let failure = invoke(
            &Rejects,
            &pool,
            &RequestPayload::prompt("hi"),
            Duration::from_secs(5),
        )
        .await
        .unwrap_err();

        assert!(!failure.is_timeout);
        assert!(failure.reason.contains("429"));
    }

    #[tokio::test]
    async fn test_invoke_does_not_rotate_pool() {
        let pool = pool();
        let _ = invoke(
            &Rejects,
            &pool,
            &RequestPayload::prompt("hi"),
            Duration::from_secs(5),
        )
        .await;
        assert_eq!(pool.active_index(), 0);
    }
}
