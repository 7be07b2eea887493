use std::future::Future;
use std::time::Duration;

use cloudlog_core::error::{CloudlogError, Result};
use cloudlog_core::ProviderError;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Cancellation and deadline scope for provider calls made on behalf of one request.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl RequestContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            token: CancellationToken::new(),
            deadline: Some(Instant::now() + timeout),
        }
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Fails fast if the context is already cancelled or past its deadline.
    pub fn check(&self, op: &str) -> Result<()> {
        if self.token.is_cancelled() {
            return Err(CloudlogError::Cancelled(op.to_string()));
        }
        if self.deadline.is_some_and(|d| Instant::now() >= d) {
            return Err(CloudlogError::DeadlineExceeded(op.to_string()));
        }
        Ok(())
    }

    /// Runs a provider call, racing it against cancellation and the deadline.
    /// Provider failures are wrapped with `op`.
    pub async fn run<T, F>(&self, op: &str, call: F) -> Result<T>
    where
        F: Future<Output = std::result::Result<T, ProviderError>>,
    {
        self.check(op)?;

        let deadline = async {
            match self.deadline {
                Some(d) => tokio::time::sleep_until(d).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            biased;
            _ = self.token.cancelled() => Err(CloudlogError::Cancelled(op.to_string())),
            _ = deadline => Err(CloudlogError::DeadlineExceeded(op.to_string())),
            res = call => res.map_err(|source| CloudlogError::provider(op, source)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn passes_through_success() {
        let ctx = RequestContext::new();
        let out = ctx.run("listing projects", async { Ok(7) }).await.unwrap();
        assert_eq!(out, 7);
    }

    #[tokio::test]
    async fn wraps_provider_errors() {
        let ctx = RequestContext::new();
        let err = ctx
            .run::<(), _>("listing projects", async {
                Err(ProviderError::Transport("connection reset".into()))
            })
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "listing projects: transport failure: connection reset"
        );
    }

    #[tokio::test]
    async fn cancelled_context_skips_the_call() {
        let ctx = RequestContext::new();
        ctx.cancel();
        let err = ctx
            .run("listing logs", async { Ok::<_, ProviderError>(1) })
            .await
            .unwrap_err();
        assert!(matches!(err, CloudlogError::Cancelled(_)));
    }

    #[tokio::test]
    async fn cancellation_interrupts_a_pending_call() {
        let ctx = RequestContext::new();
        let token = ctx.token().clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            token.cancel();
        });
        let err = ctx
            .run("listing logs", std::future::pending::<std::result::Result<(), ProviderError>>())
            .await
            .unwrap_err();
        assert!(matches!(err, CloudlogError::Cancelled(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_interrupts_a_pending_call() {
        let ctx = RequestContext::with_timeout(Duration::from_secs(5));
        let err = ctx
            .run("listing logs", std::future::pending::<std::result::Result<(), ProviderError>>())
            .await
            .unwrap_err();
        assert!(matches!(err, CloudlogError::DeadlineExceeded(_)));
    }
}
