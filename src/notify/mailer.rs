use std::sync::Arc;

use async_trait::async_trait;

use crate::utils::{CircuitBreaker, CircuitBreakerConfig, CircuitBreakerError};

// ============================================================================
// Mailer - Delivery Collaborator
// ============================================================================

#[derive(Debug, Clone)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub html_body: String,
}

/// The external delivery contract: given recipient, subject, and body,
/// deliver a message. The SMTP relay (or whatever sits behind it) lives
/// outside this service.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn deliver(&self, message: &EmailMessage) -> anyhow::Result<()>;
}

/// Stand-in mailer for local runs: logs the message instead of sending.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn deliver(&self, message: &EmailMessage) -> anyhow::Result<()> {
        tracing::info!(
            to = %message.to,
            subject = %message.subject,
            body_len = message.html_body.len(),
            "📧 Would deliver email"
        );
        Ok(())
    }
}

// ============================================================================
// Email Client - Mailer Behind a Circuit Breaker
// ============================================================================

#[derive(Clone)]
pub struct EmailClient {
    mailer: Arc<dyn Mailer>,
    circuit_breaker: CircuitBreaker,
}

impl EmailClient {
    pub fn new(mailer: Arc<dyn Mailer>) -> Self {
        // Open quickly when the relay misbehaves; callers treat delivery
        // as best-effort anyway.
        let config = CircuitBreakerConfig {
            failure_threshold: 5,
            cooldown: std::time::Duration::from_secs(30),
            success_threshold: 3,
        };

        Self {
            mailer,
            circuit_breaker: CircuitBreaker::new(config),
        }
    }

    pub async fn send(&self, message: EmailMessage) -> anyhow::Result<()> {
        let result = self.circuit_breaker.call(self.mailer.deliver(&message)).await;

        match result {
            Ok(()) => {
                tracing::info!(
                    to = %message.to,
                    subject = %message.subject,
                    "Email handed to mailer"
                );
                Ok(())
            }
            Err(CircuitBreakerError::CircuitOpen) => {
                tracing::error!(
                    to = %message.to,
                    "Circuit breaker open - mail collaborator unavailable"
                );
                Err(anyhow::anyhow!("Circuit breaker open for mailer"))
            }
            Err(CircuitBreakerError::OperationFailed(e)) => {
                tracing::error!(
                    error = %e,
                    to = %message.to,
                    "Mailer failed to deliver"
                );
                Err(e)
            }
        }
    }
}

// ============================================================================
// Test Doubles
// ============================================================================

#[cfg(test)]
pub mod doubles {
    use super::*;
    use tokio::sync::mpsc;

    /// Captures every delivered message on a channel for assertions.
    pub struct RecordingMailer {
        tx: mpsc::UnboundedSender<EmailMessage>,
    }

    impl RecordingMailer {
        pub fn channel() -> (Arc<Self>, mpsc::UnboundedReceiver<EmailMessage>) {
            let (tx, rx) = mpsc::unbounded_channel();
            (Arc::new(Self { tx }), rx)
        }
    }

    #[async_trait]
    impl Mailer for RecordingMailer {
        async fn deliver(&self, message: &EmailMessage) -> anyhow::Result<()> {
            let _ = self.tx.send(message.clone());
            Ok(())
        }
    }

    /// Always fails, for proving delivery failures stay internal.
    pub struct FailingMailer;

    #[async_trait]
    impl Mailer for FailingMailer {
        async fn deliver(&self, _message: &EmailMessage) -> anyhow::Result<()> {
            anyhow::bail!("smtp relay unreachable")
        }
    }
}
