// Acheminement des codes 2FA. Les fournisseurs email/SMS restent derrière un relais HTTP.

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use tracing::info;

use crate::models::enums::TwoFactorChannel;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CodeDelivery {
    pub channel: TwoFactorChannel,
    pub to: String,
    pub code: String,
}

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("relay request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("relay answered {0}")]
    Status(u16),
}

#[async_trait]
pub trait CodeSender: Send + Sync {
    async fn send(&self, delivery: &CodeDelivery) -> Result<(), DeliveryError>;
}

/// Écrit le code dans les logs (développement).
pub struct LogSender;

#[async_trait]
impl CodeSender for LogSender {
    async fn send(&self, delivery: &CodeDelivery) -> Result<(), DeliveryError> {
        info!(channel = ?delivery.channel, to = %delivery.to, code = %delivery.code, "2FA code issued");
        Ok(())
    }
}

/// POST JSON `{channel, to, code}` vers CODE_RELAY_URL.
pub struct RelaySender {
    client: reqwest::Client,
    url: String,
}

impl RelaySender {
    pub fn new(url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            url,
        }
    }
}

#[async_trait]
impl CodeSender for RelaySender {
    async fn send(&self, delivery: &CodeDelivery) -> Result<(), DeliveryError> {
        let response = self.client.post(&self.url).json(delivery).send().await?;
        if !response.status().is_success() {
            return Err(DeliveryError::Status(response.status().as_u16()));
        }
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::Mutex;

    /// Garde les codes envoyés en mémoire.
    #[derive(Default)]
    pub struct RecordingSender {
        pub sent: Mutex<Vec<CodeDelivery>>,
    }

    #[async_trait]
    impl CodeSender for RecordingSender {
        async fn send(&self, delivery: &CodeDelivery) -> Result<(), DeliveryError> {
            self.sent.lock().unwrap().push(delivery.clone());
            Ok(())
        }
    }
}
