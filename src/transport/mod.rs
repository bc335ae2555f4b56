mod mailgun;
pub use mailgun::*;

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A fully rendered message, ready for dispatch.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct OutgoingEmail {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
    pub subject: String,
    pub text: String,
    pub html: String,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub headers: HashMap<String, String>,
}

/// Delivery mechanism behind the mailer. Implementations get the composed
/// message and report an opaque success or failure. Nothing is retried.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, email: &OutgoingEmail) -> Result<(), anyhow::Error>;
}

/// Transport that accepts every message without delivering it.
#[derive(Clone, Debug, Default)]
pub struct NoopTransport;

#[async_trait]
impl Transport for NoopTransport {
    async fn send(&self, _email: &OutgoingEmail) -> Result<(), anyhow::Error> {
        Ok(())
    }
}
