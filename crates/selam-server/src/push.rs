//! Outbound push delivery.
//!
//! [`FcmDispatcher`] talks to Firebase Cloud Messaging over the HTTP v1 API.
//! The v1 API has no multicast endpoint, so a batch is fanned out as one
//! request per token with bounded concurrency and the outcomes are summed.
//! [`DryRunDispatcher`] is used when FCM is not configured.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use futures::future::{BoxFuture, FutureExt};
use futures::stream::{self, StreamExt};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use selam_shared::constants::MAX_TOKENS_PER_BATCH;

use crate::config::FcmConfig;

/// Request timeout for a single FCM send.
const FCM_TIMEOUT: Duration = Duration::from_secs(10);

/// A notification addressed to many devices at once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PushMessage {
    pub title: String,
    pub body: String,
    /// String-only key/value payload delivered to the app.
    pub data: BTreeMap<String, String>,
}

/// Per-batch delivery counts as reported by the gateway.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub success_count: usize,
    pub failure_count: usize,
}

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("Batch of {size} tokens exceeds the limit of {max}")]
    BatchTooLarge { size: usize, max: usize },

    #[error("Push gateway unreachable: {0}")]
    Unreachable(String),
}

/// Sends one message to a batch of device tokens.
#[async_trait]
pub trait PushDispatcher: Send + Sync {
    async fn send_multicast(
        &self,
        message: &PushMessage,
        tokens: &[String],
    ) -> Result<BatchReport, DispatchError>;
}

fn check_batch_size(tokens: &[String]) -> Result<(), DispatchError> {
    if tokens.len() > MAX_TOKENS_PER_BATCH {
        return Err(DispatchError::BatchTooLarge {
            size: tokens.len(),
            max: MAX_TOKENS_PER_BATCH,
        });
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Dry run
// ---------------------------------------------------------------------------

/// Logs the batch and reports every token as delivered.
#[derive(Debug, Default, Clone)]
pub struct DryRunDispatcher;

#[async_trait]
impl PushDispatcher for DryRunDispatcher {
    async fn send_multicast(
        &self,
        message: &PushMessage,
        tokens: &[String],
    ) -> Result<BatchReport, DispatchError> {
        check_batch_size(tokens)?;
        info!(
            tokens = tokens.len(),
            title = %message.title,
            body = %message.body,
            "Dry run: push batch not sent"
        );
        Ok(BatchReport {
            success_count: tokens.len(),
            failure_count: 0,
        })
    }
}

// ---------------------------------------------------------------------------
// Firebase Cloud Messaging (HTTP v1)
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct FcmRequest<'a> {
    message: FcmMessage<'a>,
}

#[derive(Debug, Serialize)]
struct FcmMessage<'a> {
    token: &'a str,
    notification: FcmNotification<'a>,
    data: &'a BTreeMap<String, String>,
}

#[derive(Debug, Serialize)]
struct FcmNotification<'a> {
    title: &'a str,
    body: &'a str,
}

enum SendOutcome {
    Delivered,
    Rejected,
    Unreachable(String),
}

pub struct FcmDispatcher {
    client: reqwest::Client,
    send_url: String,
    access_token: String,
    concurrency: usize,
}

impl FcmDispatcher {
    pub fn new(config: &FcmConfig) -> Result<Self, DispatchError> {
        let client = reqwest::Client::builder()
            .timeout(FCM_TIMEOUT)
            .build()
            .map_err(|e| DispatchError::Unreachable(format!("HTTP client: {e}")))?;

        Ok(Self {
            client,
            send_url: format!(
                "{}/v1/projects/{}/messages:send",
                config.endpoint, config.project_id
            ),
            access_token: config.access_token.clone(),
            concurrency: config.concurrency.max(1),
        })
    }

    async fn send_one(&self, message: &PushMessage, token: &str) -> SendOutcome {
        let request = build_request(message, token);

        let response = match self
            .client
            .post(&self.send_url)
            .bearer_auth(&self.access_token)
            .json(&request)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => return SendOutcome::Unreachable(e.to_string()),
        };

        let status = response.status();
        if status.is_success() {
            return SendOutcome::Delivered;
        }

        let detail = response.text().await.unwrap_or_default();
        debug!(status = %status, detail = %detail, "FCM rejected token");
        SendOutcome::Rejected
    }
}

fn build_request<'a>(message: &'a PushMessage, token: &'a str) -> FcmRequest<'a> {
    FcmRequest {
        message: FcmMessage {
            token,
            notification: FcmNotification {
                title: &message.title,
                body: &message.body,
            },
            data: &message.data,
        },
    }
}

#[async_trait]
impl PushDispatcher for FcmDispatcher {
    async fn send_multicast(
        &self,
        message: &PushMessage,
        tokens: &[String],
    ) -> Result<BatchReport, DispatchError> {
        check_batch_size(tokens)?;
        if tokens.is_empty() {
            return Ok(BatchReport::default());
        }

        let sends: Vec<BoxFuture<'_, SendOutcome>> = tokens
            .iter()
            .map(|token| self.send_one(message, token).boxed())
            .collect();

        let outcomes: Vec<SendOutcome> = stream::iter(sends)
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        let mut report = BatchReport::default();
        let mut unreachable = 0usize;
        let mut last_transport_error = None;

        for outcome in outcomes {
            match outcome {
                SendOutcome::Delivered => report.success_count += 1,
                SendOutcome::Rejected => report.failure_count += 1,
                SendOutcome::Unreachable(e) => {
                    report.failure_count += 1;
                    unreachable += 1;
                    last_transport_error = Some(e);
                }
            }
        }

        if unreachable == tokens.len() {
            return Err(DispatchError::Unreachable(
                last_transport_error.unwrap_or_default(),
            ));
        }
        if unreachable > 0 {
            warn!(unreachable, total = tokens.len(), "Some FCM sends failed in transport");
        }

        Ok(report)
    }
}
