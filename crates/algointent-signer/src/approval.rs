//! Human-in-the-loop approval in front of another delegate.

use std::sync::Arc;
use std::time::Duration;

use algointent_core::Result;
use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};
use tracing::{info, warn};

use crate::delegate::{SignRequest, SignResponse, SigningDelegate};

/// A reviewer's decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Approval {
    Approve,
    Reject { reason: String },
}

/// What the reviewer is shown, with a channel for the answer.
#[derive(Debug)]
pub struct ApprovalRequest {
    /// One line per position that needs a signature.
    pub summary: Vec<String>,
    pub respond: oneshot::Sender<Approval>,
}

/// Asks for approval, then defers to `inner` or declines every
/// position that needs a signature.
pub struct ApprovalDelegate {
    inner: Arc<dyn SigningDelegate>,
    requests: mpsc::Sender<ApprovalRequest>,
    timeout: Duration,
}

impl ApprovalDelegate {
    /// Returns the delegate and the receiving end a reviewer listens on.
    pub fn new(
        inner: Arc<dyn SigningDelegate>,
        timeout: Duration,
    ) -> (Self, mpsc::Receiver<ApprovalRequest>) {
        let (requests, receiver) = mpsc::channel(16);
        (
            Self {
                inner,
                requests,
                timeout,
            },
            receiver,
        )
    }

    async fn ask(&self, summary: Vec<String>) -> Approval {
        let (respond, answer) = oneshot::channel();
        if self
            .requests
            .send(ApprovalRequest { summary, respond })
            .await
            .is_err()
        {
            return Approval::Reject {
                reason: "no reviewer is listening".to_string(),
            };
        }

        match tokio::time::timeout(self.timeout, answer).await {
            Ok(Ok(approval)) => approval,
            Ok(Err(_)) => Approval::Reject {
                reason: "reviewer went away".to_string(),
            },
            Err(_) => Approval::Reject {
                reason: format!("no answer within {:?}", self.timeout),
            },
        }
    }
}

#[async_trait]
impl SigningDelegate for ApprovalDelegate {
    async fn sign(&self, requests: &[SignRequest]) -> Result<Vec<SignResponse>> {
        let summary: Vec<String> = requests
            .iter()
            .filter(|r| r.requires_signature)
            .map(|r| format!("#{}: {}", r.position, r.summary))
            .collect();

        match self.ask(summary).await {
            Approval::Approve => {
                info!("Signing approved for {} transactions", requests.len());
                self.inner.sign(requests).await
            }
            Approval::Reject { reason } => {
                warn!("Signing rejected: {}", reason);
                Ok(requests
                    .iter()
                    .map(|r| {
                        if r.requires_signature {
                            SignResponse::declined(reason.clone())
                        } else {
                            SignResponse::NotMine
                        }
                    })
                    .collect())
            }
        }
    }
}
