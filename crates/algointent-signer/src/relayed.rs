//! Delegate that replays responses collected out of band.
//!
//! Used when an external wallet signs the unsigned bytes and the caller
//! posts the results back.

use algointent_core::{IntentError, Result};
use async_trait::async_trait;

use crate::delegate::{SignRequest, SignResponse, SigningDelegate};

pub struct RelayedDelegate {
    responses: Vec<SignResponse>,
}

impl RelayedDelegate {
    pub fn new(responses: Vec<SignResponse>) -> Self {
        Self { responses }
    }
}

#[async_trait]
impl SigningDelegate for RelayedDelegate {
    async fn sign(&self, requests: &[SignRequest]) -> Result<Vec<SignResponse>> {
        if self.responses.len() != requests.len() {
            return Err(IntentError::SigningFailed(format!(
                "expected {} responses, received {}",
                requests.len(),
                self.responses.len()
            )));
        }
        Ok(self.responses.clone())
    }
}
