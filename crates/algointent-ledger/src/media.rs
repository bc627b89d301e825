//! Off-chain media storage collaborator.

use algointent_core::Result;
use async_trait::async_trait;

/// Uploads media and returns a locator to embed in asset metadata.
///
/// The locator is used verbatim; reachability is not checked.
#[async_trait]
pub trait MediaStore: Send + Sync {
    async fn upload(&self, file_name: &str, bytes: &[u8]) -> Result<String>;
}
