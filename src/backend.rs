use anyhow::Result;
use async_trait::async_trait;

use crate::models::{HosSnapshot, StatusChangeRequest};

/// The REST collaborator. Transport, auth and timeouts live behind this
/// trait; the engine only looks at success or failure.
#[async_trait]
pub trait HosBackend: Send + Sync {
    async fn fetch_snapshot(&self) -> Result<HosSnapshot>;

    async fn submit_status_change(&self, request: &StatusChangeRequest) -> Result<()>;
}
