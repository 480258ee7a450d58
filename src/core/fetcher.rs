use async_trait::async_trait;

use crate::error::Result;
use crate::types::{EvaluationContext, FlagSnapshot};

/// Source of full evaluated-flag snapshots for the client runtime.
///
/// The runtime bounds every call with `RuntimeOptions::timeout`.
#[async_trait]
pub trait SnapshotFetcher: Send + Sync {
    async fn fetch_snapshot(&self, context: &EvaluationContext) -> Result<FlagSnapshot>;
}
