//! Server-side evaluation entry points.
//!
//! [`EvaluationService`] resolves an SDK key to an environment through a
//! [`FlagStore`], loads each flag's configuration and runs the
//! [`FlagEvaluator`]. Every evaluation is handed to the analytics queue
//! without waiting on it.

mod analytics;
mod store;

pub use analytics::{
    AnalyticsConfig, AnalyticsConfigBuilder, AnalyticsQueue, AnalyticsSink, EvaluationEvent,
    DEFAULT_BATCH_SIZE, DEFAULT_FLUSH_INTERVAL, DEFAULT_MAX_QUEUE_SIZE,
};
pub use store::{FlagRecord, FlagStore, InMemoryFlagStore, SdkKeyType};

use async_trait::async_trait;
use std::sync::Arc;

use crate::core::SnapshotFetcher;
use crate::engine::{ConfigLoader, FlagEvaluator};
use crate::error::{ErrorCode, FlagwiseError, Result};
use crate::types::{EvaluationContext, FlagEvaluationResult, FlagSnapshot};

/// Evaluates flags for SDK keys against a [`FlagStore`].
pub struct EvaluationService {
    store: Arc<dyn FlagStore>,
    evaluator: FlagEvaluator,
    loader: ConfigLoader,
    analytics: Option<Arc<AnalyticsQueue>>,
}

impl EvaluationService {
    /// Create a service without analytics.
    pub fn new(store: Arc<dyn FlagStore>) -> Self {
        Self {
            store,
            evaluator: FlagEvaluator::new(),
            loader: ConfigLoader::new(),
            analytics: None,
        }
    }

    /// Record every evaluation to `analytics`.
    pub fn with_analytics(mut self, analytics: Arc<AnalyticsQueue>) -> Self {
        self.analytics = Some(analytics);
        self
    }

    /// Evaluates one flag. `Ok(None)` when the environment has no such flag.
    pub async fn evaluate(
        &self,
        key_type: SdkKeyType,
        sdk_key: &str,
        flag_key: &str,
        context: &EvaluationContext,
    ) -> Result<Option<FlagEvaluationResult>> {
        let environment_id = self.resolve_environment(key_type, sdk_key).await?;

        let Some(record) = self.store.get_flag(&environment_id, flag_key).await? else {
            tracing::debug!(flag_key, environment_id = %environment_id, "Flag not found");
            return Ok(None);
        };

        Ok(Some(self.evaluate_record(&environment_id, record, context)))
    }

    /// Evaluates every active flag of the key's environment.
    pub async fn snapshot(
        &self,
        key_type: SdkKeyType,
        sdk_key: &str,
        context: &EvaluationContext,
    ) -> Result<FlagSnapshot> {
        let environment_id = self.resolve_environment(key_type, sdk_key).await?;
        let records = self.store.list_flags(&environment_id).await?;

        Ok(records
            .into_iter()
            .map(|record| {
                let result = self.evaluate_record(&environment_id, record, context);
                (result.flag_key.clone(), result)
            })
            .collect())
    }

    async fn resolve_environment(&self, key_type: SdkKeyType, sdk_key: &str) -> Result<String> {
        self.store
            .resolve_environment(key_type, sdk_key)
            .await?
            .ok_or_else(|| FlagwiseError::new(ErrorCode::AuthInvalidKey, "Unknown SDK key"))
    }

    fn evaluate_record(
        &self,
        environment_id: &str,
        record: FlagRecord,
        context: &EvaluationContext,
    ) -> FlagEvaluationResult {
        let config = record.config.map(|raw| self.loader.load(raw));
        let result = self
            .evaluator
            .evaluate_flag(&record.flag, config.as_ref(), context);

        if let Some(analytics) = &self.analytics {
            analytics.record(EvaluationEvent::from_result(
                environment_id,
                &result,
                context.user_id.clone(),
            ));
        }

        result
    }
}

/// Feeds a client runtime from an in-process [`EvaluationService`].
pub struct ServiceSnapshotFetcher {
    service: Arc<EvaluationService>,
    key_type: SdkKeyType,
    sdk_key: String,
}

impl ServiceSnapshotFetcher {
    /// Create a fetcher that evaluates through `service` as `sdk_key`.
    pub fn new(
        service: Arc<EvaluationService>,
        key_type: SdkKeyType,
        sdk_key: impl Into<String>,
    ) -> Self {
        Self {
            service,
            key_type,
            sdk_key: sdk_key.into(),
        }
    }
}

#[async_trait]
impl SnapshotFetcher for ServiceSnapshotFetcher {
    async fn fetch_snapshot(&self, context: &EvaluationContext) -> Result<FlagSnapshot> {
        self.service
            .snapshot(self.key_type, &self.sdk_key, context)
            .await
    }
}
