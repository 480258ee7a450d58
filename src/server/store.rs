//! Persistence collaborator interface.

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::Result;
use crate::types::{Flag, RawEnvironmentFlagConfig};

/// Kind of SDK key presented by a caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SdkKeyType {
    Client,
    Server,
}

impl SdkKeyType {
    /// Key prefix that identifies this key type.
    pub fn prefix(&self) -> &'static str {
        match self {
            SdkKeyType::Client => "cli_",
            SdkKeyType::Server => "srv_",
        }
    }

    /// Infers the key type from its prefix.
    pub fn detect(sdk_key: &str) -> Option<Self> {
        [SdkKeyType::Client, SdkKeyType::Server]
            .into_iter()
            .find(|kind| sdk_key.starts_with(kind.prefix()))
    }
}

/// A flag together with its raw configuration in one environment.
#[derive(Debug, Clone)]
pub struct FlagRecord {
    pub flag: Flag,
    pub config: Option<RawEnvironmentFlagConfig>,
}

/// Read access to stored flags, as needed by the evaluation service.
#[async_trait]
pub trait FlagStore: Send + Sync {
    /// Maps an SDK key to the environment it belongs to.
    async fn resolve_environment(&self, key_type: SdkKeyType, sdk_key: &str)
        -> Result<Option<String>>;

    /// Fetches one non-archived flag.
    async fn get_flag(&self, environment_id: &str, flag_key: &str) -> Result<Option<FlagRecord>>;

    /// Lists every non-archived flag.
    async fn list_flags(&self, environment_id: &str) -> Result<Vec<FlagRecord>>;
}

/// A [`FlagStore`] held entirely in memory.
#[derive(Default)]
pub struct InMemoryFlagStore {
    sdk_keys: RwLock<HashMap<(SdkKeyType, String), String>>,
    flags: RwLock<HashMap<String, Flag>>,
    configs: RwLock<HashMap<(String, String), RawEnvironmentFlagConfig>>,
}

impl InMemoryFlagStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Map `sdk_key` of `key_type` to `environment_id`.
    pub fn add_sdk_key(
        &self,
        key_type: SdkKeyType,
        sdk_key: impl Into<String>,
        environment_id: impl Into<String>,
    ) {
        self.sdk_keys
            .write()
            .insert((key_type, sdk_key.into()), environment_id.into());
    }

    /// Insert or replace a flag definition.
    pub fn upsert_flag(&self, flag: Flag) {
        self.flags.write().insert(flag.key.clone(), flag);
    }

    /// Set the per-environment config for a flag.
    pub fn set_config(
        &self,
        environment_id: impl Into<String>,
        flag_key: impl Into<String>,
        config: RawEnvironmentFlagConfig,
    ) {
        self.configs
            .write()
            .insert((environment_id.into(), flag_key.into()), config);
    }

    /// Remove a per-environment config. Returns whether one existed.
    pub fn remove_config(&self, environment_id: &str, flag_key: &str) -> bool {
        self.configs
            .write()
            .remove(&(environment_id.to_string(), flag_key.to_string()))
            .is_some()
    }

    fn record(&self, environment_id: &str, flag: &Flag) -> FlagRecord {
        let config = self
            .configs
            .read()
            .get(&(environment_id.to_string(), flag.key.clone()))
            .cloned();
        FlagRecord {
            flag: flag.clone(),
            config,
        }
    }
}

#[async_trait]
impl FlagStore for InMemoryFlagStore {
    async fn resolve_environment(
        &self,
        key_type: SdkKeyType,
        sdk_key: &str,
    ) -> Result<Option<String>> {
        Ok(self
            .sdk_keys
            .read()
            .get(&(key_type, sdk_key.to_string()))
            .cloned())
    }

    async fn get_flag(&self, environment_id: &str, flag_key: &str) -> Result<Option<FlagRecord>> {
        let flags = self.flags.read();
        Ok(flags
            .get(flag_key)
            .filter(|flag| !flag.archived)
            .map(|flag| self.record(environment_id, flag)))
    }

    async fn list_flags(&self, environment_id: &str) -> Result<Vec<FlagRecord>> {
        let flags = self.flags.read();
        Ok(flags
            .values()
            .filter(|flag| !flag.archived)
            .map(|flag| self.record(environment_id, flag))
            .collect())
    }
}
