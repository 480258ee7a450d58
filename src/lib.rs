//! Flagwise
//!
//! Feature-flag evaluation for Rust: a pure, deterministic evaluator for
//! targeting rules and percentage rollouts, a server-side evaluation
//! service, and a client runtime that caches an evaluated snapshot and keeps
//! it fresh by polling or push.
//!
//! # Quick Start
//!
//! ```no_run
//! use flagwise::{EvaluationContext, FlagClient, RuntimeOptions};
//!
//! #[tokio::main]
//! async fn main() -> flagwise::Result<()> {
//!     let options = RuntimeOptions::builder("cli_your_key")
//!         .base_url("https://flags.example.com/api")
//!         .context(EvaluationContext::with_user_id("user-123"))
//!         .build();
//!
//!     let client = FlagClient::new(options)?;
//!     let _updates = client.on_update(|flags| println!("{} flags changed", flags.len()));
//!     client.initialize().await?;
//!
//!     let dark_mode = client.get_boolean_flag("dark-mode", false)?;
//!     let theme = client.get_string_flag("theme", "light")?;
//!     println!("dark_mode={dark_mode} theme={theme}");
//!
//!     client.close();
//!     Ok(())
//! }
//! ```
//!
//! Evaluating directly, without a runtime:
//!
//! ```
//! use flagwise::{
//!     Condition, EnvironmentFlagConfig, EvaluationContext, Flag, FlagEvaluator, Operator,
//!     TargetingRule,
//! };
//!
//! let flag = Flag::boolean("beta");
//! let config = EnvironmentFlagConfig::new(true).with_rule(
//!     TargetingRule::new("staff", "true")
//!         .with_condition(Condition::new("email", Operator::EndsWith, "@example.com")),
//! );
//! let context = EvaluationContext::with_user_id("u1").attribute("email", "ana@example.com");
//!
//! let result = FlagEvaluator::new().evaluate_flag(&flag, Some(&config), &context);
//! assert_eq!(result.reason.to_string(), "TARGETING_RULE:staff");
//! assert_eq!(result.bool_value(), Some(true));
//! ```

pub mod types;
pub mod error;
pub mod engine;
pub mod server;
pub mod core;
pub mod http;
mod client;

pub use types::{
    Condition, ConditionLogic, EnvironmentFlagConfig, EvaluationContext,
    EvaluationContextBuilder, EvaluationReason, Flag, FlagEvaluationResult, FlagSnapshot,
    FlagType, FlagValue, Operator, RawEnvironmentFlagConfig, TargetingRule, Variation,
};

pub use error::{ErrorCode, FlagwiseError, Result};

pub use engine::{ConditionEvaluator, ConfigLoader, FlagEvaluator, RolloutBucketer, RuleEvaluator};

pub use server::{
    AnalyticsConfig, AnalyticsQueue, AnalyticsSink, EvaluationEvent, EvaluationService,
    FlagRecord, FlagStore, InMemoryFlagStore, SdkKeyType, ServiceSnapshotFetcher,
};

pub use crate::core::{
    EventChannel, PushMessage, PushStream, PushTransport, RuntimeOptions,
    RuntimeOptionsBuilder, SnapshotFetcher, StreamingState, Subscription,
};

pub use http::{HttpClient, SseTransport, FLAGS_PATH, STREAM_PATH};

pub use client::{FlagClient, FlagClientBuilder, RuntimeState};
