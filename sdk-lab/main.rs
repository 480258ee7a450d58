//! Flagwise lab
//!
//! End-to-end check of the evaluation service and client runtime, wired
//! together in-process. Run with: cargo run --example sdk-lab

use async_trait::async_trait;
use flagwise::{
    AnalyticsConfig, AnalyticsQueue, AnalyticsSink, EvaluationContext, EvaluationEvent,
    EvaluationService, Flag, FlagClient, FlagType, InMemoryFlagStore, RawEnvironmentFlagConfig,
    RuntimeOptions, SdkKeyType, ServiceSnapshotFetcher,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

const PASS: &str = "\x1b[32m[PASS]\x1b[0m";
const FAIL: &str = "\x1b[31m[FAIL]\x1b[0m";

const LAB_KEY: &str = "cli_lab_key";

/// Logs each analytics batch instead of shipping it anywhere.
#[derive(Default)]
struct CountingSink {
    recorded: AtomicUsize,
}

#[async_trait]
impl AnalyticsSink for CountingSink {
    async fn record_batch(&self, events: Vec<EvaluationEvent>) -> flagwise::Result<()> {
        tracing::info!(events = events.len(), "Analytics batch");
        self.recorded.fetch_add(events.len(), Ordering::SeqCst);
        Ok(())
    }
}

fn lab_store() -> Arc<InMemoryFlagStore> {
    let store = Arc::new(InMemoryFlagStore::new());
    store.add_sdk_key(SdkKeyType::Client, LAB_KEY, "lab");

    store.upsert_flag(Flag::boolean("lab-bool"));
    store.upsert_flag(
        Flag::new("lab-string", FlagType::String)
            .with_variation("plain", "Hello")
            .with_variation("fancy", "Hello Lab"),
    );
    store.upsert_flag(Flag::new("lab-number", FlagType::Number).with_variation("answer", "42"));
    store.upsert_flag(
        Flag::new("lab-json", FlagType::Json)
            .with_variation("config", r#"{"nested": true, "count": 100}"#),
    );

    let configs = [
        ("lab-bool", serde_json::json!({"enabled": true, "defaultVariationKey": "true"})),
        (
            "lab-string",
            serde_json::json!({
                "enabled": true,
                "defaultVariationKey": "plain",
                "targetingRules": [{
                    "id": "lab-users",
                    "conditions": [{"attribute": "team", "operator": "equals", "value": "lab"}],
                    "variationKey": "fancy"
                }]
            }),
        ),
        ("lab-number", serde_json::json!({"enabled": true})),
        ("lab-json", serde_json::json!({"enabled": true})),
    ];
    for (key, raw) in configs {
        match serde_json::from_value::<RawEnvironmentFlagConfig>(raw) {
            Ok(config) => store.set_config("lab", key, config),
            Err(e) => tracing::error!(flag = key, error = %e, "Bad lab config"),
        }
    }

    store
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("flagwise=debug")),
        )
        .init();

    println!("=== Flagwise Lab ===\n");

    let mut passed = 0;
    let mut failed = 0;

    macro_rules! check {
        ($test:expr, $ok:expr) => {{
            if $ok {
                println!("{} {}", PASS, $test);
                passed += 1;
            } else {
                println!("{} {}", FAIL, $test);
                failed += 1;
            }
        }};
    }

    let sink = Arc::new(CountingSink::default());
    let analytics = Arc::new(AnalyticsQueue::start(AnalyticsConfig::default(), sink.clone()));
    let service =
        Arc::new(EvaluationService::new(lab_store()).with_analytics(Arc::clone(&analytics)));

    println!("Testing initialization...");
    let options = RuntimeOptions::builder(LAB_KEY)
        .polling_interval(Duration::from_secs(1))
        .context(EvaluationContext::with_user_id("lab-user").attribute("team", "lab"))
        .build();
    let client = match FlagClient::builder(options)
        .fetcher(Arc::new(ServiceSnapshotFetcher::new(
            Arc::clone(&service),
            SdkKeyType::Client,
            LAB_KEY,
        )))
        .build()
    {
        Ok(client) => client,
        Err(e) => {
            println!("{} Client build - {}", FAIL, e);
            std::process::exit(1);
        }
    };

    let updates = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&updates);
    let _updates = client.on_update(move |_| {
        seen.fetch_add(1, Ordering::SeqCst);
    });

    check!("Initialization", client.initialize().await.is_ok());

    println!("\nTesting flag evaluation...");
    check!(
        "Boolean flag",
        matches!(client.get_boolean_flag("lab-bool", false), Ok(true))
    );
    check!(
        "String flag (targeted)",
        client.get_string_flag("lab-string", "").ok().as_deref() == Some("Hello Lab")
    );
    check!(
        "Number flag",
        matches!(client.get_number_flag("lab-number", 0.0), Ok(n) if n == 42.0)
    );
    let json = client.get_json_flag("lab-json", serde_json::json!({}));
    check!(
        "JSON flag",
        json.ok().and_then(|v| v.get("count").cloned()) == Some(serde_json::json!(100))
    );
    check!(
        "Missing flag falls back",
        matches!(client.get_boolean_flag("lab-missing", true), Ok(true))
    );

    println!("\nTesting context updates...");
    let outsider = EvaluationContext::with_user_id("visitor").attribute("team", "sales");
    check!(
        "Re-evaluate on context change",
        client.update_context(outsider, true).await.is_ok()
            && client.get_string_flag("lab-string", "").ok().as_deref() == Some("Hello")
    );

    println!("\nTesting polling...");
    tokio::time::sleep(Duration::from_millis(2500)).await;
    // Identical snapshots never notify; only the context change did.
    check!("Unchanged polls stay quiet", updates.load(Ordering::SeqCst) == 1);

    println!("\nTesting shutdown...");
    client.close();
    check!("Getters rejected after close", client.get_boolean_flag("lab-bool", false).is_err());

    analytics.shutdown().await;
    check!("Evaluations recorded", sink.recorded.load(Ordering::SeqCst) > 0);

    print_summary(passed, failed);
    if failed > 0 {
        std::process::exit(1);
    }
}

fn print_summary(passed: usize, failed: usize) {
    println!("\n{}", "=".repeat(40));
    println!("Results: {} passed, {} failed", passed, failed);
    println!("{}", "=".repeat(40));
}
