//! # Integration Tests
//!
//! Cross-crate tests.
//!
//! - Wire-format checks on the contracts
//! - Config file -> dispatcher end-to-end scenarios

#[cfg(test)]
mod contract_tests {
    use contracts::{DispatchOutcome, DispatchRequest, DispatchStatus};

    #[test]
    fn test_request_accepts_camel_case_wire_names() {
        let request: DispatchRequest = serde_json::from_str(
            r#"{ "requestId": "r1", "to": "user@example.com", "subject": "Hi", "body": "Hello" }"#,
        )
        .unwrap();
        assert_eq!(request.request_id, "r1");
        assert_eq!(request.recipient, "user@example.com");
        assert!(request.ensure_valid().is_ok());
    }

    #[test]
    fn test_outcome_json_shape() {
        let outcome: DispatchOutcome = serde_json::from_value(serde_json::json!({
            "request_id": "r1",
            "status": "RATE_LIMITED",
            "backend_used": null,
            "attempts": 0,
            "message": "Rate limit exceeded",
            "timestamp": "2024-01-01T00:00:00Z"
        }))
        .unwrap();
        assert_eq!(outcome.status, DispatchStatus::RateLimited);

        let value = serde_json::to_value(&outcome).unwrap();
        assert_eq!(value["status"], "RATE_LIMITED");
        assert_eq!(value["attempts"], 0);
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::sync::Arc;
    use std::time::Duration;

    use config_loader::{ConfigFormat, ConfigLoader};
    use contracts::{DispatchRequest, DispatchStatus, REPLAY_MESSAGE};
    use dispatcher::{create_dispatcher, DispatcherBuilder, ManualClock};
    use observability::DispatchStatsAggregator;

    const SCRIPTED_CONFIG: &str = r#"
[rate_limit]
capacity = 3
window_ms = 10000

[retry]
max_retries = 3
base_delay_ms = 500

[[providers]]
name = "primary"
provider_type = "scripted"
params = { script = "fail" }

[[providers]]
name = "fallback"
provider_type = "scripted"
params = { script = "ok" }
"#;

    fn request(id: &str) -> DispatchRequest {
        DispatchRequest::new(id, "user@example.com", "Welcome", "Hello there")
    }

    #[tokio::test]
    async fn test_single_provider_scenario() {
        let config = ConfigLoader::load_from_str(
            r#"
[[providers]]
name = "B1"
provider_type = "log"
"#,
            ConfigFormat::Toml,
        )
        .unwrap();
        let dispatcher = create_dispatcher(&config).unwrap();

        let outcome = dispatcher.dispatch(request("r1")).await.unwrap();
        assert_eq!(outcome.request_id, "r1");
        assert_eq!(outcome.status, DispatchStatus::Sent);
        assert_eq!(outcome.backend_used.as_deref(), Some("B1"));
        assert_eq!(outcome.attempts, 1);

        let replay = dispatcher.dispatch(request("r1")).await.unwrap();
        assert_eq!(replay.message, REPLAY_MESSAGE);
        assert_eq!(dispatcher.backend_metrics()[0].1.attempts, 1);
    }

    #[tokio::test]
    async fn test_config_driven_fallback_and_rate_limit() {
        let config = ConfigLoader::load_from_str(SCRIPTED_CONFIG, ConfigFormat::Toml).unwrap();
        let clock = Arc::new(ManualClock::new());
        let dispatcher = DispatcherBuilder::from_config(&config)
            .unwrap()
            .with_clock(clock.clone())
            .build()
            .unwrap();

        let mut aggregator = DispatchStatsAggregator::new();
        for i in 0..4 {
            let outcome = dispatcher.dispatch(request(&format!("r{i}"))).await.unwrap();
            aggregator.update(&outcome, false, 0.0);
        }

        assert_eq!(aggregator.sent, 3);
        assert_eq!(aggregator.rate_limited, 1);
        assert_eq!(aggregator.backend_counts.get("fallback"), Some(&3));

        let sent = dispatcher.outcome("r0").unwrap();
        assert_eq!(sent.attempts, 4);
        assert_eq!(sent.backend_used.as_deref(), Some("fallback"));
        assert_eq!(dispatcher.outcome("r3").unwrap().attempts, 0);

        // two waits per sequence, all virtual
        assert_eq!(clock.sleeps().len(), 6);
        assert_eq!(clock.elapsed(), Duration::from_millis(4_500));

        let metrics = dispatcher.backend_metrics();
        assert_eq!(metrics[0].0, "primary");
        assert_eq!(metrics[0].1.failures, 9);
        assert_eq!(metrics[1].1.successes, 3);
    }

    #[tokio::test]
    async fn test_config_driven_exhaustion_and_deadline() {
        let content = r#"
[retry]
max_retries = 2
base_delay_ms = 100

[dispatch]
deadline_ms = 150

[[providers]]
name = "A"
provider_type = "scripted"
params = { script = "fail" }

[[providers]]
name = "B"
provider_type = "mock"
params = { success_rate = "0.0" }
"#;
        let config = ConfigLoader::load_from_str(content, ConfigFormat::Toml).unwrap();
        let clock = Arc::new(ManualClock::new());

        let dispatcher = DispatcherBuilder::from_config(&config)
            .unwrap()
            .with_clock(clock.clone())
            .build()
            .unwrap();
        // A: t=0 fail, wait 100, t=100 fail; B: t=100 fail, wait 100, t=200 past deadline
        let outcome = dispatcher.dispatch(request("r1")).await.unwrap();
        assert_eq!(outcome.status, DispatchStatus::TimedOut);
        assert_eq!(outcome.attempts, 3);
        assert_eq!(outcome.backend_used.as_deref(), Some("B"));
        assert_eq!(dispatcher.outcome("r1"), Some(outcome));

        let mut no_deadline = config.clone();
        no_deadline.dispatch.deadline_ms = 0;
        let dispatcher = DispatcherBuilder::from_config(&no_deadline)
            .unwrap()
            .with_clock(Arc::new(ManualClock::new()))
            .build()
            .unwrap();
        let outcome = dispatcher.dispatch(request("r1")).await.unwrap();
        assert_eq!(outcome.status, DispatchStatus::Failed);
        assert_eq!(outcome.attempts, 4);
        assert_eq!(outcome.backend_used.as_deref(), Some("B"));
        assert_eq!(dispatcher.outcome("r1"), Some(outcome));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_mixed_ids() {
        let config = ConfigLoader::load_from_str(
            r#"
[rate_limit]
capacity = 100

[[providers]]
name = "log"
provider_type = "log"
"#,
            ConfigFormat::Toml,
        )
        .unwrap();
        let dispatcher = Arc::new(create_dispatcher(&config).unwrap());

        let tasks: Vec<_> = (0..40)
            .map(|i| {
                let dispatcher = Arc::clone(&dispatcher);
                let id = format!("r{}", i % 10);
                tokio::spawn(async move { dispatcher.dispatch(request(&id)).await })
            })
            .collect();

        let mut replays = 0;
        for task in tasks {
            let outcome = task.await.unwrap().unwrap();
            assert_eq!(outcome.status, DispatchStatus::Sent);
            if outcome.message == REPLAY_MESSAGE {
                replays += 1;
            }
        }

        assert_eq!(replays, 30);
        assert_eq!(dispatcher.backend_metrics()[0].1.attempts, 10);
        assert_eq!(dispatcher.processed_count(), 10);
    }
}
