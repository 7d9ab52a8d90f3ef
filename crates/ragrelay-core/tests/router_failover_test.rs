//! Provider router failover, rate limiting and backoff
//!
//! All tests run on a paused clock so timeouts and backoff complete
//! instantly.

mod common;

use common::{chat_provider, Reply, ScriptedTransport};
use ragrelay_core::config::RouterConfig;
use ragrelay_core::error::SERVICE_UNAVAILABLE_MESSAGE;
use ragrelay_core::{
    ChatMessage, GenerationOptions, OrchestratorState, ProviderDescriptor, ProviderRegistry,
    ProviderRouter, ProviderShape, RateLimit, RelayError,
};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

fn router_with(
    providers: Vec<ProviderDescriptor>,
    transport: Arc<ScriptedTransport>,
    config: RouterConfig,
) -> (ProviderRouter, Arc<OrchestratorState>) {
    let registry = ProviderRegistry::new(providers);
    let state = OrchestratorState::for_registry(&registry);
    let router = ProviderRouter::new(&registry, &config, transport, state.clone());
    (router, state)
}

fn four_providers() -> Vec<ProviderDescriptor> {
    (1..=4).map(|i| chat_provider(&format!("p{}", i), i)).collect()
}

fn question() -> Vec<ChatMessage> {
    vec![
        ChatMessage::system("You are helpful"),
        ChatMessage::user("What is the refund policy?"),
    ]
}

#[tokio::test(start_paused = true)]
async fn test_failover_rate_limit_timeout_then_success() {
    let transport = Arc::new(
        ScriptedTransport::new()
            .reply("p1", Reply::rate_limited())
            .reply("p2", Reply::Hang)
            .reply("p3", Reply::chat("ok", 10))
            .reply("p4", Reply::chat("unused", 1)),
    );
    let (router, state) = router_with(four_providers(), transport.clone(), RouterConfig::default());

    let result = router
        .generate_response(&question(), &GenerationOptions::default())
        .await
        .unwrap();

    assert_eq!(result.text, "ok");
    assert_eq!(result.tokens_used, 10);
    assert_eq!(result.provider_name, "p3");
    assert_eq!(result.model_id, "p3-model");

    for name in ["p1", "p2", "p3"] {
        assert_eq!(transport.calls(name), 1, "{} should be called once", name);
        assert_eq!(state.usage.snapshot(name).recorded_calls, 1, "{} usage", name);
    }
    assert_eq!(transport.calls("p4"), 0);
    assert_eq!(state.usage.snapshot("p4").recorded_calls, 0);
    assert_eq!(state.usage.snapshot("p3").recorded_tokens, 10);

    // The rate-limited provider is now saturated, the timed-out one is not
    assert!(!state.usage.is_available("p1"));
    assert!(state.usage.is_available("p2"));

    let metrics = router.metrics();
    assert_eq!(metrics["p1"].rate_limited, 1);
    assert_eq!(metrics["p2"].timeouts, 1);
    assert_eq!(metrics["p3"].successes, 1);
}

#[tokio::test(start_paused = true)]
async fn test_first_k_rate_limited_uses_at_most_k_plus_one_calls() {
    let n = 5;
    for k in 0..n {
        let mut transport = ScriptedTransport::new();
        for i in 1..=n {
            let reply = if i <= k {
                Reply::rate_limited()
            } else {
                Reply::chat(&format!("from p{}", i), 3)
            };
            transport = transport.reply(&format!("p{}", i), reply);
        }
        let transport = Arc::new(transport);
        let providers = (1..=n as u32).map(|i| chat_provider(&format!("p{}", i), i)).collect();
        let (router, _) = router_with(providers, transport.clone(), RouterConfig::default());

        let result = router
            .generate_response(&question(), &GenerationOptions::default())
            .await
            .unwrap();

        assert_eq!(result.provider_name, format!("p{}", k + 1));
        assert!(transport.total_calls() <= k + 1, "k={} calls={}", k, transport.total_calls());
    }
}

#[tokio::test(start_paused = true)]
async fn test_every_failure_kind_moves_to_next_provider() {
    let transport = Arc::new(
        ScriptedTransport::new()
            .reply("p1", Reply::unauthorized())
            .reply("p2", Reply::Raw("<html>bad gateway</html>".to_string()))
            .reply("p3", Reply::Refused)
            .reply("p4", Reply::chat("fine", 0)),
    );
    let (router, _) = router_with(four_providers(), transport.clone(), RouterConfig::default());

    let result = router
        .generate_response(&question(), &GenerationOptions::default())
        .await
        .unwrap();
    assert_eq!(result.provider_name, "p4");
    assert_eq!(transport.total_calls(), 4);
}

#[tokio::test(start_paused = true)]
async fn test_all_providers_failing_is_exhausted() {
    let transport = Arc::new(
        ScriptedTransport::new()
            .reply("p1", Reply::Status(500, "boom".to_string()))
            .reply("p2", Reply::Json(json!({"choices": []}))),
    );
    let providers = vec![chat_provider("p1", 1), chat_provider("p2", 2)];
    let (router, state) = router_with(providers, transport.clone(), RouterConfig::default());

    let err = router
        .generate_response(&question(), &GenerationOptions::default())
        .await
        .unwrap_err();

    assert!(matches!(err, RelayError::AllProvidersExhausted { attempts: 2 }));
    assert_eq!(err.user_message(), SERVICE_UNAVAILABLE_MESSAGE);
    assert_eq!(state.usage.snapshot("p1").recorded_calls, 1);
    assert_eq!(state.usage.snapshot("p2").recorded_calls, 1);
}

#[tokio::test(start_paused = true)]
async fn test_saturated_provider_is_skipped_without_a_call() {
    let transport = Arc::new(
        ScriptedTransport::new()
            .reply("p1", Reply::chat("p1", 1))
            .reply("p2", Reply::chat("p2", 1)),
    );
    let providers = vec![
        chat_provider("p1", 1).with_rate_limit(RateLimit::per_minute(1)),
        chat_provider("p2", 2),
    ];
    let (router, state) = router_with(providers, transport.clone(), RouterConfig::default());
    state.usage.record_usage("p1", 0);

    let result = router
        .generate_response(&question(), &GenerationOptions::default())
        .await
        .unwrap();
    assert_eq!(result.provider_name, "p2");
    assert_eq!(transport.calls("p1"), 0);
}

#[tokio::test(start_paused = true)]
async fn test_token_budget_makes_provider_unavailable() {
    let transport = Arc::new(
        ScriptedTransport::new()
            .reply("p1", Reply::chat("big", 500))
            .reply("p2", Reply::chat("p2", 1)),
    );
    let limited = RateLimit {
        requests_per_minute: 100,
        tokens_per_minute: Some(500),
        tokens_per_day: None,
    };
    let providers = vec![chat_provider("p1", 1).with_rate_limit(limited), chat_provider("p2", 2)];
    let config = RouterConfig {
        priority_override: vec!["p1".to_string()],
        ..RouterConfig::default()
    };
    let (router, state) = router_with(providers, transport.clone(), config);

    let first = router
        .generate_response(&question(), &GenerationOptions::default())
        .await
        .unwrap();
    assert_eq!(first.provider_name, "p1");
    assert!(!state.usage.is_available("p1"));

    tokio::time::advance(Duration::from_secs(61)).await;
    assert!(state.usage.is_available("p1"));
}

#[tokio::test(start_paused = true)]
async fn test_all_saturated_waits_backoff_then_gives_up() {
    let transport = Arc::new(ScriptedTransport::new().reply("p1", Reply::chat("p1", 1)));
    let providers = vec![chat_provider("p1", 1).with_rate_limit(RateLimit::per_minute(1))];
    let config = RouterConfig {
        backoff_ms: 2_000,
        ..RouterConfig::default()
    };
    let (router, state) = router_with(providers, transport.clone(), config);
    state.usage.record_usage("p1", 0);

    let started = tokio::time::Instant::now();
    let err = router
        .generate_response(&question(), &GenerationOptions::default())
        .await
        .unwrap_err();

    assert!(matches!(err, RelayError::NoProviderAvailable));
    assert!(started.elapsed() >= Duration::from_secs(2));
    assert_eq!(transport.total_calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_second_pass_after_backoff_reaches_recovered_provider() {
    let transport = Arc::new(
        ScriptedTransport::new()
            .reply("p1", Reply::chat("recovered", 4))
            .reply("p2", Reply::rate_limited()),
    );
    let providers = vec![
        chat_provider("p1", 1).with_rate_limit(RateLimit::per_minute(1)),
        chat_provider("p2", 2),
    ];
    let config = RouterConfig {
        backoff_ms: 61_000,
        ..RouterConfig::default()
    };
    let (router, state) = router_with(providers, transport.clone(), config);
    state.usage.record_usage("p1", 0);

    let result = router
        .generate_response(&question(), &GenerationOptions::default())
        .await
        .unwrap();

    assert_eq!(result.provider_name, "p1");
    // p2 failed in the first pass and is not retried
    assert_eq!(transport.calls("p2"), 1);
    assert_eq!(transport.calls("p1"), 1);
}

#[tokio::test(start_paused = true)]
async fn test_cursor_rotates_across_requests() {
    let transport = Arc::new(
        ScriptedTransport::new()
            .reply("p1", Reply::chat("one", 1))
            .reply("p2", Reply::chat("two", 1))
            .reply("p3", Reply::chat("three", 1)),
    );
    let providers = vec![chat_provider("p1", 1), chat_provider("p2", 2), chat_provider("p3", 3)];
    let (router, _) = router_with(providers, transport, RouterConfig::default());

    let mut served = Vec::new();
    for _ in 0..4 {
        let result = router
            .generate_response(&question(), &GenerationOptions::default())
            .await
            .unwrap();
        served.push(result.provider_name);
    }
    assert_eq!(served, vec!["p1", "p2", "p3", "p1"]);
}

#[tokio::test(start_paused = true)]
async fn test_alternate_shape_is_normalized() {
    let transport = Arc::new(ScriptedTransport::new().reply(
        "gemini",
        Reply::Json(json!({
            "candidates": [{"content": {"parts": [{"text": "Hello "}, {"text": "there"}]}}],
            "usageMetadata": {"totalTokenCount": 7}
        })),
    ));
    let provider = ProviderDescriptor::new(
        "gemini",
        "https://gemini.test/v1beta/",
        ProviderShape::Alternate,
        "gemini-flash",
    )
    .with_credential("key");
    let (router, _) = router_with(vec![provider], transport.clone(), RouterConfig::default());

    let options = GenerationOptions {
        temperature: Some(0.2),
        max_tokens: Some(64),
        top_p: None,
    };
    let result = router.generate_response(&question(), &options).await.unwrap();
    assert_eq!(result.text, "Hello there");
    assert_eq!(result.tokens_used, 7);

    let requests = transport.requests();
    let (_, request) = &requests[0];
    assert_eq!(
        request.url,
        "https://gemini.test/v1beta/models/gemini-flash:generateContent"
    );
    assert_eq!(request.body["generationConfig"]["maxOutputTokens"], 64);
    assert_eq!(
        request.body["systemInstruction"]["parts"][0]["text"],
        "You are helpful"
    );
}

#[tokio::test]
async fn test_no_providers() {
    let (router, _) = router_with(
        Vec::new(),
        Arc::new(ScriptedTransport::new()),
        RouterConfig::default(),
    );
    let err = router
        .generate_response(&question(), &GenerationOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, RelayError::NoProviderAvailable));
}

#[tokio::test(start_paused = true)]
async fn test_rate_limited_unbounded_provider_is_skipped_afterwards() {
    let transport = Arc::new(
        ScriptedTransport::new()
            .reply("p1", Reply::rate_limited())
            .reply("p2", Reply::chat("p2", 1)),
    );
    let providers = vec![
        chat_provider("p1", 1).with_rate_limit(RateLimit::per_minute(0)),
        chat_provider("p2", 2),
    ];
    let (router, state) = router_with(providers, transport.clone(), RouterConfig::default());

    for _ in 0..3 {
        let result = router
            .generate_response(&question(), &GenerationOptions::default())
            .await
            .unwrap();
        assert_eq!(result.provider_name, "p2");
    }
    assert!(!state.usage.is_available("p1"));
    assert_eq!(transport.calls("p1"), 1);

    tokio::time::advance(Duration::from_secs(61)).await;
    assert!(state.usage.is_available("p1"));
}
