//! End-to-end tests for the cache-aside read path.

mod common;

use chrono::{NaiveDate, Utc};
use rust_decimal_macros::dec;

use common::{new_cache, service, settings, with_cost, with_rate_limit, MockProvider};
use quotehub_market_data::settings::ProviderCostSettings;
use quotehub_market_data::{
    ErrorKind, InMemoryCache, Interval, MarketDataError, MarketDataService, Quote, StrategyKind,
};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

#[tokio::test]
async fn cache_hit_does_not_contact_provider() {
    let yahoo = MockProvider::new("YAHOO");
    let svc = service(&settings(StrategyKind::Primary, "YAHOO", None), &[&yahoo], new_cache());

    let first = svc.get_quote("AAPL").await.unwrap();
    let second = svc.get_quote("aapl").await.unwrap();

    assert_eq!(first, second);
    assert_eq!(yahoo.call_count(), 1);
    assert_eq!(svc.metrics().get_total_requests("YAHOO"), 1);
}

#[tokio::test]
async fn miss_writes_primary_and_stale_entries() {
    let yahoo = MockProvider::new("YAHOO");
    let cache = new_cache();
    let svc = service(
        &settings(StrategyKind::Primary, "YAHOO", None),
        &[&yahoo],
        cache.clone(),
    );

    svc.get_quote("AAPL").await.unwrap();

    assert!(cache.get_raw("quote:AAPL").await.is_some());
    assert!(cache.get_raw("stale:quote:AAPL").await.is_some());
}

#[tokio::test]
async fn fundamentals_are_served_from_cache_after_first_fetch() {
    let yahoo = MockProvider::new("YAHOO");
    let cache = new_cache();
    let svc = service(
        &settings(StrategyKind::Primary, "YAHOO", None),
        &[&yahoo],
        cache.clone(),
    );

    let first = svc.get_fundamentals("aapl").await.unwrap();
    let second = svc.get_fundamentals("AAPL").await.unwrap();

    assert_eq!(first, second);
    assert_eq!(first.symbol, "AAPL");
    assert_eq!(first.market_cap, Some(dec!(2950000000000)));
    assert_eq!(yahoo.call_count(), 1);
    assert!(cache.get_raw("fundamentals:AAPL").await.is_some());
    assert!(cache.get_raw("stale:fundamentals:AAPL").await.is_some());
}

#[tokio::test]
async fn unsupported_operation_does_not_mark_provider_unhealthy() {
    let yahoo = MockProvider::new("YAHOO");
    yahoo.without_fundamentals();
    let svc = service(&settings(StrategyKind::Primary, "YAHOO", None), &[&yahoo], new_cache());

    for _ in 0..5 {
        let err = svc.get_fundamentals("AAPL").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotSupported);
    }

    let health = svc.health_monitor().get_health_status("YAHOO").unwrap();
    assert!(health.is_healthy);
    assert_eq!(health.consecutive_failures, 0);
    assert_eq!(svc.metrics().get_failed_requests("YAHOO"), 5);

    assert_eq!(svc.get_quote("AAPL").await.unwrap().source, "YAHOO");
}

#[tokio::test]
async fn historical_prices_are_cached_under_normalized_key() {
    let yahoo = MockProvider::new("YAHOO");
    let cache = new_cache();
    let svc = service(
        &settings(StrategyKind::Primary, "YAHOO", None),
        &[&yahoo],
        cache.clone(),
    );

    let start = date(2024, 1, 10);
    let end = date(2024, 1, 15);
    let bars = svc
        .get_historical_prices("aapl", start, end, Interval::Daily)
        .await
        .unwrap();
    svc.get_historical_prices("AAPL", start, end, Interval::Daily)
        .await
        .unwrap();

    assert_eq!(bars.len(), 1);
    assert_eq!(yahoo.call_count(), 1);
    assert!(cache
        .get_raw("historical:AAPL:2024-01-10:2024-01-15:Daily")
        .await
        .is_some());
}

#[tokio::test]
async fn search_is_cached_per_lowercased_query() {
    let yahoo = MockProvider::new("YAHOO");
    let svc = service(&settings(StrategyKind::Primary, "YAHOO", None), &[&yahoo], new_cache());

    let results = svc.search_symbols("Apple", 5).await.unwrap();
    svc.search_symbols(" apple ", 5).await.unwrap();

    assert_eq!(results.len(), 1);
    assert_eq!(yahoo.call_count(), 1);
}

#[tokio::test]
async fn failure_with_stale_entry_returns_stale_value() {
    let yahoo = MockProvider::failing("YAHOO");
    let cache = new_cache();
    let stale = Quote::new("AAPL", Utc::now(), dec!(95.25), "USD", "YAHOO");
    cache.set("stale:quote:AAPL", &stale, None).await;

    let svc = service(
        &settings(StrategyKind::Primary, "YAHOO", None),
        &[&yahoo],
        cache,
    );

    let quote = svc.get_quote("AAPL").await.unwrap();

    assert_eq!(quote, stale);
    assert_eq!(yahoo.call_count(), 1);
    assert_eq!(svc.degraded_responses(), 1);
    assert_eq!(svc.metrics().get_failed_requests("YAHOO"), 1);
}

#[tokio::test]
async fn failure_without_stale_entry_propagates_original_error() {
    let yahoo = MockProvider::failing("YAHOO");
    let svc = service(&settings(StrategyKind::Primary, "YAHOO", None), &[&yahoo], new_cache());

    let err = svc.get_quote("AAPL").await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::ProviderUnavailable);
    assert_eq!(svc.degraded_responses(), 0);
}

#[tokio::test]
async fn symbol_not_found_keeps_its_kind() {
    let yahoo = MockProvider::new("YAHOO");
    let svc = service(&settings(StrategyKind::Primary, "YAHOO", None), &[&yahoo], new_cache());

    let err = svc.get_quote("INVALID").await.unwrap_err();

    assert!(matches!(err, MarketDataError::SymbolNotFound { .. }));
}

#[tokio::test]
async fn failed_primary_is_retried_once_on_fallback() {
    let yahoo = MockProvider::failing("YAHOO");
    let alpha = MockProvider::new("ALPHA_VANTAGE");
    let svc = service(
        &settings(StrategyKind::Primary, "YAHOO", Some("ALPHA_VANTAGE")),
        &[&yahoo, &alpha],
        new_cache(),
    );

    let quote = svc.get_quote("AAPL").await.unwrap();

    assert_eq!(quote.source, "ALPHA_VANTAGE");
    assert_eq!(yahoo.call_count(), 1);
    assert_eq!(alpha.call_count(), 1);
    assert_eq!(svc.metrics().get_failed_requests("YAHOO"), 1);
    assert_eq!(svc.metrics().get_successful_requests("ALPHA_VANTAGE"), 1);
}

#[tokio::test]
async fn total_failure_propagates_primary_error() {
    let yahoo = MockProvider::failing("YAHOO");
    let alpha = MockProvider::failing("ALPHA_VANTAGE");
    let svc = service(
        &settings(StrategyKind::Primary, "YAHOO", Some("ALPHA_VANTAGE")),
        &[&yahoo, &alpha],
        new_cache(),
    );

    let err = svc.get_quote("AAPL").await.unwrap_err();

    assert_eq!(err.provider(), Some("YAHOO"));
    assert_eq!(yahoo.call_count(), 1);
    assert_eq!(alpha.call_count(), 1);
}

#[tokio::test]
async fn fallback_strategy_routes_around_unhealthy_primary() {
    let yahoo = MockProvider::new("YAHOO");
    let alpha = MockProvider::new("ALPHA_VANTAGE");
    let svc = service(
        &settings(StrategyKind::Fallback, "YAHOO", Some("ALPHA_VANTAGE")),
        &[&yahoo, &alpha],
        new_cache(),
    );

    for _ in 0..3 {
        svc.health_monitor().record_failure("YAHOO");
    }
    let quote = svc.get_quote("MSFT").await.unwrap();

    assert_eq!(quote.source, "ALPHA_VANTAGE");
    assert_eq!(yahoo.call_count(), 0);
}

#[tokio::test]
async fn fallback_is_not_retried_when_it_was_the_selected_provider() {
    let yahoo = MockProvider::new("YAHOO");
    let alpha = MockProvider::failing("ALPHA_VANTAGE");
    let svc = service(
        &settings(StrategyKind::Fallback, "YAHOO", Some("ALPHA_VANTAGE")),
        &[&yahoo, &alpha],
        new_cache(),
    );

    for _ in 0..3 {
        svc.health_monitor().record_failure("YAHOO");
    }
    let err = svc.get_quote("MSFT").await.unwrap_err();

    assert_eq!(err.provider(), Some("ALPHA_VANTAGE"));
    assert_eq!(alpha.call_count(), 1);
    assert_eq!(yahoo.call_count(), 0);
}

#[tokio::test]
async fn local_rate_limit_rejection_falls_back_without_health_penalty() {
    let yahoo = MockProvider::new("YAHOO");
    let alpha = MockProvider::new("ALPHA_VANTAGE");
    let config = with_rate_limit(
        settings(StrategyKind::Primary, "YAHOO", Some("ALPHA_VANTAGE")),
        "YAHOO",
        1,
        10,
    );
    let svc = service(&config, &[&yahoo, &alpha], new_cache());

    assert_eq!(svc.get_quote("AAPL").await.unwrap().source, "YAHOO");
    assert_eq!(svc.get_quote("MSFT").await.unwrap().source, "ALPHA_VANTAGE");

    assert_eq!(yahoo.call_count(), 1);
    let health = svc.health_monitor().get_health_status("YAHOO").unwrap();
    assert!(health.is_healthy);
    assert_eq!(health.consecutive_failures, 0);
    assert_eq!(svc.metrics().get_failed_requests("YAHOO"), 0);
}

#[tokio::test]
async fn enforced_cost_threshold_diverts_cost_optimized_selection() {
    let yahoo = MockProvider::new("YAHOO");
    let alpha = MockProvider::new("ALPHA_VANTAGE");
    let config = settings(StrategyKind::CostOptimized, "YAHOO", None);
    let config = with_cost(
        config,
        "YAHOO",
        ProviderCostSettings {
            cost_per_call: dec!(1),
            cost_threshold: Some(dec!(1)),
            enforce_threshold: true,
            ..Default::default()
        },
    );
    let config = with_cost(
        config,
        "ALPHA_VANTAGE",
        ProviderCostSettings {
            cost_per_call: dec!(2),
            ..Default::default()
        },
    );
    let svc = service(&config, &[&yahoo, &alpha], new_cache());

    svc.get_quote("AAPL").await.unwrap();
    svc.get_quote("MSFT").await.unwrap();
    let third = svc.get_quote("TSLA").await.unwrap();

    assert_eq!(yahoo.call_count(), 2);
    assert_eq!(third.source, "ALPHA_VANTAGE");
    assert!(svc.cost_tracker().is_cost_threshold_exceeded("YAHOO"));
}

#[tokio::test]
async fn every_provider_invocation_is_cost_tracked() {
    let yahoo = MockProvider::new("YAHOO");
    let config = with_cost(
        settings(StrategyKind::Primary, "YAHOO", None),
        "YAHOO",
        ProviderCostSettings {
            cost_per_call: dec!(0.01),
            ..Default::default()
        },
    );
    let svc = service(&config, &[&yahoo], new_cache());

    for symbol in ["AAPL", "MSFT", "AAPL", "TSLA"] {
        svc.get_quote(symbol).await.unwrap();
    }

    let metrics = svc.cost_tracker().get_cost_metrics("YAHOO");
    assert_eq!(metrics.total_api_calls, 3);
    assert_eq!(metrics.estimated_cost, dec!(0.03));
}

#[tokio::test]
async fn warm_cache_counts_failures_per_symbol() {
    let yahoo = MockProvider::new("YAHOO");
    let svc = service(&settings(StrategyKind::Primary, "YAHOO", None), &[&yahoo], new_cache());

    let report = svc.warm_cache(&["AAPL", "MSFT"]).await;
    assert_eq!(report.succeeded, 2);
    assert!(report.is_complete());

    // Quotes and profiles are now cached.
    svc.get_quote("AAPL").await.unwrap();
    svc.get_company_profile("MSFT").await.unwrap();
    assert_eq!(yahoo.call_count(), 4);

    yahoo.set_failing(true);
    let report = svc.warm_cache(&["TSLA", "NVDA"]).await;
    assert_eq!(report.succeeded, 0);
    assert_eq!(report.failures.len(), 4);
    assert!(report.failures.iter().any(|(symbol, _)| symbol == "TSLA"));
}

#[tokio::test]
async fn provider_status_reports_configured_facets() {
    let yahoo = MockProvider::new("YAHOO");
    let alpha = MockProvider::new("ALPHA_VANTAGE");
    let config = with_rate_limit(
        settings(StrategyKind::Primary, "YAHOO", Some("ALPHA_VANTAGE")),
        "ALPHA_VANTAGE",
        5,
        25,
    );
    let svc = service(&config, &[&yahoo, &alpha], new_cache());
    svc.get_quote("AAPL").await.unwrap();

    let report = svc.provider_status();
    assert_eq!(report.len(), 2);

    let yahoo_status = report.iter().find(|r| r.provider == "YAHOO").unwrap();
    assert_eq!(yahoo_status.metrics.successful_requests, 1);
    assert_eq!(yahoo_status.success_rate, 1.0);
    assert!(yahoo_status.rate_limit.is_none());
    assert!(yahoo_status.cost.is_none());

    let alpha_status = report.iter().find(|r| r.provider == "ALPHA_VANTAGE").unwrap();
    let limits = alpha_status.rate_limit.as_ref().unwrap();
    assert_eq!(limits.minute_limit, 5);
    assert_eq!(limits.day_limit, 25);
}

#[tokio::test]
async fn construction_fails_fast_on_bad_configuration() {
    let yahoo = MockProvider::new("YAHOO");
    let duplicate = MockProvider::new("YAHOO");

    let result = MarketDataService::from_settings(
        &settings(StrategyKind::Primary, "YAHOO", None),
        common::providers(&[&yahoo, &duplicate]),
        new_cache(),
    );
    assert!(matches!(result, Err(MarketDataError::Configuration(_))));

    let result = MarketDataService::from_settings(
        &settings(StrategyKind::Primary, "POLYGON", None),
        common::providers(&[&yahoo]),
        new_cache(),
    );
    assert!(matches!(result, Err(MarketDataError::Configuration(_))));

    let mut config = settings(StrategyKind::Primary, "YAHOO", None);
    config.cache.quote.stale_secs = 0;
    let result = MarketDataService::from_settings(
        &config,
        common::providers(&[&yahoo]),
        std::sync::Arc::new(InMemoryCache::default()),
    );
    assert!(matches!(result, Err(MarketDataError::Configuration(_))));
}
