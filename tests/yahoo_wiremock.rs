use anyhow::Result;
use carteira::market_data::{QuoteSource, RateService, YahooChartSource};
use std::sync::Arc;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn chart_body(close: f64) -> String {
    format!(
        r#"{{
            "chart": {{
                "result": [{{
                    "meta": {{"regularMarketPrice": {close}}},
                    "indicators": {{"quote": [{{"close": [{close}]}}]}}
                }}],
                "error": null
            }}
        }}"#
    )
}

#[tokio::test]
async fn yahoo_returns_most_recent_close() -> Result<()> {
    let server = MockServer::start().await;
    let source = YahooChartSource::new().with_base_url(server.uri());

    Mock::given(method("GET"))
        .and(path("/v8/finance/chart/PETR4.SA"))
        .and(query_param("range", "1d"))
        .and(query_param("interval", "1d"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(chart_body(30.05), "application/json"))
        .mount(&server)
        .await;

    let close = source.fetch_close("PETR4.SA").await?;
    assert_eq!(close, Some(30.05));

    Ok(())
}

#[tokio::test]
async fn yahoo_unknown_symbol_is_no_data() -> Result<()> {
    let server = MockServer::start().await;
    let source = YahooChartSource::new().with_base_url(server.uri());

    Mock::given(method("GET"))
        .and(path("/v8/finance/chart/NOPE"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let close = source.fetch_close("NOPE").await?;
    assert_eq!(close, None);

    Ok(())
}

#[tokio::test]
async fn yahoo_server_error_is_a_source_error() {
    let server = MockServer::start().await;
    let source = YahooChartSource::new().with_base_url(server.uri());

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let result = source.fetch_close("PETR4.SA").await;
    assert!(result.is_err());
}

#[tokio::test]
async fn rate_service_falls_back_to_second_symbol() -> Result<()> {
    let server = MockServer::start().await;
    let quotes = Arc::new(YahooChartSource::new().with_base_url(server.uri()));

    let empty = r#"{"chart": {"result": null, "error": {"code": "Not Found"}}}"#;

    Mock::given(method("GET"))
        .and(path("/v8/finance/chart/BRL=X"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(empty, "application/json"))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v8/finance/chart/USDBRL=X"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(chart_body(5.43), "application/json"),
        )
        .mount(&server)
        .await;

    let rate = RateService::new(quotes).usd_brl_rate().await?;
    assert_eq!(rate, 5.43);

    Ok(())
}
