use crate::core::error::UpstreamError;
use crate::core::market::{CoinListing, Identifier, MarketApi, MarketRecord, SearchResult};
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client, Url};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, instrument};

pub const DEFAULT_BASE_URL: &str = "https://api.coingecko.com/api/v3";
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Upper bound CoinGecko accepts for `per_page` on `/coins/markets`.
const MAX_PER_PAGE: usize = 250;

// CoinGeckoProvider implementation for MarketApi
pub struct CoinGeckoProvider {
    base_url: Url,
    client: Client,
}

impl CoinGeckoProvider {
    pub fn new(base_url: &str, api_key: Option<&str>, timeout: Duration) -> Result<Self> {
        let base_url =
            Url::parse(base_url).with_context(|| format!("Invalid CoinGecko base URL: {base_url}"))?;

        let mut headers = HeaderMap::new();
        if let Some(key) = api_key {
            let mut value = HeaderValue::from_str(key).context("Invalid CoinGecko API key")?;
            value.set_sensitive(true);
            headers.insert("x-cg-demo-api-key", value);
        }

        let client = Client::builder()
            .user_agent(concat!("coinwatch/", env!("CARGO_PKG_VERSION")))
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self { base_url, client })
    }

    fn endpoint_url(&self, endpoint: &str, params: &[(&str, &str)]) -> Url {
        let mut url = self.base_url.clone();
        let path = format!("{}{}", self.base_url.path().trim_end_matches('/'), endpoint);
        url.set_path(&path);
        if !params.is_empty() {
            url.query_pairs_mut().extend_pairs(params);
        }
        url
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: &[(&str, &str)],
    ) -> Result<T, UpstreamError> {
        let url = self.endpoint_url(endpoint, params);
        debug!("Requesting {}", url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|source| UpstreamError::Request {
                endpoint: endpoint.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(UpstreamError::Status {
                endpoint: endpoint.to_string(),
                status: status.as_u16(),
            });
        }

        let text = response
            .text()
            .await
            .map_err(|source| UpstreamError::Request {
                endpoint: endpoint.to_string(),
                source,
            })?;

        serde_json::from_str(&text).map_err(|source| UpstreamError::Decode {
            endpoint: endpoint.to_string(),
            source,
        })
    }
}

#[async_trait]
impl MarketApi for CoinGeckoProvider {
    #[instrument(name = "CoinGeckoCoinList", skip(self))]
    async fn list_identifiers(&self) -> Result<Vec<CoinListing>, UpstreamError> {
        let coins: Vec<CoinListing> = self.get_json("/coins/list", &[]).await?;
        debug!(count = coins.len(), "Received coin list");
        Ok(coins)
    }

    #[instrument(name = "CoinGeckoMarkets", skip(self, ids), fields(count = ids.len()))]
    async fn markets(
        &self,
        vs_currency: &str,
        ids: &[Identifier],
        change_windows: &[String],
    ) -> Result<Vec<MarketRecord>, UpstreamError> {
        let joined_ids = ids.join(",");
        let per_page = ids.len().clamp(1, MAX_PER_PAGE).to_string();
        let windows = change_windows.join(",");

        let mut params = vec![
            ("vs_currency", vs_currency),
            ("ids", joined_ids.as_str()),
            ("per_page", per_page.as_str()),
        ];
        if !windows.is_empty() {
            params.push(("price_change_percentage", windows.as_str()));
        }

        let records: Vec<MarketRecord> = self.get_json("/coins/markets", &params).await?;
        debug!(count = records.len(), "Received market records");
        Ok(records)
    }

    #[instrument(name = "CoinGeckoSearch", skip(self))]
    async fn search(&self, query: &str) -> Result<SearchResult, UpstreamError> {
        self.get_json("/search", &[("query", query)]).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const MARKETS_JSON: &str = r#"[
        {
            "id": "bitcoin",
            "symbol": "btc",
            "name": "Bitcoin",
            "current_price": 65000.5,
            "market_cap": 1280000000000,
            "fully_diluted_valuation": 1365000000000,
            "circulating_supply": 19700000.0,
            "total_supply": 21000000.0,
            "last_updated": "2024-05-01T12:00:00.000Z",
            "price_change_percentage_24h": -1.2,
            "price_change_percentage_24h_in_currency": -1.25,
            "price_change_percentage_7d_in_currency": 4.5
        },
        {
            "id": "ethereum",
            "symbol": "eth",
            "name": "Ethereum",
            "current_price": 3000,
            "market_cap": null,
            "fully_diluted_valuation": null,
            "circulating_supply": 120000000,
            "total_supply": null,
            "last_updated": null
        }
    ]"#;

    fn provider(server: &MockServer) -> CoinGeckoProvider {
        CoinGeckoProvider::new(&server.uri(), None, Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_fetch_markets() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/coins/markets"))
            .and(query_param("vs_currency", "usd"))
            .and(query_param("ids", "bitcoin,ethereum"))
            .and(query_param("price_change_percentage", "24h,7d"))
            .respond_with(ResponseTemplate::new(200).set_body_string(MARKETS_JSON))
            .expect(1)
            .mount(&server)
            .await;

        let ids = vec!["bitcoin".to_string(), "ethereum".to_string()];
        let windows = vec!["24h".to_string(), "7d".to_string()];
        let records = provider(&server)
            .markets("usd", &ids, &windows)
            .await
            .unwrap();

        assert_eq!(records.len(), 2);
        let btc = &records[0];
        assert_eq!(btc.id.as_deref(), Some("bitcoin"));
        assert_eq!(btc.current_price, Some(65000.5));
        assert_eq!(btc.total_supply, Some(21_000_000.0));
        assert_eq!(btc.change_24h(), Some(-1.25));
        assert_eq!(btc.price_change_percentage_7d_in_currency, Some(4.5));
        let eth = &records[1];
        assert!(eth.total_supply.is_none());
        assert!(eth.market_cap.is_none());
    }

    #[tokio::test]
    async fn test_markets_without_change_windows_omits_param() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/coins/markets"))
            .respond_with(ResponseTemplate::new(200).set_body_string("[]"))
            .mount(&server)
            .await;

        let ids = vec!["bitcoin".to_string()];
        provider(&server).markets("eur", &ids, &[]).await.unwrap();

        let requests = server.received_requests().await.unwrap();
        let query = requests[0].url.query().unwrap_or_default().to_string();
        assert!(query.contains("vs_currency=eur"));
        assert!(!query.contains("price_change_percentage"));
    }

    #[tokio::test]
    async fn test_coin_list() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/coins/list"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"[{"id":"bitcoin","symbol":"btc","name":"Bitcoin"},{"symbol":"x","name":"No Id"}]"#,
            ))
            .mount(&server)
            .await;

        let coins = provider(&server).list_identifiers().await.unwrap();
        assert_eq!(coins.len(), 2);
        assert_eq!(coins[0].id.as_deref(), Some("bitcoin"));
        assert!(coins[1].id.is_none());
    }

    #[tokio::test]
    async fn test_search_encodes_query() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .and(query_param("query", "spark & co"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"{"coins":[{"id":"spark-2","name":"Spark","symbol":"FSPARK","market_cap_rank":900}],"exchanges":[]}"#,
            ))
            .mount(&server)
            .await;

        let result = provider(&server).search("spark & co").await.unwrap();
        let coins = result.coins.unwrap();
        assert_eq!(coins[0].id.as_deref(), Some("spark-2"));
        assert_eq!(coins[0].symbol.as_deref(), Some("FSPARK"));
    }

    #[tokio::test]
    async fn test_http_error_is_status_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/coins/list"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let err = provider(&server).list_identifiers().await.unwrap_err();
        assert!(matches!(err, UpstreamError::Status { status: 429, .. }));
    }

    #[tokio::test]
    async fn test_malformed_body_is_decode_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let err = provider(&server).search("btc").await.unwrap_err();
        assert!(matches!(err, UpstreamError::Decode { .. }));
    }

    #[tokio::test]
    async fn test_slow_upstream_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/coins/list"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("[]")
                    .set_delay(Duration::from_millis(500)),
            )
            .mount(&server)
            .await;

        let provider =
            CoinGeckoProvider::new(&server.uri(), None, Duration::from_millis(50)).unwrap();
        let err = provider.list_identifiers().await.unwrap_err();
        assert!(matches!(err, UpstreamError::Request { .. }));
    }

    #[tokio::test]
    async fn test_api_key_header_and_base_path() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v3/coins/list"))
            .and(header("x-cg-demo-api-key", "demo-key"))
            .respond_with(ResponseTemplate::new(200).set_body_string("[]"))
            .expect(1)
            .mount(&server)
            .await;

        let base = format!("{}/api/v3/", server.uri());
        let provider =
            CoinGeckoProvider::new(&base, Some("demo-key"), Duration::from_secs(5)).unwrap();
        assert!(provider.list_identifiers().await.unwrap().is_empty());
    }

    #[test]
    fn test_invalid_base_url_is_rejected() {
        assert!(CoinGeckoProvider::new("not a url", None, Duration::from_secs(1)).is_err());
    }
}
