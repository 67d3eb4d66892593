//! Elasticsearch implementation of `SearchClient`.
//!
//! Talks to one Elasticsearch deployment over HTTP. Request and response
//! shapes that vary between releases are delegated to the `ServiceProfile`
//! selected when the client is built.

pub mod request;
pub mod response;

use std::time::Duration;

use reqwest::{Client, RequestBuilder};
use search_client::{
    profile_for, IndexStats, MultiGetEntry, RandomPage, ScrollPage, ScrollStrategy, SearchClient,
    ServiceProfile, ServiceVersion, SourceDocument, TransportError,
};
use serde_json::Value;

/// Connection options for an Elasticsearch client.
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Per-request timeout.
    pub timeout: Duration,
    /// How long the service keeps a scroll context alive between pages.
    pub scroll_keep_alive: String,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(60),
            scroll_keep_alive: "5m".to_string(),
        }
    }
}

/// HTTP client for one Elasticsearch deployment.
#[derive(Debug)]
pub struct ElasticsearchClient {
    http: Client,
    host: String,
    profile: Box<dyn ServiceProfile>,
    scroll_keep_alive: String,
}

impl ElasticsearchClient {
    /// Create a client for `host` using the profile of `version`.
    pub fn new(
        host: &str,
        version: ServiceVersion,
        options: ClientOptions,
    ) -> Result<Self, TransportError> {
        let http = Client::builder()
            .timeout(options.timeout)
            .build()
            .map_err(|e| TransportError::Request {
                url: host.to_string(),
                message: e.to_string(),
            })?;

        tracing::debug!("Created search client for {} (profile {})", host, version);

        Ok(Self {
            http,
            host: host.trim_end_matches('/').to_string(),
            profile: profile_for(version),
            scroll_keep_alive: options.scroll_keep_alive,
        })
    }

    /// Base URL of the deployment.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Profile in use for this deployment.
    pub fn profile(&self) -> &dyn ServiceProfile {
        self.profile.as_ref()
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.host, path.trim_start_matches('/'))
    }

    /// Send a request and decode a JSON response, mapping failures to
    /// `TransportError`.
    async fn send(&self, request: RequestBuilder, url: &str) -> Result<Value, TransportError> {
        let response = request.send().await.map_err(|e| TransportError::Request {
            url: url.to_string(),
            message: e.to_string(),
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TransportError::Status {
                url: url.to_string(),
                status: status.as_u16(),
                body,
            });
        }

        response.json::<Value>().await.map_err(|e| TransportError::Decode {
            url: url.to_string(),
            message: e.to_string(),
        })
    }

    async fn continue_scroll(&self, scroll_id: &str) -> Result<Value, TransportError> {
        let url = self.url("_search/scroll");
        let request = if self.profile.scroll_id_in_body() {
            self.http
                .post(&url)
                .json(&request::scroll_continue_body(scroll_id, &self.scroll_keep_alive))
        } else {
            self.http
                .post(&url)
                .query(&[("scroll", self.scroll_keep_alive.as_str())])
                .body(scroll_id.to_string())
        };
        self.send(request, &url).await
    }
}

#[async_trait::async_trait]
impl SearchClient for ElasticsearchClient {
    async fn stats(&self, index: &str) -> Result<IndexStats, TransportError> {
        let url = self.url(&format!("{index}/_stats"));
        let response = self.send(self.http.get(&url), &url).await?;
        response::parse_stats(response)
    }

    async fn mapping(&self, index: &str) -> Result<Value, TransportError> {
        let url = self.url(&format!("{index}/_mapping"));
        let response = self.send(self.http.get(&url), &url).await?;
        self.profile.normalize_mapping(response)
    }

    async fn open_scroll(
        &self,
        index: &str,
        page_size: usize,
    ) -> Result<ScrollPage, TransportError> {
        let url = self.url(&format!("{index}/_search"));
        let mut query = vec![("scroll", self.scroll_keep_alive.as_str())];
        let strategy = self.profile.scroll_strategy();
        if strategy == ScrollStrategy::Scan {
            query.push(("search_type", "scan"));
        }

        let body = request::open_scroll_body(self.profile.as_ref(), page_size);
        let response = self
            .send(self.http.post(&url).query(&query).json(&body), &url)
            .await?;
        let page = response::parse_scroll_page(&response)?;

        match strategy {
            ScrollStrategy::SortedByDoc => Ok(page),
            // A scan search only hands out a scroll id; hits start with the
            // first continuation.
            ScrollStrategy::Scan => {
                let scroll_id = page.scroll_id.ok_or_else(|| {
                    TransportError::unexpected("scan search returned no scroll id")
                })?;
                self.next_scroll(&scroll_id).await
            }
        }
    }

    async fn next_scroll(&self, scroll_id: &str) -> Result<ScrollPage, TransportError> {
        let response = self.continue_scroll(scroll_id).await?;
        response::parse_scroll_page(&response)
    }

    async fn clear_scroll(&self, scroll_id: &str) -> Result<(), TransportError> {
        let url = self.url("_search/scroll");
        let request = if self.profile.scroll_id_in_body() {
            self.http
                .delete(&url)
                .json(&request::clear_scroll_body(scroll_id))
        } else {
            self.http.delete(&url).body(scroll_id.to_string())
        };
        self.send(request, &url).await?;
        Ok(())
    }

    async fn random_search(
        &self,
        index: &str,
        page: RandomPage,
    ) -> Result<Vec<SourceDocument>, TransportError> {
        let url = self.url(&format!("{index}/_search"));
        let body =
            request::random_search_body(self.profile.as_ref(), page.size, page.from, page.seed);
        tracing::debug!(
            "Random search on {} (seed={}, from={}, size={})",
            index,
            page.seed,
            page.from,
            page.size
        );
        let response = self.send(self.http.post(&url).json(&body), &url).await?;
        response::parse_hits(&response)
    }

    async fn multi_get(
        &self,
        index: &str,
        ids: &[String],
    ) -> Result<Vec<MultiGetEntry>, TransportError> {
        let url = self.url(&format!("{index}/_mget"));
        let body = request::multi_get_body(ids);
        let response = self.send(self.http.post(&url).json(&body), &url).await?;
        response::parse_multi_get(self.profile.as_ref(), &response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ElasticsearchClient>();
    }

    #[test]
    fn test_url_joins_without_double_slash() {
        let client = ElasticsearchClient::new(
            "http://localhost:9200/",
            ServiceVersion::V1,
            ClientOptions::default(),
        )
        .unwrap();
        assert_eq!(client.host(), "http://localhost:9200");
        assert_eq!(
            client.url("content/_stats"),
            "http://localhost:9200/content/_stats"
        );
        assert_eq!(client.profile().version(), ServiceVersion::V1);
    }

    #[tokio::test]
    async fn test_unreachable_host_is_transport_error() {
        let client = ElasticsearchClient::new(
            "http://127.0.0.1:1",
            ServiceVersion::V7,
            ClientOptions {
                timeout: Duration::from_secs(2),
                ..Default::default()
            },
        )
        .unwrap();
        let err = client.stats("content").await.unwrap_err();
        assert!(matches!(err, TransportError::Request { .. }));
    }
}
