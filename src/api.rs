use crate::error::{ClientError, Result};
use crate::model::{CapturedSearch, RecommendationsResponse, SearchRequestParams, StatsResponse};
use reqwest::StatusCode;
use reqwest::header::ACCEPT;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;
use url::Url;

pub const SEARCH_PATH: &str = "search";
pub const STATS_PATH: &str = "index/stats";
pub const RECOMMENDATIONS_PATH: &str = "recommendations/query";

/// A single query-string value. Only `Missing` and empty text are dropped;
/// `0` and `false` are still sent.
#[derive(Debug, Clone, PartialEq)]
pub enum Param {
    Text(String),
    Integer(i64),
    Flag(bool),
    Missing,
}

impl Param {
    fn query_value(&self) -> Option<String> {
        match self {
            Param::Text(text) if text.is_empty() => None,
            Param::Text(text) => Some(text.clone()),
            Param::Integer(value) => Some(value.to_string()),
            Param::Flag(value) => Some(value.to_string()),
            Param::Missing => None,
        }
    }
}

impl From<&str> for Param {
    fn from(value: &str) -> Self {
        Param::Text(value.to_string())
    }
}

impl From<String> for Param {
    fn from(value: String) -> Self {
        Param::Text(value)
    }
}

impl From<u32> for Param {
    fn from(value: u32) -> Self {
        Param::Integer(i64::from(value))
    }
}

impl From<i64> for Param {
    fn from(value: i64) -> Self {
        Param::Integer(value)
    }
}

impl From<bool> for Param {
    fn from(value: bool) -> Self {
        Param::Flag(value)
    }
}

impl<T: Into<Param>> From<Option<T>> for Param {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Param::Missing)
    }
}

#[derive(Debug, Clone)]
pub struct ApiClient {
    base: Url,
    http: reqwest::Client,
}

impl ApiClient {
    pub fn new(base: Url) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("library-search-console/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { base, http })
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    pub fn build_url(&self, path: &str, params: &[(&str, Param)]) -> Result<Url> {
        let mut url = self.base.join(path.trim_start_matches('/'))?;
        let pairs: Vec<(&str, String)> = params
            .iter()
            .filter_map(|(key, value)| value.query_value().map(|value| (*key, value)))
            .collect();
        if !pairs.is_empty() {
            let mut query = url.query_pairs_mut();
            for (key, value) in &pairs {
                query.append_pair(key, value);
            }
        }
        Ok(url)
    }

    /// GETs `path` and decodes the JSON body. Non-2xx responses become
    /// [`ClientError::Http`] carrying `error.message` from the body when present,
    /// otherwise the status text.
    pub async fn request<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, Param)],
    ) -> Result<T> {
        let url = self.build_url(path, params)?;
        debug!(%url, "GET");
        let response = self
            .http
            .get(url)
            .header(ACCEPT, "application/json")
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await?;
            let message = extract_error_message(&body).unwrap_or_else(|| status_text(status));
            debug!(status = status.as_u16(), %message, "request failed");
            return Err(ClientError::Http {
                status: status.as_u16(),
                message,
            });
        }
        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Runs `/search`, keeping the raw body alongside the decoded response.
    pub async fn search(&self, params: &SearchRequestParams) -> Result<CapturedSearch> {
        let body: Value = self
            .request(
                SEARCH_PATH,
                &[
                    ("q", params.q.as_str().into()),
                    ("mode", params.mode.as_str().into()),
                    ("order", params.order.as_str().into()),
                    ("page", params.page.into()),
                    ("page_size", params.page_size.into()),
                    ("include_snippet", params.include_snippet.into()),
                ],
            )
            .await?;
        Ok(CapturedSearch::from_body(body)?)
    }

    pub async fn index_stats(&self) -> Result<StatsResponse> {
        self.request(STATS_PATH, &[]).await
    }

    pub async fn recommendations(&self, query: &str, limit: u32) -> Result<RecommendationsResponse> {
        self.request(
            RECOMMENDATIONS_PATH,
            &[("q", query.into()), ("limit", limit.into())],
        )
        .await
    }
}

/// Pulls `error.message` out of a failure body; `None` for anything else.
pub fn extract_error_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    value
        .get("error")?
        .get("message")?
        .as_str()
        .filter(|message| !message.is_empty())
        .map(str::to_string)
}

fn status_text(status: StatusCode) -> String {
    status
        .canonical_reason()
        .map(str::to_string)
        .unwrap_or_else(|| status.as_str().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Mode;
    use crate::testing::{MockBackend, MockReply};

    fn client(base: &str) -> ApiClient {
        ApiClient::new(Url::parse(base).unwrap()).unwrap()
    }

    #[test]
    fn build_url_skips_missing_and_empty_but_keeps_zero() {
        let api = client("http://localhost/api/");
        let url = api
            .build_url(
                "/search",
                &[
                    ("q", "moby dick".into()),
                    ("order", "".into()),
                    ("page", 0u32.into()),
                    ("include_snippet", false.into()),
                    ("limit", Param::from(None::<u32>)),
                ],
            )
            .unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost/api/search?q=moby+dick&page=0&include_snippet=false"
        );
    }

    #[test]
    fn build_url_without_params_has_no_query() {
        let api = client("http://localhost/api/");
        let url = api.build_url(STATS_PATH, &[]).unwrap();
        assert_eq!(url.as_str(), "http://localhost/api/index/stats");
    }

    #[test]
    fn extract_error_message_requires_nested_shape() {
        assert_eq!(
            extract_error_message(r#"{"error": {"message": "bad regex"}}"#),
            Some("bad regex".to_string())
        );
        assert_eq!(extract_error_message(r#"{"error": "flat"}"#), None);
        assert_eq!(extract_error_message("<html>502</html>"), None);
        assert_eq!(extract_error_message(r#"{"error": {"message": ""}}"#), None);
    }

    #[tokio::test]
    async fn search_sends_fixed_pagination_and_accept_header() {
        let backend = MockBackend::start(vec![(
            "/api/search",
            MockReply::json(200, r#"{"total": 0, "elapsed_ms": 3, "results": []}"#),
        )])
        .await;
        let api = ApiClient::new(backend.base.clone()).unwrap();
        let params = SearchRequestParams::new("whale", Mode::Graph, "closeness", 20).unwrap();
        let captured = api.search(&params).await.unwrap();
        assert_eq!(captured.response.total, 0);
        assert_eq!(captured.body["elapsed_ms"], 3);

        let requests = backend.requests();
        assert_eq!(requests.len(), 1);
        let request = &requests[0];
        assert_eq!(request.path, "/api/search");
        assert_eq!(request.param("q"), Some("whale"));
        assert_eq!(request.param("mode"), Some("graph"));
        assert_eq!(request.param("order"), Some("closeness"));
        assert_eq!(request.param("page"), Some("1"));
        assert_eq!(request.param("page_size"), Some("20"));
        assert_eq!(request.param("include_snippet"), Some("true"));
        assert_eq!(request.accept.as_deref(), Some("application/json"));
    }

    #[tokio::test]
    async fn failure_body_message_is_extracted() {
        let backend = MockBackend::start(vec![(
            "/api/search",
            MockReply::json(400, r#"{"error": {"message": "Invalid regex pattern"}}"#),
        )])
        .await;
        let api = ApiClient::new(backend.base.clone()).unwrap();
        let params = SearchRequestParams::new("(", Mode::Regex, "default", 20).unwrap();
        let err = api.search(&params).await.unwrap_err();
        assert_eq!(err.status(), Some(400));
        assert_eq!(err.message(), "Invalid regex pattern");
    }

    #[tokio::test]
    async fn non_json_failure_falls_back_to_status_text() {
        let backend = MockBackend::start(vec![(
            "/api/index/stats",
            MockReply::text(502, "<html>upstream down</html>"),
        )])
        .await;
        let api = ApiClient::new(backend.base.clone()).unwrap();
        let err = api.index_stats().await.unwrap_err();
        assert_eq!(err.message(), "Bad Gateway");
    }

    #[tokio::test]
    async fn malformed_success_body_is_an_error() {
        let backend = MockBackend::start(vec![(
            "/api/recommendations/query",
            MockReply::text(200, "not json"),
        )])
        .await;
        let api = ApiClient::new(backend.base.clone()).unwrap();
        let err = api.recommendations("whale", 6).await.unwrap_err();
        assert!(matches!(err, ClientError::Decode(_)));
        let requests = backend.requests();
        assert_eq!(requests[0].param("limit"), Some("6"));
    }
}
