use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::fmt;

pub const DEFAULT_ORDER: &str = "default";
pub const FIRST_PAGE: u32 = 1;
pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// Search strategy selected through the mode radios.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Simple,
    Regex,
    Graph,
}

impl Mode {
    pub const ALL: [Mode; 3] = [Mode::Simple, Mode::Regex, Mode::Graph];

    pub fn as_str(self) -> &'static str {
        match self {
            Mode::Simple => "simple",
            Mode::Regex => "regex",
            Mode::Graph => "graph",
        }
    }

    /// Returns `None` for anything that is not one of the three known modes.
    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|mode| mode.as_str() == value.trim())
    }

    pub(crate) fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Parameters for one `/search` call. Built once per search, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchRequestParams {
    pub q: String,
    pub mode: Mode,
    pub order: String,
    pub page: u32,
    pub page_size: u32,
    pub include_snippet: bool,
}

impl SearchRequestParams {
    /// Returns `None` when the trimmed query is empty.
    pub fn new(query: &str, mode: Mode, order: &str, page_size: u32) -> Option<Self> {
        let q = query.trim();
        if q.is_empty() {
            return None;
        }
        let order = match order.trim() {
            "" => DEFAULT_ORDER,
            other => other,
        };
        Some(Self {
            q: q.to_string(),
            mode,
            order: order.to_string(),
            page: FIRST_PAGE,
            page_size,
            include_snippet: true,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct SearchResponse {
    #[serde(default, deserialize_with = "null_as_default")]
    pub total: u64,
    #[serde(default)]
    pub elapsed_ms: Option<f64>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub results: Vec<ResultItem>,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct ResultItem {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub authors: Vec<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub doc_len_tokens: Option<f64>,
    #[serde(default)]
    pub snippet: Option<String>,
    /// Arbitrary named signals, in the order the backend emitted them.
    #[serde(default, deserialize_with = "null_as_default")]
    pub rank_features: Map<String, Value>,
    #[serde(default)]
    pub match_terms: Option<Vec<String>>,
}

/// A search response decoded for rendering, kept next to the body exactly
/// as the backend sent it. Export writes `body`, never the typed view.
#[derive(Debug, Clone, PartialEq)]
pub struct CapturedSearch {
    pub body: Value,
    pub response: SearchResponse,
}

impl CapturedSearch {
    pub fn from_body(body: Value) -> serde_json::Result<Self> {
        let response = SearchResponse::deserialize(&body)?;
        Ok(Self { body, response })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationItem {
    pub book_id: Value,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
}

impl RecommendationItem {
    /// Identifier rendered without JSON quoting.
    pub fn book_label(&self) -> String {
        match &self.book_id {
            Value::String(text) => text.clone(),
            Value::Null => "?".to_string(),
            other => other.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RecommendationsResponse {
    #[serde(default, deserialize_with = "null_as_default")]
    pub items: Vec<RecommendationItem>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StatsResponse {
    #[serde(default)]
    pub documents: Option<f64>,
    #[serde(default)]
    pub avg_doc_length: Option<f64>,
    #[serde(default)]
    pub terms: Option<f64>,
    #[serde(default)]
    pub last_full_build: Option<String>,
}

/// Session state owned by the controller. Replaced as a whole on success.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SearchState {
    pub last_query: String,
    pub last_mode: Mode,
    pub last_order: String,
    pub last_response: Option<CapturedSearch>,
}

impl SearchState {
    pub(crate) fn replace(&mut self, params: &SearchRequestParams, response: CapturedSearch) {
        *self = SearchState {
            last_query: params.q.clone(),
            last_mode: params.mode,
            last_order: params.order.clone(),
            last_response: Some(response),
        };
    }
}

/// Reads an explicit `null` the same way as an absent field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
