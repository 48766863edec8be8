//! Projects API payloads into the page. Each item becomes a plain view
//! record first, then one askama fragment; fragments are joined and
//! assigned to the page in a single step.

use crate::error::Result;
use crate::format::{format_float, format_number, highlight_terms};
use crate::model::{RecommendationItem, ResultItem, SearchResponse};
use crate::page::{Page, placeholder_entry};
use askama::Template;
use serde::Serialize;
use serde_json::{Map, Value};

pub const NO_MATCHES: &str = "No results matched your query. Try another keyword or mode.";
pub const NO_SUGGESTIONS: &str = "No suggestions yet. Try another query.";
pub const UNTITLED: &str = "Untitled book";
pub const UNKNOWN_AUTHOR: &str = "Unknown author";
pub const UNKNOWN_LANGUAGE: &str = "Unknown language";
pub const UNKNOWN_LENGTH: &str = "Unknown length";
pub const NO_SNIPPET: &str = "No snippet available.";
pub const DEFAULT_REASON: &str = "high match";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultCard {
    pub rank: String,
    pub title: String,
    pub authors: String,
    pub language: String,
    pub length: String,
    /// Snippet text before highlighting.
    pub snippet: String,
    pub snippet_html: String,
    pub badges: Vec<String>,
}

impl ResultCard {
    pub fn from_item(index: usize, item: &ResultItem, query: &str) -> Self {
        let snippet = non_empty(item.snippet.as_deref())
            .unwrap_or(NO_SNIPPET)
            .to_string();
        let authors = item.authors.join(", ");
        Self {
            rank: format!("#{}", index + 1),
            title: non_empty(item.title.as_deref())
                .unwrap_or(UNTITLED)
                .to_string(),
            authors: if authors.is_empty() {
                UNKNOWN_AUTHOR.to_string()
            } else {
                authors
            },
            language: non_empty(item.language.as_deref())
                .unwrap_or(UNKNOWN_LANGUAGE)
                .to_string(),
            length: item
                .doc_len_tokens
                .filter(|len| *len != 0.0 && !len.is_nan())
                .map(|len| format!("{} tokens", format_number(Some(len))))
                .unwrap_or_else(|| UNKNOWN_LENGTH.to_string()),
            snippet_html: highlight_terms(&snippet, query),
            snippet,
            badges: feature_badges(&item.rank_features, item.match_terms.as_deref()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecommendationCard {
    pub title: String,
    pub reason: String,
}

impl RecommendationCard {
    pub fn from_item(item: &RecommendationItem) -> Self {
        Self {
            title: non_empty(item.title.as_deref())
                .map(str::to_string)
                .unwrap_or_else(|| format!("Book #{}", item.book_label())),
            reason: non_empty(item.reason.as_deref())
                .unwrap_or(DEFAULT_REASON)
                .to_string(),
        }
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|text| !text.is_empty())
}

/// One `key: value` badge per numeric rank feature, in map order, then a
/// `Match:` badge when matched terms were reported.
pub fn feature_badges(features: &Map<String, Value>, match_terms: Option<&[String]>) -> Vec<String> {
    let mut badges: Vec<String> = features
        .iter()
        .filter_map(|(key, value)| {
            value
                .as_f64()
                .map(|number| format!("{key}: {}", format_float(Some(number))))
        })
        .collect();
    if let Some(terms) = match_terms {
        badges.push(format!("Match: {}", terms.join(", ")));
    }
    badges
}

#[derive(Template)]
#[template(
    source = r#"<li class="result-item card mb-3">
  <div class="card-body">
    <span class="badge bg-secondary" data-rank>{{ card.rank }}</span>
    <h3 class="h5" data-title>{{ card.title }}</h3>
    <p class="text-muted small"><span data-authors>{{ card.authors }}</span> · <span data-language>{{ card.language }}</span> · <span data-length>{{ card.length }}</span></p>
    <p data-snippet>{{ card.snippet_html|safe }}</p>
    <div data-tags>{% for badge in card.badges %}<span class="badge">{{ badge }}</span>{% endfor %}</div>
  </div>
</li>
"#,
    ext = "html"
)]
struct ResultItemTemplate<'a> {
    card: &'a ResultCard,
}

#[derive(Template)]
#[template(
    source = r#"<li class="recommendation-item"><strong data-rec-title>{{ card.title }}</strong> <span class="text-muted small" data-rec-reason>{{ card.reason }}</span></li>
"#,
    ext = "html"
)]
struct RecommendationItemTemplate<'a> {
    card: &'a RecommendationCard,
}

/// Replaces the rendered result list. Nothing on the page changes if a
/// fragment fails to render.
pub fn render_results(page: &mut Page, data: &SearchResponse, query: &str) -> Result<()> {
    if data.results.is_empty() {
        render_empty_state(page, NO_MATCHES);
        return Ok(());
    }
    let cards: Vec<ResultCard> = data
        .results
        .iter()
        .enumerate()
        .map(|(index, item)| ResultCard::from_item(index, item, query))
        .collect();
    let mut fragment = String::new();
    for card in &cards {
        fragment.push_str(&ResultItemTemplate { card }.render()?);
    }
    page.empty_state = None;
    page.results = cards;
    page.results_html = fragment;
    Ok(())
}

pub fn render_empty_state(page: &mut Page, message: &str) {
    page.results.clear();
    page.results_html.clear();
    page.empty_state = Some(message.to_string());
}

pub fn render_recommendations(page: &mut Page, items: &[RecommendationItem]) -> Result<()> {
    if items.is_empty() {
        render_recommendation_placeholder(page, NO_SUGGESTIONS);
        return Ok(());
    }
    let cards: Vec<RecommendationCard> = items.iter().map(RecommendationCard::from_item).collect();
    let mut fragment = String::new();
    for card in &cards {
        fragment.push_str(&RecommendationItemTemplate { card }.render()?);
    }
    page.recommendations = cards;
    page.recommendations_html = fragment;
    Ok(())
}

pub fn render_recommendation_placeholder(page: &mut Page, message: &str) {
    page.recommendations.clear();
    page.recommendations_html = placeholder_entry(message);
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use url::Url;

    fn page() -> Page {
        Page::standard(
            Url::parse("http://library.test/").unwrap(),
            &Url::parse("http://library.test/api/").unwrap(),
        )
    }

    fn response(body: Value) -> SearchResponse {
        serde_json::from_value(body).unwrap()
    }

    #[test]
    fn badges_follow_map_order_and_skip_nulls() {
        let features = json!({"bm25": 12.346, "pagerank": 0.0042, "closeness": null, "tf": 250});
        let badges = feature_badges(features.as_object().unwrap(), None);
        assert_eq!(badges, vec!["bm25: 12.35", "pagerank: 0.0042", "tf: 250"]);
    }

    #[test]
    fn badges_append_match_terms() {
        let features = json!({"score": 1.5});
        let terms = vec!["whale".to_string(), "sea".to_string()];
        let badges = feature_badges(features.as_object().unwrap(), Some(terms.as_slice()));
        assert_eq!(badges, vec!["score: 1.50", "Match: whale, sea"]);
    }

    #[test]
    fn card_applies_fallbacks() {
        let item: ResultItem = serde_json::from_value(json!({"authors": [], "doc_len_tokens": 0})).unwrap();
        let card = ResultCard::from_item(2, &item, "whale");
        assert_eq!(card.rank, "#3");
        assert_eq!(card.title, UNTITLED);
        assert_eq!(card.authors, UNKNOWN_AUTHOR);
        assert_eq!(card.language, UNKNOWN_LANGUAGE);
        assert_eq!(card.length, UNKNOWN_LENGTH);
        assert_eq!(card.snippet_html, NO_SNIPPET);
        assert!(card.badges.is_empty());
    }

    #[test]
    fn card_treats_null_collections_as_absent() {
        let item: ResultItem = serde_json::from_value(json!({
            "title": "Omoo",
            "authors": null,
            "rank_features": null,
            "match_terms": ["sea"],
            "snippet": null
        }))
        .unwrap();
        let card = ResultCard::from_item(0, &item, "sea");
        assert_eq!(card.authors, UNKNOWN_AUTHOR);
        assert_eq!(card.snippet, NO_SNIPPET);
        assert_eq!(card.badges, vec!["Match: sea"]);
    }

    #[test]
    fn card_formats_populated_item() {
        let item: ResultItem = serde_json::from_value(json!({
            "title": "Moby Dick; Or, The Whale",
            "authors": ["Herman Melville", "Anon"],
            "language": "en",
            "doc_len_tokens": 215830,
            "snippet": "the great white whale surfaced",
        }))
        .unwrap();
        let card = ResultCard::from_item(0, &item, "Whale");
        assert_eq!(card.rank, "#1");
        assert_eq!(card.authors, "Herman Melville, Anon");
        assert_eq!(card.length, "215,830 tokens");
        assert_eq!(
            card.snippet_html,
            r#"the great white <mark class="highlight">whale</mark> surfaced"#
        );
    }

    #[test]
    fn render_results_builds_one_fragment_per_item() {
        let mut page = page();
        page.empty_state = Some("stale".to_string());
        let data = response(json!({
            "total": 2,
            "elapsed_ms": 8,
            "results": [
                {"title": "Moby <Dick>", "snippet": "whale"},
                {"title": "Typee", "rank_features": {"tf": 2}}
            ]
        }));
        render_results(&mut page, &data, "whale").unwrap();
        assert_eq!(page.results.len(), 2);
        assert!(page.empty_state.is_none());
        assert_eq!(page.results_html.matches("<li class=\"result-item").count(), 2);
        assert!(page.results_html.contains("Moby &lt;Dick&gt;"));
        assert!(page.results_html.contains(r#"<mark class="highlight">whale</mark>"#));
        assert!(page.results_html.contains(r#"<span class="badge">tf: 2.00</span>"#));
    }

    #[test]
    fn render_results_with_no_items_shows_empty_state() {
        let mut page = page();
        page.results_html = "<li>old</li>".to_string();
        let data = response(json!({"total": 0, "elapsed_ms": 1, "results": []}));
        render_results(&mut page, &data, "zzz").unwrap();
        assert!(page.results.is_empty());
        assert!(page.results_html.is_empty());
        assert_eq!(page.empty_state.as_deref(), Some(NO_MATCHES));
    }

    #[test]
    fn recommendations_fall_back_to_identifier_and_reason() {
        let mut page = page();
        let items: Vec<RecommendationItem> = serde_json::from_value(json!([
            {"book_id": 1342, "title": "Pride and Prejudice", "reason": "shared vocabulary"},
            {"book_id": 84}
        ]))
        .unwrap();
        render_recommendations(&mut page, &items).unwrap();
        assert_eq!(page.recommendations[1].title, "Book #84");
        assert_eq!(page.recommendations[1].reason, DEFAULT_REASON);
        assert_eq!(page.recommendations_html.matches("recommendation-item").count(), 2);
        assert!(page.recommendations_html.contains("shared vocabulary"));
    }

    #[test]
    fn empty_recommendations_render_placeholder() {
        let mut page = page();
        render_recommendations(&mut page, &[]).unwrap();
        assert!(page.recommendations.is_empty());
        assert_eq!(
            page.recommendations_html,
            format!(r#"<li class="text-muted">{NO_SUGGESTIONS}</li>"#)
        );
    }
}
