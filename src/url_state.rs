use crate::model::SearchRequestParams;
use crate::page::Page;
use url::Url;

/// The page's single history entry. Searches replace it in place; there is
/// no way to push a new one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct History {
    current: Url,
}

impl History {
    pub fn new(initial: Url) -> Self {
        Self { current: initial }
    }

    pub fn current(&self) -> &Url {
        &self.current
    }

    pub fn replace_state(&mut self, url: Url) {
        self.current = url;
    }
}

/// The three search parameters persisted in the page URL.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UrlParams {
    pub q: Option<String>,
    pub mode: Option<String>,
    pub order: Option<String>,
}

pub fn read_url_params(url: &Url) -> UrlParams {
    let first = |key: &str| {
        url.query_pairs()
            .find(|(name, _)| name == key)
            .map(|(_, value)| value.into_owned())
    };
    UrlParams {
        q: first("q"),
        mode: first("mode"),
        order: first("order"),
    }
}

/// Seeds the form from the current URL. Unknown modes are ignored.
pub fn init_from_url(page: &mut Page) {
    let params = read_url_params(page.url());
    if let Some(q) = params.q.filter(|q| !q.is_empty()) {
        page.form.query = q;
    }
    if let Some(mode) = params.mode.filter(|mode| !mode.is_empty()) {
        if !page.form.check_mode(&mode) {
            tracing::debug!(%mode, "ignoring unrecognised mode from url");
        }
    }
    if let Some(order) = params.order.filter(|order| !order.is_empty()) {
        if let Some(control) = page.form.order.as_mut() {
            control.select(&order);
        }
    }
}

/// Rewrites `q`, `mode` and `order` on the current entry in place.
pub fn update_url(page: &mut Page, params: &SearchRequestParams) {
    let url = with_search_params(
        page.url(),
        &[
            ("q", params.q.as_str()),
            ("mode", params.mode.as_str()),
            ("order", params.order.as_str()),
        ],
    );
    page.history.replace_state(url);
}

/// Set semantics per key: the first occurrence is overwritten in place, later
/// duplicates are dropped, absent keys are appended. The fragment is dropped.
fn with_search_params(current: &Url, updates: &[(&str, &str)]) -> Url {
    let mut pairs: Vec<(String, String)> = current
        .query_pairs()
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();
    for (key, value) in updates {
        let mut seen = false;
        pairs.retain_mut(|(name, existing)| {
            if name.as_str() != *key {
                return true;
            }
            if seen {
                return false;
            }
            seen = true;
            *existing = value.to_string();
            true
        });
        if !seen {
            pairs.push((key.to_string(), value.to_string()));
        }
    }
    let mut url = current.clone();
    url.set_fragment(None);
    url.set_query(None);
    if !pairs.is_empty() {
        url.query_pairs_mut().extend_pairs(pairs.iter());
    }
    url
}
