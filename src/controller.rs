//! The search orchestrator. Owns the page and the session state behind one
//! lock and drives them through boot, searches, recommendations, stats and
//! export. Locks are never held across an await point.

use crate::api::ApiClient;
use crate::config::ClientConfig;
use crate::error::Result;
use crate::export::export_last_response;
use crate::format::format_duration;
use crate::mode::apply_mode;
use crate::model::{SearchRequestParams, SearchState};
use crate::page::{Page, RECOMMENDATION_PROMPT, START_SUMMARY, render_page};
use crate::render::{
    NO_SUGGESTIONS, render_empty_state, render_recommendation_placeholder, render_recommendations,
    render_results,
};
use crate::url_state::{init_from_url, update_url};
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub const EMPTY_QUERY_PROMPT: &str = "Please enter a keyword to start searching.";
pub const SEARCH_FAILED: &str = "Search failed. Please try again later.";

/// How a single `perform_search` call ended.
///
/// A `Completed` search is only reported after the follow-up recommendations
/// fetch has also settled, so callers wait on both endpoints. The loading
/// indicator is already cleared by then.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchOutcome {
    /// The query was blank; no request was made.
    Prompted,
    Completed { total: u64, shown: usize },
    Failed { message: String },
    /// A newer search started before this one finished; its response was dropped.
    Superseded,
}

struct Session {
    page: Page,
    state: SearchState,
    /// Bumped on every search attempt. Responses tagged with an older value are stale.
    seq: u64,
    in_flight: usize,
}

struct Inner {
    api: ApiClient,
    config: ClientConfig,
    session: Mutex<Session>,
}

#[derive(Clone)]
pub struct SearchController {
    inner: Arc<Inner>,
}

/// Keeps the loading indicator up while at least one search is in flight.
struct LoadingGuard<'a> {
    inner: &'a Inner,
}

impl<'a> LoadingGuard<'a> {
    fn begin(inner: &'a Inner, session: &mut Session) -> Self {
        session.in_flight += 1;
        session.page.loading = true;
        Self { inner }
    }
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        let mut session = self.inner.session.lock();
        session.in_flight = session.in_flight.saturating_sub(1);
        session.page.loading = session.in_flight > 0;
    }
}

impl SearchController {
    pub fn new(config: ClientConfig) -> Result<Self> {
        let api = ApiClient::new(config.api_base.clone())?;
        let page = Page::standard(config.page_url.clone(), &config.api_base);
        Ok(Self {
            inner: Arc::new(Inner {
                api,
                config,
                session: Mutex::new(Session {
                    page,
                    state: SearchState::default(),
                    seq: 0,
                    in_flight: 0,
                }),
            }),
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    /// Seeds the form from the URL, applies the checked mode, then loads
    /// stats and (when a query is present) runs the first search side by side.
    pub async fn boot(&self) -> Option<SearchOutcome> {
        let has_query = {
            let mut session = self.inner.session.lock();
            let page = &mut session.page;
            init_from_url(page);
            let mode = page.form.selected_mode();
            apply_mode(&mut page.form, mode);
            !page.form.query.trim().is_empty()
        };
        let search = async {
            if has_query {
                Some(self.perform_search().await)
            } else {
                None
            }
        };
        let (_, outcome) = tokio::join!(self.load_stats(), search);
        outcome
    }

    pub async fn submit(&self) -> SearchOutcome {
        self.perform_search().await
    }

    /// Runs one search cycle from the current form values. On success the
    /// recommendations for the same query are fetched before returning.
    pub async fn perform_search(&self) -> SearchOutcome {
        let (params, seq, loading) = {
            let mut guard = self.inner.session.lock();
            let session = &mut *guard;
            session.seq += 1;
            let seq = session.seq;
            let form = &session.page.form;
            let params = SearchRequestParams::new(
                &form.query,
                form.selected_mode(),
                &form.selected_order(),
                self.inner.config.page_size,
            );
            let Some(params) = params else {
                let page = &mut session.page;
                render_empty_state(page, EMPTY_QUERY_PROMPT);
                page.summary = START_SUMMARY.to_string();
                render_recommendation_placeholder(page, RECOMMENDATION_PROMPT);
                page.export_visible = false;
                return SearchOutcome::Prompted;
            };
            let loading = LoadingGuard::begin(&self.inner, session);
            session.page.error = None;
            update_url(&mut session.page, &params);
            (params, seq, loading)
        };

        let result = self.inner.api.search(&params).await;

        let outcome = {
            let mut guard = self.inner.session.lock();
            let session = &mut *guard;
            if session.seq != seq {
                debug!(query = %params.q, seq, latest = session.seq, "discarding stale search response");
                SearchOutcome::Superseded
            } else {
                let rendered = result.and_then(|captured| {
                    render_results(&mut session.page, &captured.response, &params.q)?;
                    Ok(captured)
                });
                match rendered {
                    Ok(captured) => {
                        let total = captured.response.total;
                        let shown = captured.response.results.len();
                        let page = &mut session.page;
                        page.export_visible = true;
                        page.summary = format!(
                            "Found {total} results in {}.",
                            format_duration(captured.response.elapsed_ms)
                        );
                        session.state.replace(&params, captured);
                        info!(query = %params.q, mode = %params.mode, order = %params.order, total, shown, "search completed");
                        SearchOutcome::Completed { total, shown }
                    }
                    Err(err) => {
                        let message = err.message();
                        warn!(query = %params.q, error = %err, "search failed");
                        session.page.error = Some(message.clone());
                        render_empty_state(&mut session.page, SEARCH_FAILED);
                        SearchOutcome::Failed { message }
                    }
                }
            }
        };
        drop(loading);

        if matches!(outcome, SearchOutcome::Completed { .. }) {
            self.load_recommendations(&params.q, seq).await;
        }
        outcome
    }

    async fn load_recommendations(&self, query: &str, seq: u64) {
        let result = self
            .inner
            .api
            .recommendations(query, self.inner.config.recommendation_limit)
            .await;
        let mut session = self.inner.session.lock();
        if session.seq != seq {
            debug!(query, seq, "discarding stale recommendations");
            return;
        }
        let items = match result {
            Ok(data) => data.items,
            Err(err) => {
                warn!(query, error = %err, "recommendations unavailable");
                Vec::new()
            }
        };
        if let Err(err) = render_recommendations(&mut session.page, &items) {
            warn!(error = %err, "failed to render recommendations");
            render_recommendation_placeholder(&mut session.page, NO_SUGGESTIONS);
        }
    }

    /// Refreshes the stats panel. Returns whether the backend answered.
    pub async fn load_stats(&self) -> bool {
        let result = self.inner.api.index_stats().await;
        let mut session = self.inner.session.lock();
        match result {
            Ok(stats) => {
                session.page.stats.apply(&stats);
                true
            }
            Err(err) => {
                warn!(error = %err, "index stats unavailable");
                session.page.stats.mark_unavailable();
                false
            }
        }
    }

    pub fn set_query(&self, query: &str) {
        self.inner.session.lock().page.form.query = query.to_string();
    }

    /// Checks a mode radio and reapplies the mode policy. Unknown values
    /// change nothing and return `false`.
    pub fn select_mode(&self, value: &str) -> bool {
        let mut session = self.inner.session.lock();
        let form = &mut session.page.form;
        if !form.check_mode(value) {
            return false;
        }
        let mode = form.selected_mode();
        apply_mode(form, mode);
        true
    }

    /// Returns `false` when the page has no order control or the value is unknown.
    pub fn select_order(&self, value: &str) -> bool {
        let mut session = self.inner.session.lock();
        match session.page.form.order.as_mut() {
            Some(order) => order.select(value),
            None => false,
        }
    }

    pub fn dismiss_error(&self) {
        self.inner.session.lock().page.error = None;
    }

    /// Writes the last successful response into the configured export directory.
    pub fn export(&self) -> Result<Option<PathBuf>> {
        let state = self.state();
        export_last_response(&state, &self.inner.config.export_dir)
    }

    pub fn snapshot(&self) -> Page {
        self.inner.session.lock().page.clone()
    }

    pub fn state(&self) -> SearchState {
        self.inner.session.lock().state.clone()
    }

    pub fn render_html(&self) -> Result<String> {
        render_page(&self.snapshot())
    }
}
