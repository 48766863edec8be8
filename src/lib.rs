//! Headless controller for the library search page.
//!
//! The host document is modelled as a typed [`Page`]. A [`SearchController`]
//! drives it against the search backend: it reads the form, calls the API,
//! renders result and recommendation fragments, keeps the URL in sync, fills
//! the stats panel and exports the last response.

pub mod api;
pub mod config;
pub mod controller;
pub mod error;
pub mod export;
pub mod format;
pub mod mode;
pub mod model;
pub mod page;
pub mod render;
pub mod stats;
pub mod url_state;

#[cfg(test)]
mod testing;

pub use api::{ApiClient, Param};
pub use config::ClientConfig;
pub use controller::{SearchController, SearchOutcome};
pub use error::{ClientError, Result};
pub use format::{HighlightSpan, highlight_segments, highlight_terms};
pub use model::{
    CapturedSearch, Mode, RecommendationItem, ResultItem, SearchRequestParams, SearchResponse,
    SearchState, StatsResponse,
};
pub use page::{Page, render_page};
