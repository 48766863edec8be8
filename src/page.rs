//! Typed model of the host document: the search form, the result and
//! recommendation containers, status banners and the stats panel. The
//! controller mutates it; `render_page` projects it back into markup.

use crate::error::Result;
use crate::model::{DEFAULT_ORDER, Mode};
use crate::render::{RecommendationCard, ResultCard};
use crate::stats::StatsPanel;
use crate::url_state::History;
use askama::Template;
use url::Url;

pub const START_SUMMARY: &str = "Type a query to get started.";
pub const RECOMMENDATION_PROMPT: &str = "Enter a query to see recommended titles.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChoiceOption {
    pub value: String,
    pub label: String,
}

impl ChoiceOption {
    fn new(value: &str, label: &str) -> Self {
        Self {
            value: value.to_string(),
            label: label.to_string(),
        }
    }
}

/// The ranking `<select>`. Assigning a value that is not among the options
/// leaves nothing selected, which reads back as `default`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderControl {
    options: Vec<ChoiceOption>,
    selected: Option<usize>,
    pub visible: bool,
}

impl OrderControl {
    pub fn new(options: Vec<ChoiceOption>) -> Self {
        let selected = options
            .iter()
            .position(|option| option.value == DEFAULT_ORDER)
            .or(if options.is_empty() { None } else { Some(0) });
        Self {
            options,
            selected,
            visible: true,
        }
    }

    pub fn standard() -> Self {
        Self::new(vec![
            ChoiceOption::new("default", "Relevance"),
            ChoiceOption::new("pagerank", "PageRank"),
            ChoiceOption::new("closeness", "Closeness"),
            ChoiceOption::new("betweenness", "Betweenness"),
        ])
    }

    /// Returns whether `value` matched an option.
    pub fn select(&mut self, value: &str) -> bool {
        self.selected = self.options.iter().position(|option| option.value == value);
        self.selected.is_some()
    }

    pub fn value(&self) -> &str {
        self.selected
            .and_then(|idx| self.options.get(idx))
            .map(|option| option.value.as_str())
            .filter(|value| !value.is_empty())
            .unwrap_or(DEFAULT_ORDER)
    }

    pub fn options(&self) -> &[ChoiceOption] {
        &self.options
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModeRadio {
    pub mode: Mode,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchForm {
    pub query: String,
    pub modes: Vec<ModeRadio>,
    checked: Option<Mode>,
    pub order: Option<OrderControl>,
    pub mode_tip: String,
}

impl SearchForm {
    pub fn standard() -> Self {
        Self {
            query: String::new(),
            modes: vec![
                ModeRadio {
                    mode: Mode::Simple,
                    label: "Keyword".to_string(),
                },
                ModeRadio {
                    mode: Mode::Regex,
                    label: "Regex".to_string(),
                },
                ModeRadio {
                    mode: Mode::Graph,
                    label: "Graph ranking".to_string(),
                },
            ],
            checked: Some(Mode::Simple),
            order: Some(OrderControl::standard()),
            mode_tip: String::new(),
        }
    }

    /// Checks the radio whose value is `value`. Unknown values, or modes
    /// this form has no radio for, leave the current selection alone.
    pub fn check_mode(&mut self, value: &str) -> bool {
        let Some(mode) = Mode::parse(value) else {
            return false;
        };
        if !self.modes.iter().any(|radio| radio.mode == mode) {
            return false;
        }
        self.checked = Some(mode);
        true
    }

    pub fn selected_mode(&self) -> Mode {
        self.checked.unwrap_or_default()
    }

    pub fn selected_order(&self) -> String {
        self.order
            .as_ref()
            .map(|order| order.value().to_string())
            .unwrap_or_else(|| DEFAULT_ORDER.to_string())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    pub history: History,
    pub api_base: String,
    pub form: SearchForm,
    pub results: Vec<ResultCard>,
    pub results_html: String,
    /// Visible empty-state message; `None` while hidden.
    pub empty_state: Option<String>,
    pub summary: String,
    /// Visible error banner text; `None` while hidden.
    pub error: Option<String>,
    pub loading: bool,
    pub stats: StatsPanel,
    pub recommendations: Vec<RecommendationCard>,
    pub recommendations_html: String,
    pub export_visible: bool,
}

impl Page {
    pub fn standard(url: Url, api_base: &Url) -> Self {
        Self {
            history: History::new(url),
            api_base: api_base.to_string(),
            form: SearchForm::standard(),
            results: Vec::new(),
            results_html: String::new(),
            empty_state: None,
            summary: START_SUMMARY.to_string(),
            error: None,
            loading: false,
            stats: StatsPanel::default(),
            recommendations: Vec::new(),
            recommendations_html: placeholder_entry(RECOMMENDATION_PROMPT),
            export_visible: false,
        }
    }

    pub fn url(&self) -> &Url {
        self.history.current()
    }
}

pub(crate) fn placeholder_entry(message: &str) -> String {
    format!(
        r#"<li class="text-muted">{}</li>"#,
        crate::format::escape_html(message)
    )
}

struct ModeRadioView<'a> {
    value: &'static str,
    label: &'a str,
    checked: bool,
}

struct OrderOptionView<'a> {
    value: &'a str,
    label: &'a str,
    selected: bool,
}

#[derive(Template)]
#[template(
    source = r#"<!DOCTYPE html>
<html lang="en">
  <head>
    <meta charset="utf-8" />
    <meta name="viewport" content="width=device-width, initial-scale=1" />
    <title>Library search{% if !page.form.query.is_empty() %} • {{ page.form.query }}{% endif %}</title>
  </head>
  <body data-api-base="{{ page.api_base }}">
    <main class="container py-4">
      <form data-search-form method="get" action="{{ page.url().path() }}">
        <input type="search" name="q" value="{{ page.form.query }}" placeholder="Search the library" />
        <div class="btn-group" role="group">
          {% for radio in radios %}
          <label><input type="radio" name="mode" value="{{ radio.value }}"{% if radio.checked %} checked{% endif %} /> {{ radio.label }}</label>
          {% endfor %}
        </div>
        {% if has_order %}
        <div data-order-wrapper{% if !order_visible %} class="d-none"{% endif %}>
          <select name="order" data-order-select>
            {% for option in orders %}
            <option value="{{ option.value }}"{% if option.selected %} selected{% endif %}>{{ option.label }}</option>
            {% endfor %}
          </select>
        </div>
        {% endif %}
        <p class="form-text" data-mode-tip>{{ page.form.mode_tip }}</p>
        <button type="submit" class="btn btn-primary">Search</button>
      </form>

      <section data-stats>
        <dl class="row">
          <dt>Documents</dt><dd data-stat-documents>{{ page.stats.documents }}</dd>
          <dt>Average length</dt><dd data-stat-avglen>{{ page.stats.avg_doc_length }}</dd>
          <dt>Terms</dt><dd data-stat-terms>{{ page.stats.terms }}</dd>
          <dt>Last full build</dt><dd data-stat-lastbuild>{{ page.stats.last_full_build }}</dd>
        </dl>
      </section>

      <div class="alert alert-danger{% if !show_error %} d-none{% endif %}" data-error>{{ error_message }}</div>
      <div class="spinner-border{% if !page.loading %} d-none{% endif %}" data-loading></div>
      <div class="placeholder-glow{% if !page.loading %} d-none{% endif %}" data-skeleton></div>

      <p data-results-summary>{{ page.summary }}</p>
      <button type="button" class="btn btn-outline-secondary{% if !page.export_visible %} d-none{% endif %}" data-export-btn>Export JSON</button>
      <div class="text-muted{% if !show_empty %} d-none{% endif %}" data-empty>{{ empty_message }}</div>
      <ol class="list-unstyled" data-results>{{ page.results_html|safe }}</ol>

      <aside>
        <h2 class="h5">Recommended titles</h2>
        <ul class="list-unstyled" data-suggestions>{{ page.recommendations_html|safe }}</ul>
      </aside>
    </main>
  </body>
</html>"#,
    ext = "html"
)]
struct PageTemplate<'a> {
    page: &'a Page,
    radios: Vec<ModeRadioView<'a>>,
    has_order: bool,
    order_visible: bool,
    orders: Vec<OrderOptionView<'a>>,
    show_error: bool,
    error_message: &'a str,
    show_empty: bool,
    empty_message: &'a str,
}

/// Renders the whole host document for the current page state.
pub fn render_page(page: &Page) -> Result<String> {
    let selected_mode = page.form.selected_mode();
    let radios = page
        .form
        .modes
        .iter()
        .map(|radio| ModeRadioView {
            value: radio.mode.as_str(),
            label: radio.label.as_str(),
            checked: radio.mode == selected_mode,
        })
        .collect();
    let (has_order, order_visible, orders) = match page.form.order.as_ref() {
        Some(order) => (
            true,
            order.visible,
            order
                .options()
                .iter()
                .map(|option| OrderOptionView {
                    value: option.value.as_str(),
                    label: option.label.as_str(),
                    selected: option.value == order.value(),
                })
                .collect(),
        ),
        None => (false, false, Vec::new()),
    };
    let template = PageTemplate {
        page,
        radios,
        has_order,
        order_visible,
        orders,
        show_error: page.error.is_some(),
        error_message: page.error.as_deref().unwrap_or(""),
        show_empty: page.empty_state.is_some(),
        empty_message: page.empty_state.as_deref().unwrap_or(""),
    };
    Ok(template.render()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page() -> Page {
        Page::standard(
            Url::parse("http://library.test/search/").unwrap(),
            &Url::parse("http://library.test/api/").unwrap(),
        )
    }

    #[test]
    fn order_control_defaults_and_unknown_values() {
        let mut order = OrderControl::standard();
        assert_eq!(order.value(), "default");
        assert!(order.select("closeness"));
        assert_eq!(order.value(), "closeness");
        assert!(!order.select("katz"));
        assert_eq!(order.value(), "default");
    }

    #[test]
    fn check_mode_ignores_unknown_or_absent_modes() {
        let mut form = SearchForm::standard();
        assert!(form.check_mode("graph"));
        assert_eq!(form.selected_mode(), Mode::Graph);
        assert!(!form.check_mode("semantic"));
        assert_eq!(form.selected_mode(), Mode::Graph);

        form.modes.retain(|radio| radio.mode != Mode::Regex);
        assert!(!form.check_mode("regex"));
        assert_eq!(form.selected_mode(), Mode::Graph);
    }

    #[test]
    fn selected_order_without_control_is_default() {
        let mut form = SearchForm::standard();
        form.order = None;
        assert_eq!(form.selected_order(), "default");
    }

    #[test]
    fn render_page_reflects_form_and_banners() {
        let mut page = page();
        page.form.query = "white <whale>".to_string();
        page.form.check_mode("graph");
        page.form.order.as_mut().unwrap().select("pagerank");
        page.error = Some("Bad Gateway".to_string());
        let html = render_page(&page).unwrap();
        assert!(html.contains(r#"value="white &lt;whale&gt;""#));
        assert!(html.contains(r#"value="graph" checked"#));
        assert!(html.contains(r#"value="pagerank" selected"#));
        assert!(html.contains(r#"data-error>Bad Gateway</div>"#));
        assert!(html.contains(r#"data-api-base="http:"#));
        assert!(html.contains(RECOMMENDATION_PROMPT));
        assert!(html.contains(r#"class="alert alert-danger" data-error"#));
    }

    #[test]
    fn render_page_hides_order_wrapper_when_invisible() {
        let mut page = page();
        page.form.order.as_mut().unwrap().visible = false;
        let html = render_page(&page).unwrap();
        assert!(html.contains(r#"<div data-order-wrapper class="d-none">"#));
    }
}
