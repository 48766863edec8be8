use crate::model::{DEFAULT_ORDER, Mode};
use crate::page::SearchForm;

pub const REGEX_TIP: &str = "Regex mode: accepts Django regex syntax, may impact performance.";
pub const GRAPH_TIP: &str = "Graph ranking: choose PageRank, Closeness, or Betweenness ordering.";
pub const SIMPLE_TIP: &str = "Keyword mode: default relevance ranking, switch metrics if needed.";

/// What a mode does to the order control and the tip line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModePolicy {
    pub order_visible: bool,
    pub forced_order: Option<&'static str>,
    pub tip: &'static str,
}

/// Indexed by `Mode as usize`.
pub const MODE_POLICIES: [ModePolicy; 3] = [
    // simple
    ModePolicy {
        order_visible: true,
        forced_order: None,
        tip: SIMPLE_TIP,
    },
    // regex
    ModePolicy {
        order_visible: false,
        forced_order: Some(DEFAULT_ORDER),
        tip: REGEX_TIP,
    },
    // graph
    ModePolicy {
        order_visible: true,
        forced_order: None,
        tip: GRAPH_TIP,
    },
];

pub fn policy(mode: Mode) -> &'static ModePolicy {
    &MODE_POLICIES[mode.index()]
}

/// Applies the policy for `mode` to the form. Pages without an order control
/// still get the tip.
pub fn apply_mode(form: &mut SearchForm, mode: Mode) {
    let policy = policy(mode);
    if let Some(order) = form.order.as_mut() {
        order.visible = policy.order_visible;
        if let Some(forced) = policy.forced_order {
            order.select(forced);
        }
    }
    form.mode_tip = policy.tip.to_string();
}
