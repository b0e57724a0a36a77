use tracing::{info, warn};

use crate::interactions::ScoreMap;

/// Partner ids picked from a score map, strongest first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub ids: Vec<String>,
    pub requested: usize,
}

impl Selection {
    /// Fewer partners exist than were asked for.
    pub fn is_short(&self) -> bool {
        self.ids.len() < self.requested
    }
}

/// Picks the `n` highest-scoring account ids.
///
/// Sorting is stable, so equal scores keep the map's first-insertion order and
/// the same map always produces the same selection.
pub fn select_top_partners(scores: &ScoreMap, n: usize) -> Selection {
    let mut ranked: Vec<(&str, u64)> = scores.iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1));

    let ids: Vec<String> = ranked
        .into_iter()
        .take(n)
        .map(|(id, _)| id.to_string())
        .collect();

    let selection = Selection { ids, requested: n };
    if selection.is_short() {
        warn!(
            requested = n,
            available = selection.ids.len(),
            "Fewer partners than requested"
        );
    } else {
        info!(selected = selection.ids.len(), "Selected top partners");
    }
    selection
}
