use std::collections::BTreeMap;
use std::sync::RwLock;

const MIN_PARTIAL_CHARS: usize = 2;
const MAX_TRACKED_QUERIES: usize = 10_000;

/// Popularity-weighted query completion store.
///
/// Every submitted search bumps its query's score; predictions are the
/// prefix matches of the partial input ordered by score. The store is
/// bounded: once full, recording a new query evicts the lowest-scored
/// entry.
pub struct QueryPredictor {
    scores: RwLock<BTreeMap<String, f64>>,
}

impl QueryPredictor {
    pub fn new() -> Self {
        Self {
            scores: RwLock::new(BTreeMap::new()),
        }
    }

    /// Return up to `limit` completions for `partial_query`, most
    /// popular first. Inputs shorter than two characters yield no
    /// predictions.
    pub fn predict(&self, partial_query: &str, limit: usize) -> Vec<String> {
        let partial = partial_query.trim().to_lowercase();
        if partial.chars().count() < MIN_PARTIAL_CHARS {
            return Vec::new();
        }

        let scores = self
            .scores
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut matches: Vec<(String, f64)> = scores
            .range(partial.clone()..)
            .take_while(|(query, _)| query.starts_with(&partial))
            .map(|(query, score)| (query.clone(), *score))
            .collect();

        matches.sort_by(|left, right| right.1.total_cmp(&left.1));
        matches
            .into_iter()
            .take(limit)
            .map(|(query, _)| query)
            .collect()
    }

    /// Record a submitted search query.
    pub fn record(&self, query: &str) {
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return;
        }

        let mut scores = self
            .scores
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *scores.entry(query).or_insert(0.0) += 1.0;

        if scores.len() > MAX_TRACKED_QUERIES {
            let lowest = scores
                .iter()
                .min_by(|left, right| left.1.total_cmp(right.1))
                .map(|(query, _)| query.clone());
            if let Some(query) = lowest {
                scores.remove(&query);
            }
        }
    }
}

impl Default for QueryPredictor {
    fn default() -> Self {
        Self::new()
    }
}
