//! Facets derived from the current result set.
//!
//! Result sets are small (tens of hits), so values are recomputed on every
//! render instead of being indexed.

use crate::models::SearchHit;

/// Sentinel facet value that matches every hit.
pub const ALL: &str = "all";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Facet {
    Source,
    Type,
}

impl Facet {
    pub fn key(&self) -> &'static str {
        match self {
            Facet::Source => "source",
            Facet::Type => "type",
        }
    }
}

/// `["all", v1, v2, ...]` with distinct values in first-seen order.
pub fn facet_values(hits: &[SearchHit], facet: Facet) -> Vec<String> {
    let mut values = vec![ALL.to_string()];
    for hit in hits {
        if let Some(v) = hit.field(facet.key()) {
            if !values.iter().any(|seen| seen.as_str() == v.as_ref()) {
                values.push(v.into_owned());
            }
        }
    }
    values
}

pub fn matches_facet(hit: &SearchHit, facet: Facet, selected: &str) -> bool {
    selected == ALL || hit.field(facet.key()).is_some_and(|v| v == selected)
}

pub fn filter_hits<'a>(hits: &'a [SearchHit], source: &str, kind: &str) -> Vec<&'a SearchHit> {
    hits.iter()
        .filter(|h| matches_facet(h, Facet::Source, source) && matches_facet(h, Facet::Type, kind))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::HitId;
    use serde_json::json;

    fn hits() -> Vec<SearchHit> {
        serde_json::from_value(json!([
            {"id": 1, "score": 0.9, "payload": {"source": "a", "type": "x"}},
            {"id": 2, "score": 0.4, "payload": {"source": "b", "type": "x"}}
        ]))
        .unwrap()
    }

    #[test]
    fn test_source_facets_first_seen_order() {
        assert_eq!(facet_values(&hits(), Facet::Source), vec!["all", "a", "b"]);
        assert_eq!(facet_values(&hits(), Facet::Type), vec!["all", "x"]);
    }

    #[test]
    fn test_filter_by_source() {
        let hits = hits();
        let filtered = filter_hits(&hits, "a", ALL);
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].id, HitId::Int(1));
    }

    #[test]
    fn test_all_all_keeps_everything() {
        let hits = hits();
        assert_eq!(filter_hits(&hits, ALL, ALL).len(), 2);
        assert!(filter_hits(&hits, "b", "y").is_empty());
    }

    #[test]
    fn test_missing_payload_only_matches_all() {
        let hits: Vec<SearchHit> = serde_json::from_value(json!([{"id": "n", "score": 0.1}])).unwrap();
        assert_eq!(facet_values(&hits, Facet::Source), vec!["all"]);
        assert_eq!(filter_hits(&hits, ALL, ALL).len(), 1);
        assert!(filter_hits(&hits, "a", ALL).is_empty());
    }
}
