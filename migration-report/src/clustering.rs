//! Serial clustering
//!
//! Runs once per batch after ingestion, over fully populated stores:
//! 1. Child linking: every serial record gets its title's accumulated
//!    document ids in `_migration.children`.
//! 2. Pairwise similarity: every unordered pair of distinct titles is
//!    checked for a shared ISSN, then for a fuzzy title match.
//!
//! The pairwise pass is quadratic in the number of serial titles. That is
//! fine for one migration run's serial population; larger corpora hit this
//! as a known scaling limit.
//!
//! Thresholds:
//! - ratio ≥ 95 and < 100: similar title
//! - ratio 100: identical text, never reported (titles are store keys)

use crate::error::{ReportError, Result};
use crate::records::RecordStore;
use crate::stats::{SerialStats, Similarity, StatsStore};
use serde_json::Value;
use tracing::{debug, info, warn};

/// Lowest title ratio reported as a probable duplicate
pub const SIMILAR_TITLE_MIN_RATIO: u8 = 95;

/// Ratio of identical strings
pub const IDENTICAL_RATIO: u8 = 100;

/// Title count above which the quadratic pass gets a warning
const LARGE_TITLE_SET: usize = 20_000;

/// Edit-distance similarity of two titles on a 0..=100 scale
///
/// Normalized Levenshtein similarity scaled to 100 and rounded to the
/// nearest integer.
pub fn title_ratio(a: &str, b: &str) -> u8 {
    (strsim::normalized_levenshtein(a, b) * 100.0).round() as u8
}

/// True iff both entries have an ISSN and the ISSNs are equal
pub fn same_issn(a: &SerialStats, b: &SerialStats) -> bool {
    matches!((&a.issn, &b.issn), (Some(x), Some(y)) if x == y)
}

/// Pair of titles found related by the pairwise pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimilarPair {
    pub first: String,
    pub second: String,
    pub kind: Similarity,
}

/// Decides whether two serial titles are probable duplicates
#[derive(Debug, Clone)]
pub struct TitleMatcher {
    /// Lowest ratio reported as similar (inclusive)
    min_ratio: u8,
}

impl Default for TitleMatcher {
    fn default() -> Self {
        Self {
            min_ratio: SIMILAR_TITLE_MIN_RATIO,
        }
    }
}

impl TitleMatcher {
    /// Compare two distinct titles and their entries
    ///
    /// ISSN equality takes precedence; the title ratio is only computed when
    /// the ISSNs do not match.
    pub fn compare(
        &self,
        title_a: &str,
        a: &SerialStats,
        title_b: &str,
        b: &SerialStats,
    ) -> Option<Similarity> {
        if same_issn(a, b) {
            return Some(Similarity::SameIssn);
        }
        let ratio = title_ratio(title_a, title_b);
        if ratio >= self.min_ratio && ratio < IDENTICAL_RATIO {
            return Some(Similarity::SimilarTitle);
        }
        None
    }

    /// All related pairs, each unordered pair considered exactly once
    pub fn find_pairs(&self, stats: &StatsStore<SerialStats>) -> Vec<SimilarPair> {
        let entries: Vec<(&String, &SerialStats)> = stats.iter().collect();
        if entries.len() > LARGE_TITLE_SET {
            warn!(
                titles = entries.len(),
                "Large serial population, pairwise title matching is quadratic"
            );
        }

        let mut pairs = Vec::new();
        for i in 0..entries.len() {
            for j in (i + 1)..entries.len() {
                let (title_a, a) = entries[i];
                let (title_b, b) = entries[j];
                if let Some(kind) = self.compare(title_a, a, title_b, b) {
                    debug!(first = %title_a, second = %title_b, ?kind, "Similar serials");
                    pairs.push(SimilarPair {
                        first: title_a.clone(),
                        second: title_b.clone(),
                        kind,
                    });
                }
            }
        }
        pairs
    }
}

/// Copy each serial title's document list into its record's `_migration.children`
///
/// Records whose identity is not a serial title belong to the document
/// variant sharing the records file and are left alone. Returns the number
/// of records linked.
///
/// # Errors
/// [`ReportError::Precondition`] when a serial record has no `_migration`
/// object.
pub fn link_children(records: &mut RecordStore, stats: &StatsStore<SerialStats>) -> Result<usize> {
    let mut linked = 0;
    for (title, record) in records.iter_mut() {
        let Some(entry) = stats.get(title) else {
            continue;
        };
        let children = serde_json::to_value(&entry.documents)?;
        match record.get_mut("_migration") {
            Some(Value::Object(migration)) => {
                migration.insert("children".to_string(), children);
                linked += 1;
            }
            _ => {
                return Err(ReportError::Precondition(format!(
                    "serial record '{}' has no _migration object",
                    title
                )));
            }
        }
    }
    Ok(linked)
}

/// Record every pair found by `matcher` on both sides
///
/// Returns the number of relations newly recorded. Pairs already recorded
/// by an earlier run are not duplicated.
pub fn match_similar(stats: &mut StatsStore<SerialStats>, matcher: &TitleMatcher) -> usize {
    let pairs = matcher.find_pairs(stats);
    let mut added = 0;
    for pair in &pairs {
        if let Some(entry) = stats.get_mut(&pair.first) {
            if entry.similars.add(pair.kind, &pair.second) {
                added += 1;
            }
        }
        if let Some(entry) = stats.get_mut(&pair.second) {
            entry.similars.add(pair.kind, &pair.first);
        }
    }
    added
}

/// Outcome of one clustering pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClusterReport {
    pub titles: usize,
    pub linked_records: usize,
    pub new_relations: usize,
}

/// Run child linking then pairwise matching
pub fn cluster(
    records: &mut RecordStore,
    stats: &mut StatsStore<SerialStats>,
    matcher: &TitleMatcher,
) -> Result<ClusterReport> {
    let linked_records = link_children(records, stats)?;
    let new_relations = match_similar(stats, matcher);
    let report = ClusterReport {
        titles: stats.len(),
        linked_records,
        new_relations,
    };
    info!(
        titles = report.titles,
        linked = report.linked_records,
        relations = report.new_relations,
        "Serial clustering complete"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RecordId;
    use serde_json::json;

    fn serial_store(entries: &[(&str, Option<&str>)]) -> StatsStore<SerialStats> {
        let mut store = StatsStore::new();
        for (title, issn) in entries {
            store.register_with(title, || {
                SerialStats::new(*title, issn.map(|s| s.to_string()))
            });
        }
        store
    }

    #[test]
    fn test_title_ratio_scale() {
        assert_eq!(title_ratio("Physics Letters", "Physics Letters"), 100);
        assert_eq!(title_ratio("abc", "xyz"), 0);
        // 1 edit over 20 characters
        assert_eq!(title_ratio("abcdefghijklmnopqrst", "abcdefghijklmnopqrsX"), 95);
        // 1 edit over 10 characters
        assert_eq!(title_ratio("abcdefghij", "abcdefghiX"), 90);
    }

    #[test]
    fn test_same_issn_requires_both_present() {
        let a = SerialStats::new("A", Some("1234-5678".into()));
        let b = SerialStats::new("B", Some("1234-5678".into()));
        let c = SerialStats::new("C", None);
        let d = SerialStats::new("D", None);

        assert!(same_issn(&a, &b));
        assert!(!same_issn(&a, &c));
        assert!(!same_issn(&c, &d));
    }

    #[test]
    fn test_ratio_95_is_flagged() {
        let mut stats = serial_store(&[
            ("abcdefghijklmnopqrst", None),
            ("abcdefghijklmnopqrsX", None),
        ]);

        let added = match_similar(&mut stats, &TitleMatcher::default());

        assert_eq!(added, 1);
        let a = stats.get("abcdefghijklmnopqrst").unwrap();
        let b = stats.get("abcdefghijklmnopqrsX").unwrap();
        assert_eq!(a.similars.similar_title, vec!["abcdefghijklmnopqrsX"]);
        assert_eq!(b.similars.similar_title, vec!["abcdefghijklmnopqrst"]);
        assert!(a.similars.same_issn.is_empty());
    }

    #[test]
    fn test_ratio_below_band_not_flagged() {
        let mut stats = serial_store(&[("abcdefghij", None), ("abcdefghiX", None)]);

        assert_eq!(match_similar(&mut stats, &TitleMatcher::default()), 0);
        assert!(stats.get("abcdefghij").unwrap().similars.similar_title.is_empty());
    }

    #[test]
    fn test_ratio_rounding_to_100_not_flagged() {
        let long_a = "a".repeat(250);
        let long_b = format!("{}b", "a".repeat(249));
        assert_eq!(title_ratio(&long_a, &long_b), 100);

        let mut stats = serial_store(&[(long_a.as_str(), None), (long_b.as_str(), None)]);
        assert_eq!(match_similar(&mut stats, &TitleMatcher::default()), 0);
    }

    #[test]
    fn test_same_issn_takes_precedence() {
        let mut stats = serial_store(&[
            ("Physics Letters A", Some("0375-9601")),
            ("Physics Letters B", Some("0375-9601")),
        ]);

        match_similar(&mut stats, &TitleMatcher::default());

        let a = stats.get("Physics Letters A").unwrap();
        assert_eq!(a.similars.same_issn, vec!["Physics Letters B"]);
        assert!(a.similars.similar_title.is_empty());
        let b = stats.get("Physics Letters B").unwrap();
        assert_eq!(b.similars.same_issn, vec!["Physics Letters A"]);
    }

    #[test]
    fn test_relations_symmetric_and_never_self() {
        let mut stats = serial_store(&[
            ("Journal of Physics A", Some("0305-4470")),
            ("Journal of Physics B", Some("0305-4470")),
            ("Journal of Physics C", None),
            ("Annals of Physics", None),
        ]);

        match_similar(&mut stats, &TitleMatcher::default());

        for (title, entry) in stats.iter() {
            for kind in [Similarity::SameIssn, Similarity::SimilarTitle] {
                let list = match kind {
                    Similarity::SameIssn => &entry.similars.same_issn,
                    Similarity::SimilarTitle => &entry.similars.similar_title,
                };
                assert!(!list.contains(title), "{} lists itself", title);
                for other in list {
                    let partner = stats.get(other).unwrap();
                    let back = match kind {
                        Similarity::SameIssn => &partner.similars.same_issn,
                        Similarity::SimilarTitle => &partner.similars.similar_title,
                    };
                    assert!(
                        back.contains(title),
                        "{} -> {} is not symmetric",
                        title,
                        other
                    );
                }
            }
        }
    }

    #[test]
    fn test_match_similar_is_idempotent() {
        let mut stats = serial_store(&[("X", Some("1")), ("Y", Some("1"))]);

        assert_eq!(match_similar(&mut stats, &TitleMatcher::default()), 1);
        assert_eq!(match_similar(&mut stats, &TitleMatcher::default()), 0);
        assert_eq!(stats.get("X").unwrap().similars.same_issn, vec!["Y"]);
    }

    #[test]
    fn test_link_children() {
        let mut stats = serial_store(&[("Nuclear Physics B", None)]);
        let entry = stats.get_mut("Nuclear Physics B").unwrap();
        entry.add_document(RecordId::Number(11));
        entry.add_document(RecordId::Number(12));

        let mut records = RecordStore::new();
        records.put(
            "Nuclear Physics B",
            json!({"title": {"title": "Nuclear Physics B"}, "_migration": {"record_type": "serial"}}),
        );
        records.put("262146", json!({"recid": 262146}));

        let linked = link_children(&mut records, &stats).unwrap();

        assert_eq!(linked, 1);
        assert_eq!(
            records.get("Nuclear Physics B").unwrap()["_migration"]["children"],
            json!([11, 12])
        );
        assert_eq!(records.get("262146").unwrap(), &json!({"recid": 262146}));
    }

    #[test]
    fn test_link_children_requires_migration_object() {
        let stats = serial_store(&[("Broken", None)]);
        let mut records = RecordStore::new();
        records.put("Broken", json!({"title": {"title": "Broken"}}));

        assert!(matches!(
            link_children(&mut records, &stats),
            Err(ReportError::Precondition(_))
        ));
    }
}
