//! Search index derived from stored records.
//!
//! This module provides:
//! - [`SearchIndex`] - per-record text entries plus lookup tables
//! - [`TextQuery`] - parsed full-text query
//!
//! The index is never persisted. It is rebuilt from records when a store is
//! opened and updated inside the same write as each record, so an entry
//! exists exactly when its record does.
//!
//! # Query syntax
//!
//! Terms are lowercased and split on non-alphanumeric characters, like the
//! indexed text. Terms separated by whitespace must all match; `OR` between
//! terms starts an alternative group; a trailing `*` makes a term a prefix
//! match. `"apply OR destroy*"` matches records containing `apply` or any
//! token starting with `destroy`.

use std::collections::{BTreeMap, HashMap, HashSet};

use crate::error::{LogError, Result};
use crate::types::LogId;

/// Keyword separating alternative term groups.
const OR_KEYWORD: &str = "OR";

/// Text copied from a record at creation time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexEntry {
    /// The record's summary.
    pub summary: String,
    /// The record's sanitized raw payload.
    pub raw_payload: String,
}

/// One search term.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Term {
    /// Lowercased token text.
    pub text: String,
    /// Whether any token starting with `text` matches.
    pub prefix: bool,
}

/// A parsed text query: a disjunction of conjunctions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextQuery {
    groups: Vec<Vec<Term>>,
}

impl TextQuery {
    /// Parses a query string.
    ///
    /// # Errors
    ///
    /// Returns [`LogError::InvalidQuery`] if the query has no searchable terms.
    pub fn parse(query: &str) -> Result<Self> {
        let mut groups = Vec::new();
        let mut current: Vec<Term> = Vec::new();

        for word in query.split_whitespace() {
            if word == OR_KEYWORD {
                if !current.is_empty() {
                    groups.push(std::mem::take(&mut current));
                }
                continue;
            }

            let prefix = word.ends_with('*');
            let tokens = tokenize(word.trim_end_matches('*'));
            let last = tokens.len().saturating_sub(1);
            current.extend(tokens.into_iter().enumerate().map(|(i, text)| Term {
                text,
                prefix: prefix && i == last,
            }));
        }
        if !current.is_empty() {
            groups.push(current);
        }

        if groups.is_empty() {
            return Err(LogError::InvalidQuery(format!(
                "text query '{query}' has no searchable terms"
            )));
        }
        Ok(Self { groups })
    }

    /// Returns the alternative term groups.
    #[must_use]
    pub fn groups(&self) -> &[Vec<Term>] {
        &self.groups
    }
}

/// Text and attribute index over stored records.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct SearchIndex {
    /// Text copies, one per record.
    entries: HashMap<LogId, IndexEntry>,
    /// Inverted index, ordered so prefix terms can range-scan.
    by_token: BTreeMap<String, HashSet<LogId>>,
    /// Record IDs by level, in insertion order.
    by_level: HashMap<String, Vec<LogId>>,
    /// Record IDs by correlation id, in insertion order.
    by_correlation: HashMap<String, Vec<LogId>>,
}

impl SearchIndex {
    /// Creates a new empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Indexes a record's text and attributes.
    pub fn insert(
        &mut self,
        id: LogId,
        level: &str,
        correlation_id: Option<&str>,
        summary: &str,
        raw_payload: &str,
    ) {
        for token in tokenize(summary).into_iter().chain(tokenize(raw_payload)) {
            self.by_token.entry(token).or_default().insert(id);
        }

        self.by_level.entry(level.to_string()).or_default().push(id);

        if let Some(correlation_id) = correlation_id {
            self.by_correlation
                .entry(correlation_id.to_string())
                .or_default()
                .push(id);
        }

        self.entries.insert(
            id,
            IndexEntry {
                summary: summary.to_string(),
                raw_payload: raw_payload.to_string(),
            },
        );
    }

    /// Returns the entry for a record.
    #[must_use]
    pub fn entry(&self, id: LogId) -> Option<&IndexEntry> {
        self.entries.get(&id)
    }

    /// Returns true if the record is indexed.
    #[must_use]
    pub fn contains(&self, id: LogId) -> bool {
        self.entries.contains_key(&id)
    }

    /// Returns the IDs of all records with the given level.
    #[must_use]
    pub fn by_level(&self, level: &str) -> &[LogId] {
        self.by_level.get(level).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Returns the IDs of all records with the given correlation id.
    #[must_use]
    pub fn by_correlation(&self, correlation_id: &str) -> &[LogId] {
        self.by_correlation
            .get(correlation_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Returns the IDs of records matching a text query.
    #[must_use]
    pub fn search(&self, query: &TextQuery) -> HashSet<LogId> {
        let mut result = HashSet::new();
        for group in query.groups() {
            result.extend(self.match_all(group));
        }
        result
    }

    /// Returns the number of indexed records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the index is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn match_all(&self, terms: &[Term]) -> HashSet<LogId> {
        let mut result: Option<HashSet<LogId>> = None;

        for term in terms {
            let ids = self.postings(term);
            result = match result {
                None => Some(ids),
                Some(current) => Some(current.intersection(&ids).copied().collect()),
            };
            if result.as_ref().is_some_and(HashSet::is_empty) {
                break;
            }
        }

        result.unwrap_or_default()
    }

    fn postings(&self, term: &Term) -> HashSet<LogId> {
        if !term.prefix {
            return self.by_token.get(&term.text).cloned().unwrap_or_default();
        }
        self.by_token
            .range(term.text.clone()..)
            .take_while(|(token, _)| token.starts_with(&term.text))
            .flat_map(|(_, ids)| ids.iter().copied())
            .collect()
    }
}

/// Splits text into lowercase alphanumeric tokens.
#[must_use]
pub fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build() -> SearchIndex {
        let mut index = SearchIndex::new();
        index.insert(LogId(1), "INFO", Some("abc"), "connection established", r#"{"msg":"connection established"}"#);
        index.insert(LogId(2), "ERROR", Some("abc"), "connection failed", r#"{"msg":"connection failed","code":503}"#);
        index.insert(LogId(3), "INFO", None, "shutdown complete", r#"{"msg":"shutdown complete","provider":"aws"}"#);
        index
    }

    fn search(index: &SearchIndex, q: &str) -> Vec<u64> {
        let query = TextQuery::parse(q).expect("valid query");
        let mut ids: Vec<u64> = index.search(&query).into_iter().map(|id| id.0).collect();
        ids.sort_unstable();
        ids
    }

    #[test]
    fn single_term() {
        let index = build();
        assert_eq!(search(&index, "connection"), vec![1, 2]);
    }

    #[test]
    fn terms_are_conjunctive() {
        let index = build();
        assert_eq!(search(&index, "connection failed"), vec![2]);
        assert!(search(&index, "connection shutdown").is_empty());
    }

    #[test]
    fn or_groups_are_disjunctive() {
        let index = build();
        assert_eq!(search(&index, "failed OR shutdown"), vec![2, 3]);
        // lowercase "or" is an ordinary term
        assert!(search(&index, "failed or shutdown").is_empty());
    }

    #[test]
    fn prefix_terms() {
        let index = build();
        assert_eq!(search(&index, "conn*"), vec![1, 2]);
        assert_eq!(search(&index, "shut*"), vec![3]);
        assert!(search(&index, "conn").is_empty());
    }

    #[test]
    fn payload_keys_and_values_are_searchable() {
        let index = build();
        assert_eq!(search(&index, "provider"), vec![3]);
        assert_eq!(search(&index, "503"), vec![2]);
    }

    #[test]
    fn case_insensitive_and_punctuation_split() {
        let index = build();
        assert_eq!(search(&index, "CONNECTION"), vec![1, 2]);
        assert_eq!(search(&index, "connection-failed"), vec![2]);
    }

    #[test]
    fn query_without_terms_is_rejected() {
        assert!(matches!(TextQuery::parse("  "), Err(LogError::InvalidQuery(_))));
        assert!(matches!(TextQuery::parse("!!! OR ***"), Err(LogError::InvalidQuery(_))));
    }

    #[test]
    fn parse_structure() {
        let query = TextQuery::parse("plan* OR apply done").expect("valid query");
        assert_eq!(query.groups().len(), 2);
        assert_eq!(
            query.groups()[0],
            vec![Term { text: "plan".into(), prefix: true }]
        );
        assert_eq!(query.groups()[1].len(), 2);
    }

    #[test]
    fn attribute_lookups() {
        let index = build();
        assert_eq!(index.by_level("INFO"), &[LogId(1), LogId(3)]);
        assert_eq!(index.by_level("WARN"), &[] as &[LogId]);
        assert_eq!(index.by_correlation("abc"), &[LogId(1), LogId(2)]);
    }

    #[test]
    fn entries_copy_record_text() {
        let index = build();
        assert_eq!(index.len(), 3);
        assert!(index.contains(LogId(2)));
        assert!(!index.contains(LogId(4)));
        let entry = index.entry(LogId(3)).map(|e| e.summary.as_str());
        assert_eq!(entry, Some("shutdown complete"));
    }

    #[test]
    fn tokenize_handles_special_characters() {
        let tokens = tokenize("error: connection-failed (timeout=30s)");
        assert_eq!(tokens, vec!["error", "connection", "failed", "timeout", "30s"]);
    }
}
