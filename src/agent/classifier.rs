//! Read/write classification of user messages.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::keywords::{KeywordTable, MatchMode};
use super::traits::QueryClassifier;

/// Keywords that mark a message as a data-mutating request.
pub const DEFAULT_WRITE_KEYWORDS: [&str; 8] = [
    "insert", "update", "delete", "create", "drop", "alter", "add", "increase",
];

/// Whether a request reads or mutates data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryType {
    Read,
    Write,
}

impl QueryType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::Write => "write",
        }
    }
}

impl fmt::Display for QueryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classifies by keyword membership: any write keyword means `Write`,
/// otherwise `Read`.
#[derive(Debug, Clone)]
pub struct KeywordClassifier {
    table: KeywordTable<QueryType>,
}

impl KeywordClassifier {
    pub fn new<I, S>(write_keywords: I, mode: MatchMode) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let table = KeywordTable::new(
            write_keywords.into_iter().map(|k| (k, QueryType::Write)),
            mode,
        );
        Self { table }
    }
}

impl Default for KeywordClassifier {
    fn default() -> Self {
        Self::new(DEFAULT_WRITE_KEYWORDS, MatchMode::Substring)
    }
}

impl QueryClassifier for KeywordClassifier {
    fn classify(&self, query: &str) -> QueryType {
        match self.table.first_match(query) {
            Some((keyword, query_type)) => {
                tracing::debug!(keyword, mode = ?self.table.mode(), "write keyword matched");
                query_type
            }
            None => QueryType::Read,
        }
    }

    fn name(&self) -> &str {
        "keyword"
    }
}

/// Classify with the default keyword table.
pub fn classify(message: &str) -> QueryType {
    KeywordClassifier::default().classify(message)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_write_keyword_classifies_as_write() {
        for keyword in DEFAULT_WRITE_KEYWORDS {
            assert_eq!(classify(&format!("please {keyword} it")), QueryType::Write, "{keyword}");
            assert_eq!(
                classify(&keyword.to_uppercase()),
                QueryType::Write,
                "uppercase {keyword}"
            );
        }
    }

    #[test]
    fn forecast_example_is_write() {
        assert_eq!(
            classify("please add 10% to Comfortable Office Chair Asia Pacific Region for all months and save it to forecast version"),
            QueryType::Write
        );
    }

    #[test]
    fn plain_questions_are_read() {
        assert_eq!(classify("show me all users"), QueryType::Read);
        assert_eq!(classify("Get the count of active tasks"), QueryType::Read);
        assert_eq!(classify(""), QueryType::Read);
    }

    #[test]
    fn substring_matching_is_preserved_by_default() {
        assert_eq!(classify("what is the addition rule"), QueryType::Write);
        assert_eq!(classify("list recreated orders"), QueryType::Write);
    }

    #[test]
    fn word_mode_ignores_partial_words() {
        let classifier = KeywordClassifier::new(DEFAULT_WRITE_KEYWORDS, MatchMode::Word);
        assert_eq!(classifier.classify("what is the addition rule"), QueryType::Read);
        assert_eq!(classifier.classify("add a row"), QueryType::Write);
    }

    #[test]
    fn custom_keywords_replace_defaults() {
        let classifier = KeywordClassifier::new(["Upsert"], MatchMode::Substring);
        assert_eq!(classifier.classify("upsert the plan"), QueryType::Write);
        assert_eq!(classifier.classify("delete the plan"), QueryType::Read);
    }

    #[test]
    fn query_type_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&QueryType::Write).unwrap(), "\"write\"");
        assert_eq!(QueryType::Read.to_string(), "read");
    }
}
