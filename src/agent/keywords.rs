//! Keyword → category tables used for routing and action suggestions.

use serde::{Deserialize, Serialize};

/// How a keyword is matched against input text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMode {
    /// Keyword may occur anywhere, including inside a longer word
    /// (`"addition"` matches `"add"`).
    #[default]
    Substring,
    /// Keyword must equal a whole alphanumeric token.
    Word,
}

/// An ordered table of lowercase keywords, each mapped to a category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeywordTable<C> {
    entries: Vec<(String, C)>,
    mode: MatchMode,
}

impl<C: Copy + PartialEq> KeywordTable<C> {
    pub fn new<I, S>(entries: I, mode: MatchMode) -> Self
    where
        I: IntoIterator<Item = (S, C)>,
        S: AsRef<str>,
    {
        let entries = entries
            .into_iter()
            .map(|(keyword, category)| (keyword.as_ref().trim().to_lowercase(), category))
            .filter(|(keyword, _)| !keyword.is_empty())
            .collect();
        Self { entries, mode }
    }

    pub fn mode(&self) -> MatchMode {
        self.mode
    }

    pub fn keywords(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn hit(&self, haystack: &str, tokens: &[&str], keyword: &str) -> bool {
        match self.mode {
            MatchMode::Substring => haystack.contains(keyword),
            MatchMode::Word => tokens.contains(&keyword),
        }
    }

    /// First keyword (in table order) found in `text`, with its category.
    pub fn first_match(&self, text: &str) -> Option<(&str, C)> {
        let haystack = text.to_lowercase();
        let tokens = tokenize(&haystack);
        self.entries
            .iter()
            .find(|(keyword, _)| self.hit(&haystack, &tokens, keyword))
            .map(|(keyword, category)| (keyword.as_str(), *category))
    }

    /// Every matched category, deduplicated, in table order.
    pub fn categories(&self, text: &str) -> Vec<C> {
        let haystack = text.to_lowercase();
        let tokens = tokenize(&haystack);
        let mut found = Vec::new();
        for (keyword, category) in &self.entries {
            if !found.contains(category) && self.hit(&haystack, &tokens, keyword) {
                found.push(*category);
            }
        }
        found
    }
}

fn tokenize(text: &str) -> Vec<&str> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .collect()
}
