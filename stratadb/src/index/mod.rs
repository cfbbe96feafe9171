//! Index configuration types and the descriptor handed to the storage
//! engine when an index build is executed.
//!
//! Index *execution* (scanning, matching) belongs to the storage/query
//! engine; this layer only manages names and configurations per collection.

/// Query language a set of index expressions is written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum QueryLanguage {
    Json,
    N1ql,
}

/// Configuration of a value index: one or more expressions, comma separated
/// in the N1QL form or a JSON array in the JSON form.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ValueIndexConfig {
    pub query_language: QueryLanguage,
    pub expressions: String,
}

impl ValueIndexConfig {
    pub fn new(query_language: QueryLanguage, expressions: &str) -> Self {
        ValueIndexConfig {
            query_language,
            expressions: expressions.to_string(),
        }
    }
}

/// Configuration of a full-text index.
///
/// `language` selects the text analyzer (ISO 639-1 code); `None` disables
/// language-specific stemming and stop words.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FullTextIndexConfig {
    pub query_language: QueryLanguage,
    pub expressions: String,
    pub language: Option<String>,
    pub ignore_accents: bool,
}

impl FullTextIndexConfig {
    pub fn new(query_language: QueryLanguage, expressions: &str) -> Self {
        FullTextIndexConfig {
            query_language,
            expressions: expressions.to_string(),
            language: None,
            ignore_accents: false,
        }
    }

    pub fn with_language(mut self, language: &str) -> Self {
        self.language = Some(language.to_string());
        self
    }

    pub fn with_ignore_accents(mut self, ignore_accents: bool) -> Self {
        self.ignore_accents = ignore_accents;
        self
    }
}

/// Either kind of index configuration. Two configurations are
/// "configuration-identical" exactly when they compare equal.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum IndexConfig {
    Value(ValueIndexConfig),
    FullText(FullTextIndexConfig),
}

/// Name plus configuration, as handed to the storage engine for an index
/// build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexDescriptor {
    pub name: String,
    pub config: IndexConfig,
}

impl IndexDescriptor {
    pub fn new(name: &str, config: IndexConfig) -> Self {
        IndexDescriptor {
            name: name.to_string(),
            config,
        }
    }
}
