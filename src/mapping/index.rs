use crate::error::Result;
use crate::types::Record;
use serde::{Deserialize, Serialize};

/// Remote index settings the mapping layer is allowed to manage, in the order
/// they are pushed.
pub const ALGOLIA_SETTINGS_KEYS: &[&str] = &[
    "minWordSizefor1Typo",
    "minWordSizefor2Typos",
    "hitsPerPage",
    "attributesToIndex",
    "searchableAttributes",
    "attributesToRetrieve",
    "unretrievableAttributes",
    "numericAttributesForFiltering",
    "optionalWords",
    "attributesForFaceting",
    "attributesToSnippet",
    "attributesToHighlight",
    "attributeForDistinct",
    "ranking",
    "customRanking",
    "separatorsToIndex",
    "removeWordsIfNoResults",
    "queryType",
    "highlightPreTag",
    "highlightPostTag",
    "slaves",
    "replicas",
    "synonyms",
];

/// Keys that only matter client-side and are never sent to the remote index.
const INTERNAL_KEYS: &[&str] = &["algoliaName", "perEnvironment", "autoIndex"];

fn default_true() -> bool {
    true
}

/// Allow-listed remote settings declared for an index.
///
/// Deserialization silently drops any key outside [`ALGOLIA_SETTINGS_KEYS`];
/// unset keys are omitted when serialized.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndexSettings {
    #[serde(rename = "minWordSizefor1Typo", skip_serializing_if = "Option::is_none")]
    pub min_word_size_for_1_typo: Option<u32>,

    #[serde(rename = "minWordSizefor2Typos", skip_serializing_if = "Option::is_none")]
    pub min_word_size_for_2_typos: Option<u32>,

    #[serde(rename = "hitsPerPage", skip_serializing_if = "Option::is_none")]
    pub hits_per_page: Option<u32>,

    #[serde(rename = "attributesToIndex", skip_serializing_if = "Option::is_none")]
    pub attributes_to_index: Option<Vec<String>>,

    #[serde(rename = "searchableAttributes", skip_serializing_if = "Option::is_none")]
    pub searchable_attributes: Option<Vec<String>>,

    #[serde(rename = "attributesToRetrieve", skip_serializing_if = "Option::is_none")]
    pub attributes_to_retrieve: Option<serde_json::Value>,

    #[serde(rename = "unretrievableAttributes", skip_serializing_if = "Option::is_none")]
    pub unretrievable_attributes: Option<Vec<String>>,

    #[serde(
        rename = "numericAttributesForFiltering",
        skip_serializing_if = "Option::is_none"
    )]
    pub numeric_attributes_for_filtering: Option<Vec<String>>,

    /// A list of words, or one space-separated string.
    #[serde(rename = "optionalWords", skip_serializing_if = "Option::is_none")]
    pub optional_words: Option<serde_json::Value>,

    #[serde(rename = "attributesForFaceting", skip_serializing_if = "Option::is_none")]
    pub attributes_for_faceting: Option<Vec<String>>,

    #[serde(rename = "attributesToSnippet", skip_serializing_if = "Option::is_none")]
    pub attributes_to_snippet: Option<serde_json::Value>,

    #[serde(rename = "attributesToHighlight", skip_serializing_if = "Option::is_none")]
    pub attributes_to_highlight: Option<serde_json::Value>,

    #[serde(rename = "attributeForDistinct", skip_serializing_if = "Option::is_none")]
    pub attribute_for_distinct: Option<String>,

    #[serde(rename = "ranking", skip_serializing_if = "Option::is_none")]
    pub ranking: Option<Vec<String>>,

    #[serde(rename = "customRanking", skip_serializing_if = "Option::is_none")]
    pub custom_ranking: Option<Vec<String>>,

    #[serde(rename = "separatorsToIndex", skip_serializing_if = "Option::is_none")]
    pub separators_to_index: Option<String>,

    #[serde(rename = "removeWordsIfNoResults", skip_serializing_if = "Option::is_none")]
    pub remove_words_if_no_results: Option<String>,

    #[serde(rename = "queryType", skip_serializing_if = "Option::is_none")]
    pub query_type: Option<String>,

    #[serde(rename = "highlightPreTag", skip_serializing_if = "Option::is_none")]
    pub highlight_pre_tag: Option<String>,

    #[serde(rename = "highlightPostTag", skip_serializing_if = "Option::is_none")]
    pub highlight_post_tag: Option<String>,

    #[serde(rename = "slaves", skip_serializing_if = "Option::is_none")]
    pub slaves: Option<Vec<String>>,

    #[serde(rename = "replicas", skip_serializing_if = "Option::is_none")]
    pub replicas: Option<Vec<String>>,

    #[serde(rename = "synonyms", skip_serializing_if = "Option::is_none")]
    pub synonyms: Option<serde_json::Value>,
}

impl IndexSettings {
    pub fn from_map(map: &Record) -> Result<Self> {
        Ok(serde_json::from_value(serde_json::Value::Object(map.clone()))?)
    }

    /// The declared settings as sent to the remote index.
    pub fn to_map(&self) -> Record {
        match serde_json::to_value(self) {
            Ok(serde_json::Value::Object(map)) => map,
            _ => Record::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.to_map().is_empty()
    }
}

/// Target index of an entity class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Index {
    #[serde(rename = "algoliaName", default)]
    pub name: String,

    /// Suffix the index name with the deployment environment.
    #[serde(rename = "perEnvironment", default = "default_true")]
    pub per_environment: bool,

    /// Sync store-level changes automatically. When false the class is only
    /// indexed through the manual indexer.
    #[serde(rename = "autoIndex", default = "default_true")]
    pub auto_index: bool,

    #[serde(flatten)]
    pub settings: IndexSettings,
}

impl Index {
    pub fn new(name: impl Into<String>) -> Self {
        Index {
            name: name.into(),
            per_environment: true,
            auto_index: true,
            settings: IndexSettings::default(),
        }
    }

    /// Index named after the last segment of a class path
    /// (`app::model::Article` → `Article`).
    pub fn for_class(class: &str) -> Self {
        Self::new(short_class_name(class))
    }

    pub fn per_environment(mut self, per_environment: bool) -> Self {
        self.per_environment = per_environment;
        self
    }

    pub fn auto_index(mut self, auto_index: bool) -> Self {
        self.auto_index = auto_index;
        self
    }

    pub fn with_settings(mut self, settings: IndexSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Overlay recognised keys from a loose settings map. Unknown keys are
    /// ignored.
    pub fn update_from_map(&mut self, map: &Record) -> Result<()> {
        let mut current = match serde_json::to_value(&*self)? {
            serde_json::Value::Object(m) => m,
            _ => Record::new(),
        };
        for (key, value) in map {
            if INTERNAL_KEYS.contains(&key.as_str())
                || ALGOLIA_SETTINGS_KEYS.contains(&key.as_str())
            {
                current.insert(key.clone(), value.clone());
            }
        }
        *self = serde_json::from_value(serde_json::Value::Object(current))?;
        Ok(())
    }

    pub fn algolia_settings(&self) -> Record {
        self.settings.to_map()
    }
}

pub fn short_class_name(class: &str) -> &str {
    let after_colons = class.rsplit("::").next().unwrap_or(class);
    after_colons.rsplit('\\').next().unwrap_or(after_colons)
}
