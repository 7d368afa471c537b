use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

// =============================================================================
// Enums
// =============================================================================

/// Which generation backend(s) answer recommendation requests.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelChoice {
    /// The primary backend only.
    #[serde(alias = "openai")]
    Primary,
    /// The secondary backend only (default for new sessions).
    #[default]
    #[serde(alias = "perplexity")]
    Secondary,
    /// Both backends, outputs merged.
    Hybrid,
}

impl fmt::Display for ModelChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelChoice::Primary => write!(f, "primary"),
            ModelChoice::Secondary => write!(f, "secondary"),
            ModelChoice::Hybrid => write!(f, "hybrid"),
        }
    }
}

impl std::str::FromStr for ModelChoice {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "primary" | "openai" => Ok(ModelChoice::Primary),
            "secondary" | "perplexity" => Ok(ModelChoice::Secondary),
            "hybrid" => Ok(ModelChoice::Hybrid),
            other => Err(format!(
                "Invalid model choice '{}'. Must be 'primary', 'secondary', or 'hybrid'",
                other
            )),
        }
    }
}

/// Conversation phase of a session.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    #[default]
    Initial,
    #[serde(rename = "analyzing")]
    AnalyzingQuery,
    Clarifying,
    #[serde(rename = "generating")]
    Querying,
    Recommending,
    Searching,
    Detailing,
    Ready,
    Error,
}

impl SessionState {
    pub const ALL: [SessionState; 9] = [
        SessionState::Initial,
        SessionState::AnalyzingQuery,
        SessionState::Clarifying,
        SessionState::Querying,
        SessionState::Recommending,
        SessionState::Searching,
        SessionState::Detailing,
        SessionState::Ready,
        SessionState::Error,
    ];
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Initial => write!(f, "initial"),
            SessionState::AnalyzingQuery => write!(f, "analyzing"),
            SessionState::Clarifying => write!(f, "clarifying"),
            SessionState::Querying => write!(f, "generating"),
            SessionState::Recommending => write!(f, "recommending"),
            SessionState::Searching => write!(f, "searching"),
            SessionState::Detailing => write!(f, "detailing"),
            SessionState::Ready => write!(f, "ready"),
            SessionState::Error => write!(f, "error"),
        }
    }
}

// =============================================================================
// Preferences
// =============================================================================

/// Category -> value preferences gathered across a conversation.
///
/// Keys are lowercased on every insert, so "Color" and "color" are the same
/// category and the later write wins.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "BTreeMap<String, serde_json::Value>", into = "BTreeMap<String, String>")]
pub struct Preferences(BTreeMap<String, String>);

impl Preferences {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a preference; blank keys or values are ignored.
    pub fn insert(&mut self, category: &str, value: impl Into<String>) {
        let key = normalize_category(category);
        let value = value.into().trim().to_string();
        if key.is_empty() || value.is_empty() {
            return;
        }
        self.0.insert(key, value);
    }

    /// Overlay `other` onto `self`; keys present in both take `other`'s value.
    pub fn merge(&mut self, other: &Preferences) {
        for (k, v) in &other.0 {
            self.0.insert(k.clone(), v.clone());
        }
    }

    pub fn get(&self, category: &str) -> Option<&str> {
        self.0.get(&normalize_category(category)).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Compact JSON object used when composing prompts.
    pub fn to_json(&self) -> String {
        serde_json::to_string(&self.0).unwrap_or_else(|_| "{}".to_string())
    }
}

impl From<BTreeMap<String, serde_json::Value>> for Preferences {
    fn from(raw: BTreeMap<String, serde_json::Value>) -> Self {
        let mut prefs = Preferences::new();
        for (k, v) in raw {
            match v {
                serde_json::Value::Null => {}
                serde_json::Value::String(s) => prefs.insert(&k, s),
                other => prefs.insert(&k, other.to_string()),
            }
        }
        prefs
    }
}

impl From<Preferences> for BTreeMap<String, String> {
    fn from(prefs: Preferences) -> Self {
        prefs.0
    }
}

impl<K: AsRef<str>, V: Into<String>> FromIterator<(K, V)> for Preferences {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut prefs = Preferences::new();
        for (k, v) in iter {
            prefs.insert(k.as_ref(), v);
        }
        prefs
    }
}

fn normalize_category(category: &str) -> String {
    category.trim().to_lowercase()
}

// =============================================================================
// Recommendations
// =============================================================================

/// One recommended product as produced by a generation backend.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub name: String,
    /// Kept verbatim: backends emit numbers or strings.
    #[serde(default)]
    pub price: serde_json::Value,
    #[serde(default)]
    pub features: Vec<String>,
    #[serde(default)]
    pub pros: Vec<String>,
    #[serde(default)]
    pub cons: Vec<String>,
    #[serde(default)]
    pub description: String,
    /// Backend label; only set by hybrid merging.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

/// The JSON object a recommendation request must yield.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RecommendationSet {
    #[serde(default)]
    pub overview: String,
    pub recommendations: Vec<Recommendation>,
}

// =============================================================================
// Product details
// =============================================================================

/// A purchase listing from the commerce search backend.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BuyLink {
    pub title: String,
    pub link: String,
    pub price: String,
    #[serde(rename = "imageUrl")]
    pub image_url: String,
}

/// One scraped review page.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SourceReview {
    pub title: String,
    pub link: String,
    pub snippet: String,
    pub content: String,
}

/// Review record synthesized from every scraped source plus the
/// recommendation's own pros and cons.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConsolidatedReview {
    pub title: String,
    pub link: String,
    pub snippet: String,
    /// All fetched texts joined by a blank line.
    pub content: String,
    pub summary: String,
    pub pros: Vec<String>,
    pub cons: Vec<String>,
    pub individual_reviews: Vec<SourceReview>,
}

/// Enrichment result for one recommended product.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProductDetail {
    pub name: String,
    pub buy_links: Vec<BuyLink>,
    /// Always exactly one consolidated entry.
    pub reviews: Vec<ConsolidatedReview>,
}

// =============================================================================
// Clarification
// =============================================================================

/// A follow-up question with suggested answers.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClarifyingQuestion {
    pub question: String,
    pub options: Vec<String>,
}
