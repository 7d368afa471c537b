//! Deterministic preference extraction from clarification answers.
//!
//! A fixed taxonomy of categories, each with a literal vocabulary. Only
//! categories the classifier reported as missing are tried.

use regex::Regex;

use shopmate_core::Preferences;

/// One category and the regex recognizing its values.
pub struct CategoryPattern {
    /// Matched as a substring of missing-info labels, and used as the preference key.
    pub category: &'static str,
    pub regex: Regex,
}

/// All category patterns, compiled once and reused.
pub struct PreferencePatterns {
    patterns: Vec<CategoryPattern>,
}

impl Default for PreferencePatterns {
    fn default() -> Self {
        Self::new()
    }
}

impl PreferencePatterns {
    pub fn new() -> Self {
        let definitions: [(&'static str, &str); 4] = [
            (
                "color",
                r"\b(white|black|blue|red|green|yellow|purple|gray|grey|brown|pink|orange)\b",
            ),
            (
                "size",
                r"\b(small|medium|large|xl|xxl|xs|s|m|l|extra large|extra small)\b|\b(size\s+\d+(?:\.\d+)?)\b",
            ),
            (
                "budget",
                r"\$\d+|\b\d+\s+dollars\b|\bunder\s+\$?\d+\b|\b\d+\s*-\s*\d+\b",
            ),
            (
                "brand",
                r"\b(nike|adidas|new balance|asics|brooks|hoka|puma|reebok|saucony|under armour)\b",
            ),
        ];

        let patterns = definitions
            .into_iter()
            .map(|(category, pat)| CategoryPattern {
                category,
                regex: Regex::new(pat).expect("Invalid preference regex"),
            })
            .collect();

        Self { patterns }
    }

    /// Extract preferences for the categories named in `missing_info`.
    ///
    /// The first match per category wins; its value is capitalized.
    pub fn extract(&self, message: &str, missing_info: &[String]) -> Preferences {
        let message = message.to_lowercase();
        let missing: Vec<String> = missing_info.iter().map(|m| m.to_lowercase()).collect();
        let mut found = Preferences::new();

        for pattern in &self.patterns {
            if !missing.iter().any(|m| m.contains(pattern.category)) {
                continue;
            }
            if let Some(value) = first_match(&pattern.regex, &message) {
                found.insert(pattern.category, capitalize(value));
            }
        }

        if !found.is_empty() {
            tracing::debug!(count = found.len(), "Pattern-extracted preferences");
        }
        found
    }
}

/// First non-empty capture group of the leftmost match, or the whole match
/// when the matching alternative has no groups.
fn first_match<'a>(regex: &Regex, text: &'a str) -> Option<&'a str> {
    let caps = regex.captures(text)?;
    if regex.captures_len() == 1 {
        return caps.get(0).map(|m| m.as_str());
    }
    caps.iter()
        .skip(1)
        .flatten()
        .map(|m| m.as_str())
        .find(|s| !s.is_empty())
}

/// Upper-case the first character, lower-case the rest.
fn capitalize(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn missing(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_extracts_color_size_budget() {
        let patterns = PreferencePatterns::new();
        let prefs = patterns.extract(
            "white, size 10, under $100",
            &missing(&["Color", "Shoe size", "Budget range"]),
        );
        assert_eq!(prefs.len(), 3);
        assert_eq!(prefs.get("color"), Some("White"));
        assert_eq!(prefs.get("size"), Some("Size 10"));
        assert_eq!(prefs.get("budget"), Some("Under $100"));
    }

    #[test]
    fn test_only_missing_categories_are_tried() {
        let patterns = PreferencePatterns::new();
        let prefs = patterns.extract("black nike, medium", &missing(&["color"]));
        assert_eq!(prefs.len(), 1);
        assert_eq!(prefs.get("color"), Some("Black"));
        assert_eq!(prefs.get("brand"), None);
    }

    #[test]
    fn test_first_match_wins() {
        let patterns = PreferencePatterns::new();
        let prefs = patterns.extract("Red or blue, whatever", &missing(&["color"]));
        assert_eq!(prefs.get("color"), Some("Red"));
    }

    #[test]
    fn test_multi_word_brand_capitalized() {
        let patterns = PreferencePatterns::new();
        let prefs = patterns.extract("Something from NEW BALANCE please", &missing(&["brand"]));
        assert_eq!(prefs.get("brand"), Some("New balance"));
    }

    #[test]
    fn test_budget_forms() {
        let patterns = PreferencePatterns::new();
        let m = missing(&["budget"]);
        assert_eq!(patterns.extract("around $80", &m).get("budget"), Some("$80"));
        assert_eq!(patterns.extract("50 dollars max", &m).get("budget"), Some("50 dollars"));
        assert_eq!(patterns.extract("100-150", &m).get("budget"), Some("100-150"));
    }

    #[test]
    fn test_size_letter_requires_word_boundary() {
        let patterns = PreferencePatterns::new();
        let m = missing(&["size"]);
        assert_eq!(patterns.extract("sneakers", &m).get("size"), None);
        assert_eq!(patterns.extract("an xl please", &m).get("size"), Some("Xl"));
    }

    #[test]
    fn test_no_match_is_empty() {
        let patterns = PreferencePatterns::new();
        let prefs = patterns.extract("not sure yet", &missing(&["color", "size", "budget", "brand"]));
        assert!(prefs.is_empty());
    }

    #[test]
    fn test_capitalize() {
        assert_eq!(capitalize("under $100"), "Under $100");
        assert_eq!(capitalize("XL"), "Xl");
        assert_eq!(capitalize(""), "");
    }
}
