//! Clarifying question generation and the clarification reply payload.

use serde::ser::{Serialize, Serializer};
use serde_json::{json, Map, Value};

use shopmate_core::ClarifyingQuestion;
use shopmate_providers::{CompletionRequest, GenerationBackend};

use crate::extract::parse_structured;

pub const QUESTION_SYSTEM: &str =
    "You are a shopping assistant that generates clarifying questions.";

const MAX_OPTIONS: usize = 4;

/// Category -> question, in the order the backend listed them.
///
/// Serializes as a JSON object whose key order is the insertion order, so
/// the client shows the most important question first.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct QuestionSet(Vec<(String, ClarifyingQuestion)>);

impl QuestionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a question, replacing an existing one for `category` in place.
    pub fn insert(&mut self, category: impl Into<String>, question: ClarifyingQuestion) {
        let category = category.into();
        match self.0.iter_mut().find(|(existing, _)| *existing == category) {
            Some((_, slot)) => *slot = question,
            None => self.0.push((category, question)),
        }
    }

    pub fn get(&self, category: &str) -> Option<&ClarifyingQuestion> {
        self.0
            .iter()
            .find(|(existing, _)| existing == category)
            .map(|(_, question)| question)
    }

    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(category, _)| category.as_str())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, ClarifyingQuestion)> for QuestionSet {
    fn from_iter<I: IntoIterator<Item = (String, ClarifyingQuestion)>>(iter: I) -> Self {
        let mut set = QuestionSet::new();
        for (category, question) in iter {
            set.insert(category, question);
        }
        set
    }
}

impl Serialize for QuestionSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.0.iter().map(|(category, question)| (category, question)))
    }
}

/// The catch-all question asked when nothing better is available.
pub fn default_questions() -> QuestionSet {
    let mut set = QuestionSet::new();
    set.insert(
        "Details".to_string(),
        ClarifyingQuestion {
            question: "Could you provide more details about what you're looking for?".to_string(),
            options: ["Budget option", "Mid-range", "Premium", "No preference"]
                .into_iter()
                .map(String::from)
                .collect(),
        },
    );
    set
}

/// Keep only well-formed entries: a non-empty question and at least one
/// string option. Options beyond four are dropped.
pub fn sanitize_questions(raw: Map<String, Value>) -> QuestionSet {
    raw.into_iter()
        .filter_map(|(category, entry)| {
            let question = entry.get("question")?.as_str()?.trim().to_string();
            let options: Vec<String> = entry
                .get("options")?
                .as_array()?
                .iter()
                .filter_map(Value::as_str)
                .map(str::trim)
                .filter(|o| !o.is_empty())
                .take(MAX_OPTIONS)
                .map(String::from)
                .collect();
            if category.trim().is_empty() || question.is_empty() || options.is_empty() {
                tracing::debug!(category = %category, "Skipping malformed clarifying question");
                return None;
            }
            Some((category, ClarifyingQuestion { question, options }))
        })
        .collect()
}

/// Ask `backend` for one question per missing category.
///
/// Never fails: an unusable reply yields [`default_questions`].
pub async fn generate_questions(
    backend: &dyn GenerationBackend,
    query: &str,
    missing_info: &[String],
) -> QuestionSet {
    let missing = if missing_info.is_empty() {
        "details".to_string()
    } else {
        missing_info.join(", ")
    };
    let prompt = format!(
        r#"For the shopping query: "{query}"

The following information is missing: {missing}

Generate clarifying questions that specifically address the missing information.
For each category of missing information, create:
1. A clear, concise question
2. 3-4 reasonable options as answers

Only generate questions for the missing information, not for already specified details.
Format your response as a JSON object where each key is a category of missing information.

Example format:
{{
  "Budget": {{
    "question": "What's your budget range for this purchase?",
    "options": ["Under $50", "$50-$100", "Over $100"]
  }},
  "Another Category": {{
    "question": "...",
    "options": ["...", "...", "..."]
  }}
}}"#
    );
    let request = CompletionRequest::new(QUESTION_SYSTEM, prompt);

    let questions = match backend.complete(&request).await {
        Ok(raw) => match parse_structured::<Map<String, Value>>(&raw) {
            Ok(entries) => sanitize_questions(entries),
            Err(e) => {
                tracing::warn!(backend = %backend.label(), error = %e, "Question reply unusable");
                QuestionSet::new()
            }
        },
        Err(e) => {
            tracing::warn!(backend = %backend.label(), error = %e, "Question generation failed");
            QuestionSet::new()
        }
    };

    if questions.is_empty() {
        default_questions()
    } else {
        tracing::info!(count = questions.len(), "Generated clarifying questions");
        questions
    }
}

/// JSON reply text sent to the client while clarifying.
pub fn clarification_reply(questions: &QuestionSet, reasoning: &str, confidence: f64) -> String {
    json!({
        "type": "clarification",
        "questions": questions,
        "reasoning": reasoning,
        "confidence": confidence,
    })
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedBackend;

    #[test]
    fn test_sanitize_skips_invalid_and_truncates() {
        let raw: Map<String, Value> = serde_json::from_value(json!({
            "Budget": {"question": "Budget?", "options": ["<50", "50-100", "100-150", "150-200", ">200"]},
            "Color": {"question": "", "options": ["Red"]},
            "Size": {"question": "Size?", "options": []},
            "Use": "not an object",
            "Style": {"question": "Style?", "options": ["Casual", 3, "Formal"]}
        }))
        .unwrap();

        let set = sanitize_questions(raw);
        assert_eq!(set.len(), 2);
        assert_eq!(set.get("Budget").unwrap().options.len(), 4);
        assert_eq!(set.get("Style").unwrap().options, vec!["Casual", "Formal"]);
        assert!(set.get("Color").is_none());
    }

    #[tokio::test]
    async fn test_generate_questions_from_backend() {
        let backend = ScriptedBackend::replying(
            "secondary",
            r#"Sure: {"Size": {"question": "What size?", "options": ["8", "9", "10"]}}"#,
        );
        let set = generate_questions(&backend, "running shoes", &["size".to_string()]).await;
        assert_eq!(set.len(), 1);
        assert_eq!(set.get("Size").unwrap().question, "What size?");

        let prompt = backend.calls()[0].user_prompt().unwrap().to_string();
        assert!(prompt.contains("The following information is missing: size"));
    }

    #[tokio::test]
    async fn test_questions_keep_backend_order() {
        let backend = ScriptedBackend::replying(
            "secondary",
            r#"{
                "Use case": {"question": "Where will you run?", "options": ["Road", "Trail"]},
                "Budget": {"question": "Budget?", "options": ["Under $100", "Over $100"]},
                "Color": {"question": "Color?", "options": ["White", "Black"]}
            }"#,
        );
        let missing = ["Use case", "Budget", "Color"].map(String::from);
        let set = generate_questions(&backend, "running shoes", &missing).await;
        assert_eq!(set.categories().collect::<Vec<_>>(), missing);

        let reply = clarification_reply(&set, "too vague", 0.4);
        let value: Value = serde_json::from_str(&reply).unwrap();
        let order: Vec<&String> = value["questions"].as_object().unwrap().keys().collect();
        assert_eq!(order, ["Use case", "Budget", "Color"]);
        assert!(reply.find("Use case").unwrap() < reply.find("Budget").unwrap());
    }

    #[test]
    fn test_insert_replaces_in_place() {
        let question = |text: &str| ClarifyingQuestion {
            question: text.to_string(),
            options: vec!["Any".to_string()],
        };
        let mut set = QuestionSet::new();
        set.insert("Size", question("Size?"));
        set.insert("Color", question("Color?"));
        set.insert("Size", question("Which size?"));
        assert_eq!(set.categories().collect::<Vec<_>>(), ["Size", "Color"]);
        assert_eq!(set.get("Size").unwrap().question, "Which size?");
    }

    #[tokio::test]
    async fn test_generate_questions_falls_back_to_default() {
        for backend in [
            ScriptedBackend::failing("secondary"),
            ScriptedBackend::replying("secondary", "no json here"),
            ScriptedBackend::replying("secondary", r#"{"Size": {"question": "?"}}"#),
        ] {
            let set = generate_questions(&backend, "shoes", &[]).await;
            assert_eq!(set, default_questions());
        }
    }

    #[test]
    fn test_clarification_reply_shape() {
        let reply = clarification_reply(&default_questions(), "too vague", 0.4);
        let value: Value = serde_json::from_str(&reply).unwrap();
        assert_eq!(value["type"], "clarification");
        assert_eq!(
            value["questions"]["Details"]["options"],
            json!(["Budget option", "Mid-range", "Premium", "No preference"])
        );
        assert_eq!(value["reasoning"], "too vague");
        assert_eq!(value["confidence"], 0.4);
    }
}
