pub mod attempt;
pub mod grader;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use attempt::{AnswerRecord, AttemptResult, AttemptSubmission, QuizAttempt};
pub use grader::{grade, Credit, Grade};

/// Question type tag as produced by the quiz generator.
/// Unknown tags are kept verbatim and graded like short answers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum QuestionType {
    Mcq,
    AssertionReason,
    Numerical,
    Short,
    Other(String),
}

impl QuestionType {
    pub fn as_str(&self) -> &str {
        match self {
            QuestionType::Mcq => "mcq",
            QuestionType::AssertionReason => "assertion_reason",
            QuestionType::Numerical => "numerical",
            QuestionType::Short => "short",
            QuestionType::Other(s) => s,
        }
    }
}

impl Default for QuestionType {
    fn default() -> Self {
        QuestionType::Other(String::new())
    }
}

impl From<&str> for QuestionType {
    fn from(tag: &str) -> Self {
        match tag {
            "mcq" => QuestionType::Mcq,
            "assertion_reason" => QuestionType::AssertionReason,
            "numerical" => QuestionType::Numerical,
            "short" => QuestionType::Short,
            other => QuestionType::Other(other.to_string()),
        }
    }
}

impl From<String> for QuestionType {
    fn from(tag: String) -> Self {
        QuestionType::from(tag.as_str())
    }
}

impl From<QuestionType> for String {
    fn from(kind: QuestionType) -> Self {
        kind.as_str().to_string()
    }
}

impl fmt::Display for QuestionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reference answer: a string, a number, or a list of strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ReferenceAnswer {
    Text(String),
    Number(serde_json::Number),
    List(Vec<String>),
    Missing,
}

impl Default for ReferenceAnswer {
    fn default() -> Self {
        ReferenceAnswer::Missing
    }
}

impl ReferenceAnswer {
    /// Text form used for comparison. Lists are joined with `,`.
    pub fn text(&self) -> String {
        match self {
            ReferenceAnswer::Text(s) => s.clone(),
            ReferenceAnswer::Number(n) => n.to_string(),
            ReferenceAnswer::List(items) => items.join(","),
            ReferenceAnswer::Missing => String::new(),
        }
    }
}

impl From<&str> for ReferenceAnswer {
    fn from(s: &str) -> Self {
        ReferenceAnswer::Text(s.to_string())
    }
}

impl fmt::Display for ReferenceAnswer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReferenceAnswer::List(items) => f.write_str(&items.join(", ")),
            other => f.write_str(&other.text()),
        }
    }
}

/// A generated quiz question. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizQuestion {
    pub question: String,
    #[serde(rename = "type", default)]
    pub kind: QuestionType,
    /// Choices, for `mcq` questions only.
    #[serde(default)]
    pub options: Vec<String>,
    #[serde(default)]
    pub answer: ReferenceAnswer,
    #[serde(default)]
    pub explanation: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_question_type_tags() {
        assert_eq!(QuestionType::from("mcq"), QuestionType::Mcq);
        assert_eq!(QuestionType::from("assertion_reason"), QuestionType::AssertionReason);
        assert_eq!(QuestionType::from("numerical"), QuestionType::Numerical);
        assert_eq!(QuestionType::from("short"), QuestionType::Short);
        assert_eq!(
            QuestionType::from("essay"),
            QuestionType::Other("essay".to_string())
        );
        assert_eq!(QuestionType::from("essay").to_string(), "essay");
    }

    #[test]
    fn test_deserialize_question() {
        let json = r#"{
            "question": "Which law relates force and acceleration?",
            "type": "mcq",
            "options": ["A. First", "B. Second", "C. Third"],
            "answer": "B",
            "explanation": "F = ma"
        }"#;
        let q: QuizQuestion = serde_json::from_str(json).unwrap();
        assert_eq!(q.kind, QuestionType::Mcq);
        assert_eq!(q.options.len(), 3);
        assert_eq!(q.answer, ReferenceAnswer::Text("B".to_string()));
    }

    #[test]
    fn test_deserialize_answer_variants() {
        let q: QuizQuestion =
            serde_json::from_str(r#"{"question":"g?","type":"numerical","answer":9.8}"#).unwrap();
        assert_eq!(q.answer.text(), "9.8");

        let q: QuizQuestion =
            serde_json::from_str(r#"{"question":"pick","type":"short","answer":["a","b"]}"#)
                .unwrap();
        assert_eq!(q.answer.text(), "a,b");

        let q: QuizQuestion = serde_json::from_str(r#"{"question":"?","answer":null}"#).unwrap();
        assert_eq!(q.answer, ReferenceAnswer::Missing);
        assert_eq!(q.kind, QuestionType::default());
    }

    #[test]
    fn test_question_type_serializes_as_tag() {
        let json = serde_json::to_string(&QuestionType::AssertionReason).unwrap();
        assert_eq!(json, "\"assertion_reason\"");
    }
}
