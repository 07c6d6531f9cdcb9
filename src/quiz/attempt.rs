use std::collections::BTreeMap;

use anyhow::{bail, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::grader::{grade, Credit};
use super::{QuizQuestion, ReferenceAnswer};
use crate::api::types::{RecordId, StoredAttempt};

/// Grading outcome for one question. Always derived, never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerRecord {
    pub index: usize,
    pub question: String,
    pub user_answer: String,
    pub correct_answer: ReferenceAnswer,
    pub explanation: String,
    pub is_correct: bool,
    pub points: Credit,
    pub confidence: f64,
}

impl AnswerRecord {
    pub fn grade(index: usize, question: &QuizQuestion, user_answer: &str) -> Self {
        let result = grade(user_answer, &question.answer, &question.kind);
        Self {
            index,
            question: question.question.clone(),
            user_answer: user_answer.to_string(),
            correct_answer: question.answer.clone(),
            explanation: question.explanation.clone(),
            is_correct: result.correct,
            points: result.credit,
            confidence: result.confidence,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttemptResult {
    pub total_points: f64,
    pub max_points: usize,
    pub per_question: Vec<AnswerRecord>,
}

impl AttemptResult {
    /// Grade every question; unanswered questions are graded as empty answers.
    pub fn grade_all(questions: &[QuizQuestion], answers: &BTreeMap<usize, String>) -> Self {
        let per_question: Vec<AnswerRecord> = questions
            .iter()
            .enumerate()
            .map(|(idx, q)| {
                let user = answers.get(&idx).map(String::as_str).unwrap_or("");
                AnswerRecord::grade(idx, q, user)
            })
            .collect();
        let total_points = per_question.iter().map(|r| r.points.points()).sum();

        Self {
            total_points,
            max_points: questions.len(),
            per_question,
        }
    }

    /// Re-derive the records of a stored attempt. The reported total is the
    /// score that was saved with it.
    pub fn review(questions: &[QuizQuestion], stored: &StoredAttempt) -> Self {
        let mut result = Self::grade_all(questions, &stored.answers);
        result.total_points = stored.score;
        result
    }
}

/// Payload of `POST /quiz/attempt`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttemptSubmission {
    pub quiz_id: RecordId,
    pub answers: BTreeMap<usize, String>,
    pub score: f64,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

/// A user's pass through a quiz. Answers may change until it is submitted,
/// which happens exactly once.
#[derive(Debug, Clone)]
pub struct QuizAttempt {
    quiz_id: RecordId,
    answers: BTreeMap<usize, String>,
    started_at: DateTime<Utc>,
    finished: Option<(f64, DateTime<Utc>)>,
}

impl QuizAttempt {
    pub fn start(quiz_id: RecordId) -> Self {
        debug!(quiz_id = %quiz_id, "quiz attempt started");
        Self {
            quiz_id,
            answers: BTreeMap::new(),
            started_at: Utc::now(),
            finished: None,
        }
    }

    /// A fresh attempt at the same quiz.
    pub fn retry(&self) -> Self {
        Self::start(self.quiz_id.clone())
    }

    pub fn quiz_id(&self) -> &RecordId {
        &self.quiz_id
    }

    pub fn answers(&self) -> &BTreeMap<usize, String> {
        &self.answers
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn is_submitted(&self) -> bool {
        self.finished.is_some()
    }

    pub fn score(&self) -> Option<f64> {
        self.finished.map(|(score, _)| score)
    }

    pub fn set_answer(&mut self, index: usize, answer: impl Into<String>) -> Result<()> {
        if self.is_submitted() {
            bail!("attempt for quiz {} was already submitted", self.quiz_id);
        }
        self.answers.insert(index, answer.into());
        Ok(())
    }

    pub fn clear_answer(&mut self, index: usize) -> Result<()> {
        if self.is_submitted() {
            bail!("attempt for quiz {} was already submitted", self.quiz_id);
        }
        self.answers.remove(&index);
        Ok(())
    }

    /// Grade all answers and freeze the attempt.
    pub fn submit(&mut self, questions: &[QuizQuestion]) -> Result<AttemptResult> {
        if self.is_submitted() {
            bail!("attempt for quiz {} was already submitted", self.quiz_id);
        }
        let result = AttemptResult::grade_all(questions, &self.answers);
        self.finished = Some((result.total_points, Utc::now()));
        info!(
            quiz_id = %self.quiz_id,
            score = result.total_points,
            max = result.max_points,
            "quiz attempt submitted"
        );
        Ok(result)
    }

    /// The record to persist. Only available after [`submit`](Self::submit).
    pub fn submission(&self) -> Result<AttemptSubmission> {
        let Some((score, finished_at)) = self.finished else {
            bail!("attempt for quiz {} has not been submitted", self.quiz_id);
        };
        Ok(AttemptSubmission {
            quiz_id: self.quiz_id.clone(),
            answers: self.answers.clone(),
            score,
            started_at: self.started_at,
            finished_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quiz::QuestionType;

    fn questions() -> Vec<QuizQuestion> {
        vec![
            QuizQuestion {
                question: "Which law is F = ma?".into(),
                kind: QuestionType::Mcq,
                options: vec!["A. First".into(), "B. Second".into()],
                answer: "B".into(),
                explanation: "Newton's second law.".into(),
            },
            QuizQuestion {
                question: "g in m/s^2?".into(),
                kind: QuestionType::Numerical,
                options: vec![],
                answer: "9.8".into(),
                explanation: String::new(),
            },
            QuizQuestion {
                question: "What is force?".into(),
                kind: QuestionType::Short,
                options: vec![],
                answer: "force is a vector".into(),
                explanation: String::new(),
            },
        ]
    }

    #[test]
    fn test_submit_scores_attempt() {
        let qs = questions();
        let mut attempt = QuizAttempt::start(RecordId::Int(7));
        attempt.set_answer(0, "b.").unwrap();
        attempt.set_answer(1, "9.79").unwrap();
        attempt.set_answer(2, "the force").unwrap();

        let result = attempt.submit(&qs).unwrap();
        assert_eq!(result.max_points, 3);
        assert_eq!(result.total_points, 2.5);
        assert_eq!(result.per_question[2].points, Credit::Half);
        assert!(!result.per_question[2].is_correct);
        assert_eq!(attempt.score(), Some(2.5));
    }

    #[test]
    fn test_unanswered_questions_score_zero() {
        let qs = questions();
        let mut attempt = QuizAttempt::start(RecordId::Int(1));
        let result = attempt.submit(&qs).unwrap();
        assert_eq!(result.total_points, 0.0);
        assert!(result.per_question.iter().all(|r| r.user_answer.is_empty()));
    }

    #[test]
    fn test_submit_only_once() {
        let qs = questions();
        let mut attempt = QuizAttempt::start(RecordId::Int(7));
        attempt.submit(&qs).unwrap();
        assert!(attempt.submit(&qs).is_err());
        assert!(attempt.set_answer(0, "A").is_err());
        assert!(attempt.clear_answer(0).is_err());
    }

    #[test]
    fn test_submission_requires_submit() {
        let qs = questions();
        let mut attempt = QuizAttempt::start(RecordId::Int(7));
        attempt.set_answer(0, "B").unwrap();
        assert!(attempt.submission().is_err());

        attempt.submit(&qs).unwrap();
        let submission = attempt.submission().unwrap();
        assert_eq!(submission.quiz_id, RecordId::Int(7));
        assert_eq!(submission.score, 1.0);
        assert!(submission.finished_at >= submission.started_at);

        let json = serde_json::to_value(&submission).unwrap();
        assert_eq!(json["answers"]["0"], "B");
        assert_eq!(json["quiz_id"], 7);
    }

    #[test]
    fn test_retry_starts_clean() {
        let qs = questions();
        let mut attempt = QuizAttempt::start(RecordId::Int(7));
        attempt.set_answer(0, "B").unwrap();
        attempt.submit(&qs).unwrap();

        let retry = attempt.retry();
        assert!(!retry.is_submitted());
        assert!(retry.answers().is_empty());
        assert_eq!(retry.quiz_id(), &RecordId::Int(7));
    }

    #[test]
    fn test_review_matches_submission() {
        let qs = questions();
        let mut attempt = QuizAttempt::start(RecordId::Int(7));
        attempt.set_answer(0, "B").unwrap();
        attempt.set_answer(2, "force vector").unwrap();
        let live = attempt.submit(&qs).unwrap();

        let stored = StoredAttempt {
            id: Some(RecordId::Int(100)),
            quiz_id: RecordId::Int(7),
            answers: attempt.answers().clone(),
            score: live.total_points,
            started_at: None,
            finished_at: None,
        };
        let reviewed = AttemptResult::review(&qs, &stored);
        assert_eq!(reviewed, live);
    }

    #[test]
    fn test_review_reports_stored_score() {
        let qs = questions();
        let stored = StoredAttempt {
            id: None,
            quiz_id: RecordId::Int(7),
            answers: BTreeMap::from([(0, "B".to_string())]),
            score: 0.0,
            started_at: None,
            finished_at: None,
        };
        let reviewed = AttemptResult::review(&qs, &stored);
        assert_eq!(reviewed.total_points, 0.0);
        assert!(reviewed.per_question[0].is_correct);
    }
}
