//! Answer grading: exact letter match for multiple choice, tolerance for
//! numbers, and lexical overlap for everything textual.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::{QuestionType, ReferenceAnswer};

/// Removed as whole words before comparing free-text answers.
const STOP_WORDS: &[&str] = &["a", "an", "the", "is", "are", "was", "were", "this", "that"];

const ASSERTION_REASON_THRESHOLD: f64 = 0.6;
const NUMERIC_TEXT_THRESHOLD: f64 = 0.7;
const FULL_CREDIT_THRESHOLD: f64 = 0.6;
const PARTIAL_CREDIT_THRESHOLD: f64 = 0.35;

const MIN_NUMERIC_TOLERANCE: f64 = 1e-3;
const RELATIVE_NUMERIC_TOLERANCE: f64 = 0.01;

/// Points awarded for one answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "f64", try_from = "f64")]
pub enum Credit {
    None,
    Half,
    Full,
}

impl Credit {
    pub fn points(self) -> f64 {
        match self {
            Credit::None => 0.0,
            Credit::Half => 0.5,
            Credit::Full => 1.0,
        }
    }

    fn all_or_nothing(correct: bool) -> Self {
        if correct {
            Credit::Full
        } else {
            Credit::None
        }
    }
}

impl From<Credit> for f64 {
    fn from(credit: Credit) -> Self {
        credit.points()
    }
}

impl TryFrom<f64> for Credit {
    type Error = String;

    fn try_from(points: f64) -> Result<Self, Self::Error> {
        if points == 0.0 {
            Ok(Credit::None)
        } else if points == 0.5 {
            Ok(Credit::Half)
        } else if points == 1.0 {
            Ok(Credit::Full)
        } else {
            Err(format!("invalid point value: {}", points))
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Grade {
    pub correct: bool,
    /// In `[0, 1]`.
    pub confidence: f64,
    pub credit: Credit,
}

impl Grade {
    pub fn points(&self) -> f64 {
        self.credit.points()
    }

    fn pass_fail(correct: bool, confidence: f64) -> Self {
        Self {
            correct,
            confidence,
            credit: Credit::all_or_nothing(correct),
        }
    }
}

/// Canonical form for textual comparison: lowercase, punctuation to spaces,
/// stop words dropped, whitespace collapsed.
pub fn normalize_text(s: &str) -> String {
    let cleaned: String = s
        .to_lowercase()
        .chars()
        .map(|c| match c {
            '\u{2018}' | '\u{2019}' | '\u{201C}' | '\u{201D}' => '"',
            c => c,
        })
        .map(|c| {
            if is_word_char(c) || c.is_whitespace() {
                c
            } else {
                ' '
            }
        })
        .collect();

    cleaned
        .split_whitespace()
        .filter(|word| !STOP_WORDS.contains(word))
        .collect::<Vec<_>>()
        .join(" ")
}

/// `|A ∩ B| / |A ∪ B|` over space-separated tokens; `0.0` when both are empty.
pub fn jaccard_similarity(a: &str, b: &str) -> f64 {
    let a: HashSet<&str> = a.split(' ').filter(|t| !t.is_empty()).collect();
    let b: HashSet<&str> = b.split(' ').filter(|t| !t.is_empty()).collect();

    let union = a.union(&b).count();
    if union == 0 {
        return 0.0;
    }
    a.intersection(&b).count() as f64 / union as f64
}

/// Grade one answer against its reference. Pure: same inputs, same grade.
pub fn grade(user_answer: &str, reference: &ReferenceAnswer, kind: &QuestionType) -> Grade {
    let user = user_answer.trim();

    match kind {
        QuestionType::Mcq => grade_choice(user, reference),
        QuestionType::AssertionReason => {
            let sim = text_similarity(user, &reference.text());
            Grade::pass_fail(sim > ASSERTION_REASON_THRESHOLD, sim)
        }
        QuestionType::Numerical => grade_numeric(user, &reference.text()),
        QuestionType::Short | QuestionType::Other(_) => grade_free_text(user, &reference.text()),
    }
}

fn grade_choice(user: &str, reference: &ReferenceAnswer) -> Grade {
    let reference_letter = match reference {
        ReferenceAnswer::Text(t) if is_choice_letter(t.trim()) => Some(t.trim().to_uppercase()),
        _ => None,
    };
    let user_letter = user.to_uppercase().replace('.', "");
    let user_letter = user_letter.trim();

    if let Some(reference_letter) = reference_letter {
        if is_choice_letter(user_letter) {
            return Grade::pass_fail(user_letter == reference_letter, 1.0);
        }
    }

    if normalize_text(user) == normalize_text(&reference.text()) {
        Grade::pass_fail(true, 1.0)
    } else {
        Grade::pass_fail(false, 0.0)
    }
}

fn grade_numeric(user: &str, reference: &str) -> Grade {
    match (parse_number_prefix(user), parse_number_prefix(reference)) {
        (Some(u), Some(c)) => {
            let diff = (u - c).abs();
            let tolerance = MIN_NUMERIC_TOLERANCE.max(c.abs() * RELATIVE_NUMERIC_TOLERANCE);
            let correct = diff <= tolerance;
            let confidence = if correct {
                1.0
            } else {
                (1.0 - diff / (c.abs() + 1e-6)).max(0.0)
            };
            Grade::pass_fail(correct, confidence)
        }
        _ => {
            let sim = text_similarity(user, reference);
            Grade::pass_fail(sim > NUMERIC_TEXT_THRESHOLD, sim)
        }
    }
}

fn grade_free_text(user: &str, reference: &str) -> Grade {
    let sim = text_similarity(user, reference);
    let (correct, credit) = if sim >= FULL_CREDIT_THRESHOLD {
        (true, Credit::Full)
    } else if sim >= PARTIAL_CREDIT_THRESHOLD {
        (false, Credit::Half)
    } else {
        (false, Credit::None)
    };
    Grade {
        correct,
        confidence: sim,
        credit,
    }
}

fn text_similarity(a: &str, b: &str) -> f64 {
    jaccard_similarity(&normalize_text(a), &normalize_text(b))
}

fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn is_choice_letter(s: &str) -> bool {
    let mut chars = s.chars();
    matches!(
        (chars.next(), chars.next()),
        (Some('A'..='E' | 'a'..='e'), None)
    )
}

/// Parse the longest leading decimal literal (`"9.8 m/s"` → 9.8).
/// Returns `None` when the text does not start with a number.
fn parse_number_prefix(s: &str) -> Option<f64> {
    let s = s.trim_start();
    let bytes = s.as_bytes();
    let mut end = 0;

    let negative = bytes.first() == Some(&b'-');
    if matches!(bytes.first(), Some(b'+' | b'-')) {
        end += 1;
    }
    if s[end..].starts_with("Infinity") {
        return Some(if negative {
            f64::NEG_INFINITY
        } else {
            f64::INFINITY
        });
    }

    let int_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    let int_digits = end - int_start;

    let mut frac_digits = 0;
    if end < bytes.len() && bytes[end] == b'.' {
        let mut j = end + 1;
        while j < bytes.len() && bytes[j].is_ascii_digit() {
            j += 1;
        }
        frac_digits = j - end - 1;
        // "1." and "1.e3" keep the dot; a lone "." does not.
        if int_digits + frac_digits > 0 {
            end = j;
        }
    }
    if int_digits + frac_digits == 0 {
        return None;
    }

    if end < bytes.len() && matches!(bytes[end], b'e' | b'E') {
        let mut j = end + 1;
        if j < bytes.len() && matches!(bytes[j], b'+' | b'-') {
            j += 1;
        }
        let exp_start = j;
        while j < bytes.len() && bytes[j].is_ascii_digit() {
            j += 1;
        }
        if j > exp_start {
            end = j;
        }
    }

    s[..end].parse::<f64>().ok()
}
