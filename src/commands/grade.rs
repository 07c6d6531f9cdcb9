use anyhow::Result;

use crate::quiz::{grade as grade_answer, QuestionType, ReferenceAnswer};

pub(super) fn grade(kind: &str, answer: &str, expected: &str) -> Result<()> {
    let kind = QuestionType::from(kind.trim().to_ascii_lowercase().replace('-', "_"));
    let result = grade_answer(answer, &ReferenceAnswer::from(expected), &kind);

    println!("type:       {}", kind);
    println!("correct:    {}", if result.correct { "yes" } else { "no" });
    println!("points:     {}", result.points());
    println!("confidence: {:.2}", result.confidence);
    Ok(())
}
