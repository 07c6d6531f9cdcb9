use std::path::Path;

use anyhow::{bail, Result};
use serde_json::Value;
use tracing::info;

use super::Input;
use crate::api::quiz::Difficulty;
use crate::api::types::RecordId;
use crate::api::BackendClient;
use crate::quiz::{AttemptResult, Credit, QuizAttempt, QuizQuestion};

pub(super) async fn take(client: &BackendClient, pdf: &Path, difficulty: Difficulty) -> Result<()> {
    println!("Generating a {} quiz from {}...", difficulty, pdf.display());
    let generated = client.generate_quiz(pdf, difficulty).await?;
    let questions = generated.quiz.into_questions();
    if questions.is_empty() {
        bail!("The generated quiz has no questions");
    }

    let mut input = Input::new();
    let mut attempt = QuizAttempt::start(generated.quiz_id);
    loop {
        if !answer_all(&mut input, &mut attempt, &questions).await? {
            println!("Quiz abandoned.");
            return Ok(());
        }

        let result = attempt.submit(&questions)?;
        print_review(&result);

        let saved: Value = client.save_attempt(&attempt.submission()?).await?;
        if let Some(id) = saved.get("attempt_id").or_else(|| saved.get("id")) {
            info!(attempt_id = %id, "attempt saved");
            println!("Saved as attempt {}.", id);
        }

        match input.prompt("Try again? [y/N] ").await? {
            Some(reply) if reply.eq_ignore_ascii_case("y") => attempt = attempt.retry(),
            _ => return Ok(()),
        }
    }
}

/// Collect an answer per question. Returns `false` if input ended early.
async fn answer_all(
    input: &mut Input,
    attempt: &mut QuizAttempt,
    questions: &[QuizQuestion],
) -> Result<bool> {
    for (idx, q) in questions.iter().enumerate() {
        println!("\n{}. {}", idx + 1, q.question);
        for option in &q.options {
            println!("   {}", option);
        }
        let Some(answer) = input.prompt("> ").await? else {
            return Ok(false);
        };
        if answer.is_empty() {
            attempt.clear_answer(idx)?;
        } else {
            attempt.set_answer(idx, answer)?;
        }
    }
    Ok(true)
}

pub(super) async fn review(client: &BackendClient, attempt_id: &str) -> Result<()> {
    let detail = client.load_attempt(&RecordId::from(attempt_id)).await?;
    let questions = detail.quiz.into_questions();
    print_review(&AttemptResult::review(&questions, &detail.attempt));
    Ok(())
}

pub(super) fn print_review(result: &AttemptResult) {
    for record in &result.per_question {
        let mark = match record.points {
            Credit::Full => "correct",
            Credit::Half => "partly correct",
            Credit::None => "incorrect",
        };
        println!("\n{}. {} ({})", record.index + 1, record.question, mark);
        let given = if record.user_answer.is_empty() {
            "(no answer)"
        } else {
            record.user_answer.as_str()
        };
        println!("   your answer:    {}", given);
        println!("   correct answer: {}", record.correct_answer);
        if !record.explanation.is_empty() {
            println!("   {}", record.explanation);
        }
    }
    println!("\nScore: {} / {}", result.total_points, result.max_points);
}
