use std::path::PathBuf;

use anyhow::{bail, Result};
use serde_json::Value;

use crate::api::types::{value_text, Summary};
use crate::api::BackendClient;
use crate::links;

pub(super) async fn summarize(
    client: &BackendClient,
    target: Option<String>,
    file: Option<PathBuf>,
) -> Result<()> {
    let summary = match (target, file) {
        (_, Some(file)) => {
            println!("Uploading {}...", file.display());
            client.upload_video(&file).await?
        }
        (Some(target), None) => {
            let target = target.trim();
            if target.starts_with("http") && !links::is_valid_youtube_url(target) {
                if links::is_valid_url(target) {
                    bail!("Not a YouTube video link: {}", target);
                }
                bail!("Invalid URL: {}", target);
            }
            println!("Summarizing {}...", target);
            client.summarize_youtube_by_id(target).await?
        }
        (None, None) => bail!("Give a YouTube link or video id, or --file <video>"),
    };

    print_summary(&summary);
    Ok(())
}

pub(super) fn print_summary(summary: &Summary) {
    if !summary.summary.is_empty() {
        println!("{}\n", summary.summary);
    }
    print_section("Key points", &summary.key_points);
    print_section("Formulas", &summary.formulas);
    print_section("Definitions", &summary.definitions);
    print_section("Practice questions", &summary.practice_questions);
}

fn print_section(title: &str, items: &[Value]) {
    if items.is_empty() {
        return;
    }
    println!("{}:", title);
    for item in items {
        println!("  - {}", value_text(item));
    }
    println!();
}
