use anyhow::{Context, Result};

use crate::api::types::Video;
use crate::api::youtube::SearchOptions;
use crate::api::BackendClient;

pub(super) async fn search(
    client: &BackendClient,
    query: &str,
    options: &SearchOptions,
    save: Option<usize>,
) -> Result<()> {
    let videos = client.search_videos(query, options).await?;
    if videos.is_empty() {
        println!("No videos found for \"{}\".", query.trim());
        return Ok(());
    }

    for (idx, video) in videos.iter().enumerate() {
        println!("{}. {}", idx + 1, video_line(video));
        if let Some(id) = &video.video_id {
            println!("   https://www.youtube.com/watch?v={}", id);
        }
    }

    if let Some(n) = save {
        let video = n
            .checked_sub(1)
            .and_then(|i| videos.get(i))
            .with_context(|| format!("No result number {} to save", n))?;
        client.save_video(video).await?;
        println!("Saved \"{}\" to your videos.", video.title);
    }
    Ok(())
}

fn video_line(video: &Video) -> String {
    let mut line = video.title.clone();
    if let Some(channel) = &video.channel_title {
        line.push_str(&format!(" | {}", channel));
    }
    if let Some(duration) = &video.duration {
        line.push_str(&format!(" | {}", duration));
    }
    if let Some(published) = &video.published_at {
        line.push_str(&format!(" | {}", published.get(..10).unwrap_or(published)));
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_video_line() {
        let video = Video {
            title: "Electrostatics".into(),
            channel_title: Some("Physics Hub".into()),
            published_at: Some("2023-06-01T12:00:00Z".into()),
            ..Video::default()
        };
        assert_eq!(video_line(&video), "Electrostatics | Physics Hub | 2023-06-01");
    }
}
