// src/ui.rs

use crate::story::StoryRecord;
use chrono::{DateTime, Local}; // Use Local timezone for display purposes.
use dialoguer::{theme::ColorfulTheme, Input, Select};

const TRANSCRIPT_PREVIEW_CHARS: usize = 60;

/// One-line summary of a story for menus.
pub fn describe_story(story: &StoryRecord) -> String {
    let recorded: DateTime<Local> = DateTime::from(story.created_at);
    let preview = match &story.transcript {
        Some(text) if text.chars().count() > TRANSCRIPT_PREVIEW_CHARS => {
            let cut: String = text.chars().take(TRANSCRIPT_PREVIEW_CHARS).collect();
            format!("\"{}...\"", cut.trim_end())
        }
        Some(text) => format!("\"{}\"", text),
        None => "(not transcribed yet)".to_string(),
    };
    format!(
        "{} (recorded {}, heard {} times)",
        preview,
        recorded.format("%Y-%m-%d %H:%M"),
        story.play_count
    )
}

/// Shows the stories this client heard most recently, newest first,
/// and lets the operator inspect one.
///
/// # Errors
///
/// Returns an error if any dialoguer interaction fails.
pub fn view_recent(
    ledger: &[String],
    stories: &[StoryRecord],
    theme: &ColorfulTheme,
) -> Result<(), Box<dyn std::error::Error>> {
    let recent: Vec<&StoryRecord> = ledger
        .iter()
        .filter_map(|id| stories.iter().find(|s| &s.id == id))
        .collect();

    if recent.is_empty() {
        println!("\n--- Nothing heard yet ---");
        Input::<String>::with_theme(theme)
            .with_prompt("Press Enter to continue...")
            .allow_empty(true)
            .interact()?;
        return Ok(());
    }

    let items: Vec<String> = recent.iter().map(|story| describe_story(story)).collect();

    let selection = Select::with_theme(theme)
        .with_prompt("-- Recently heard (skipped on the next pick) --\nSelect to view details, Esc to go back:")
        .items(&items)
        .default(0)
        .interact_opt()?;

    if let Some(story) = selection.and_then(|index| recent.get(index)) {
        println!("\n--- Story {} ---", story.id);
        println!("Audio: {}", story.audio_url);
        if let Some(secs) = story.duration_s {
            println!("Length: {:.0}s", secs);
        }
        if let Some(keywords) = &story.keywords {
            println!("Themes: {}", keywords.join(", "));
        }
        if let Some(text) = &story.transcript {
            println!("Transcript: {}", text);
        }
        if let Some(played) = story.last_played_at {
            println!(
                "Last played: {}",
                DateTime::<Local>::from(played).format("%Y-%m-%d %H:%M:%S %Z")
            );
        }
        println!("------------------------------");

        Input::<String>::with_theme(theme)
            .with_prompt("Press Enter to continue...")
            .allow_empty(true)
            .interact()?;
    }

    Ok(())
}
