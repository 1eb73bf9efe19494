use anyhow::Result;
use teloxide::prelude::*;
use teloxide::types::ReplyParameters;
use tracing::info;

use crate::db::models::{NewMovie, KIND_DOCUMENT, KIND_VIDEO};
use crate::state::AppState;
use crate::utils::normalize::normalize_title;

const UNTITLED: &str = "unknown";

fn extract_media(message: &Message) -> Option<(String, &'static str, Option<String>)> {
    if let Some(video) = message.video() {
        return Some((video.file.id.0.clone(), KIND_VIDEO, video.file_name.clone()));
    }
    if let Some(document) = message.document() {
        return Some((
            document.file.id.0.clone(),
            KIND_DOCUMENT,
            document.file_name.clone(),
        ));
    }
    None
}

/// Title source order: caption, then the file's own declared name, then a
/// fixed placeholder. An all-junk title also falls back to the placeholder
/// so the row stays findable by admins.
pub fn resolve_title(caption: Option<&str>, declared_name: Option<&str>) -> String {
    let raw = caption
        .filter(|text| !text.trim().is_empty())
        .or(declared_name)
        .unwrap_or(UNTITLED);
    let title = normalize_title(raw);
    if title.is_empty() {
        UNTITLED.to_string()
    } else {
        title
    }
}

pub async fn storage_post_handler(bot: Bot, state: AppState, message: Message) -> Result<()> {
    let Some((file_ref, kind, declared_name)) = extract_media(&message) else {
        return Ok(());
    };

    let title = resolve_title(message.caption(), declared_name.as_deref());

    if let Some(existing) = state.db.find_by_file_ref(&file_ref).await? {
        reply_to(&bot, &message, &format!("Already indexed as \"{}\"", existing.title)).await?;
        return Ok(());
    }

    let replaces_existing = state.db.find_by_exact_title(&title).await?.is_some();
    let id = state
        .db
        .upsert_movie(NewMovie {
            title: title.clone(),
            file_ref,
            kind: kind.to_string(),
            raw_caption: message.caption().map(str::to_string),
        })
        .await?;
    info!("Indexed movie {id}: {title}");

    let confirmation = if replaces_existing {
        format!("♻️ Updated: {title}")
    } else {
        format!("✅ Indexed: {title}")
    };
    reply_to(&bot, &message, &confirmation).await?;
    Ok(())
}

async fn reply_to(bot: &Bot, message: &Message, text: &str) -> Result<()> {
    bot.send_message(message.chat.id, text)
        .reply_parameters(ReplyParameters::new(message.id))
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn caption_wins_over_the_declared_file_name() {
        let title = resolve_title(Some("Pathaan 2023 1080p"), Some("upload_final.mkv"));
        assert_eq!(title, "pathaan 2023");
    }

    #[test]
    fn falls_back_to_the_file_name_then_the_placeholder() {
        assert_eq!(resolve_title(None, Some("Jawan.2023.WEBRip.mkv")), "jawan 2023");
        assert_eq!(resolve_title(None, None), "unknown");
        assert_eq!(resolve_title(Some("   "), None), "unknown");
    }

    #[test]
    fn all_junk_titles_become_the_placeholder() {
        assert_eq!(resolve_title(Some("720p x264 HEVC"), None), "unknown");
    }
}
