use anyhow::Result;
use teloxide::prelude::*;
use teloxide::types::{FileId, InlineKeyboardButton, InlineKeyboardMarkup, InputFile};
use tokio::time::Duration;
use tracing::warn;
use url::Url;

use crate::config::CONFIG;
use crate::db::models::{MovieRow, KIND_VIDEO};
use crate::handlers::access::{check_membership, MembershipGate};
use crate::state::AppState;
use crate::utils::deeplink::{self, StartPayload};
use crate::utils::normalize::normalize_title;

pub fn render_caption(template: &str, delete_seconds: u64) -> String {
    let minutes = delete_seconds.div_ceil(60).max(1);
    template.replace("{minutes}", &minutes.to_string())
}

pub async fn start_handler(bot: Bot, state: AppState, message: Message, payload: String) -> Result<()> {
    // Deep links only open in private chat; a group /start is noise.
    if !message.chat.is_private() {
        return Ok(());
    }
    let Some(user) = message.from.as_ref() else {
        return Ok(());
    };

    if check_membership(&bot, user.id).await == MembershipGate::Denied {
        send_join_prompt(&bot, &state, message.chat.id, &payload).await?;
        return Ok(());
    }

    let trimmed = payload.trim();
    if trimmed.is_empty() {
        send_welcome(&bot, message.chat.id).await?;
        return Ok(());
    }

    match deeplink::parse_start_payload(trimmed) {
        Some(StartPayload::File(id)) => match state.db.find_by_id(id).await? {
            Some(entry) => deliver(&bot, &state, message.chat.id, &entry).await?,
            None => send_expired_notice(&bot, message.chat.id).await?,
        },
        Some(StartPayload::All(query)) => {
            let query = normalize_title(&query);
            let entries = state
                .db
                .find_all_by_title(&query, CONFIG.bulk_delivery_limit)
                .await?;
            if entries.is_empty() {
                send_expired_notice(&bot, message.chat.id).await?;
                return Ok(());
            }

            bot.send_message(
                message.chat.id,
                format!("📦 Sending {} file(s) for \"{query}\"...", entries.len()),
            )
            .await?;
            for entry in &entries {
                if let Err(err) = deliver(&bot, &state, message.chat.id, entry).await {
                    warn!("Bulk delivery of movie {} failed: {err}", entry.id);
                }
            }
        }
        // Malformed payloads read as "not found", never as an error.
        None => send_expired_notice(&bot, message.chat.id).await?,
    }

    Ok(())
}

async fn deliver(bot: &Bot, state: &AppState, chat_id: ChatId, entry: &MovieRow) -> Result<()> {
    let caption = render_caption(&CONFIG.delivery_caption, CONFIG.file_delete_seconds);
    let media = InputFile::file_id(FileId(entry.file_ref.clone()));

    let sent = if entry.kind == KIND_VIDEO {
        bot.send_video(chat_id, media).caption(caption).await?
    } else {
        bot.send_document(chat_id, media).caption(caption).await?
    };

    state.deletes.schedule(
        sent.chat.id,
        sent.id,
        Duration::from_secs(CONFIG.file_delete_seconds),
    );
    Ok(())
}

async fn send_join_prompt(
    bot: &Bot,
    state: &AppState,
    chat_id: ChatId,
    payload: &str,
) -> Result<()> {
    let mut keyboard: Vec<Vec<InlineKeyboardButton>> = Vec::new();
    match Url::parse(&CONFIG.main_channel_link) {
        Ok(url) => keyboard.push(vec![InlineKeyboardButton::url("📢 JOIN CHANNEL", url)]),
        Err(err) => warn!("MAIN_CHANNEL_LINK is not a valid URL: {err}"),
    }
    let payload = payload.trim();
    if !payload.is_empty() {
        let retry = format!("https://t.me/{}?start={payload}", state.bot_username);
        if let Ok(url) = Url::parse(&retry) {
            keyboard.push(vec![InlineKeyboardButton::url("🔄 TRY AGAIN", url)]);
        }
    }

    let request = bot.send_message(
        chat_id,
        "❌ You need to join our channel first. Join, then tap TRY AGAIN.",
    );
    let request = if keyboard.is_empty() {
        request
    } else {
        request.reply_markup(InlineKeyboardMarkup::new(keyboard))
    };
    request.await?;
    Ok(())
}

async fn send_welcome(bot: &Bot, chat_id: ChatId) -> Result<()> {
    let mut request = bot.send_message(
        chat_id,
        "👋 Search for a movie in the group chat and tap the button you get back. The file lands here.",
    );
    if let Ok(url) = Url::parse(&CONFIG.main_channel_link) {
        request = request.reply_markup(InlineKeyboardMarkup::new(vec![vec![
            InlineKeyboardButton::url("📢 MAIN CHANNEL", url),
        ]]));
    }
    request.await?;
    Ok(())
}

async fn send_expired_notice(bot: &Bot, chat_id: ChatId) -> Result<()> {
    bot.send_message(
        chat_id,
        "😔 That file is gone or the link has expired. Search again in the group.",
    )
    .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn caption_placeholder_renders_whole_minutes() {
        assert_eq!(
            render_caption("gone in {minutes} min", 120),
            "gone in 2 min"
        );
        assert_eq!(render_caption("gone in {minutes} min", 90), "gone in 2 min");
        assert_eq!(render_caption("gone in {minutes} min", 10), "gone in 1 min");
        assert_eq!(render_caption("no placeholder", 120), "no placeholder");
    }
}
