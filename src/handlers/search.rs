use anyhow::Result;
use teloxide::prelude::*;
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup, InputFile, ReplyParameters};
use tokio::time::Duration;
use tracing::warn;
use url::Url;

use crate::config::CONFIG;
use crate::db::models::MovieRow;
use crate::handlers::access::is_on_search_cooldown;
use crate::state::AppState;
use crate::utils::deeplink;
use crate::utils::normalize::{contains_url, longest_word, normalize_title};

pub async fn search_message_handler(bot: Bot, state: AppState, message: Message) -> Result<()> {
    let Some(text) = message.text() else {
        return Ok(());
    };
    let Some(user) = message.from.as_ref() else {
        return Ok(());
    };
    let user_id = i64::try_from(user.id.0).unwrap_or_default();

    if is_on_search_cooldown(user_id) {
        return Ok(());
    }
    // Link droppers get no reply at all.
    if contains_url(text) {
        return Ok(());
    }

    let query = normalize_title(text);
    if query.chars().count() < CONFIG.min_query_chars {
        return Ok(());
    }

    state.deletes.schedule(
        message.chat.id,
        message.id,
        Duration::from_secs(CONFIG.query_delete_seconds),
    );

    let mut hit = state.db.find_one_by_title(&query).await?;
    if hit.is_none() {
        // Misspelled queries often still contain one good word.
        if let Some(word) = longest_word(&query) {
            hit = state.db.find_one_by_title(word).await?;
        }
    }

    let Some(entry) = hit else {
        let notice = bot
            .send_message(
                message.chat.id,
                format!("😔 No match for \"{query}\". Check the spelling and try again."),
            )
            .reply_parameters(ReplyParameters::new(message.id))
            .await?;
        state.deletes.schedule(
            notice.chat.id,
            notice.id,
            Duration::from_secs(CONFIG.notice_delete_seconds),
        );
        return Ok(());
    };

    let requester = user
        .username
        .as_ref()
        .map(|name| format!("@{name}"))
        .unwrap_or_else(|| user.full_name());
    let reply = send_result(&bot, &state, &message, &entry, &query, &requester).await?;
    state.deletes.schedule(
        reply.chat.id,
        reply.id,
        Duration::from_secs(CONFIG.result_delete_seconds),
    );
    Ok(())
}

async fn send_result(
    bot: &Bot,
    state: &AppState,
    message: &Message,
    entry: &MovieRow,
    query: &str,
    requester: &str,
) -> Result<Message> {
    let long_link = deeplink::build_file_link(&state.bot_username, entry.id);
    let link = state.shortener.shorten(&long_link).await;
    // The long link is self-built and always parses; only a shortener
    // response can be malformed here.
    let button_url = Url::parse(&link).or_else(|_| Url::parse(&long_link))?;

    let mut keyboard = vec![vec![InlineKeyboardButton::url("🎬 GET MOVIE", button_url)]];
    let matches = state.db.count_by_title(query).await.unwrap_or(1);
    if matches > 1 {
        if let Ok(all_url) = Url::parse(&deeplink::build_all_link(&state.bot_username, query)) {
            keyboard.push(vec![InlineKeyboardButton::url(
                format!("📦 GET ALL ({matches})"),
                all_url,
            )]);
        }
    }
    let markup = InlineKeyboardMarkup::new(keyboard);

    let caption = format!(
        "🎬 {}\n\n👤 Requested by {requester}\nTap the button below and the file arrives in your private chat.",
        entry.title.to_uppercase()
    );

    let poster = state.poster.poster_url(&entry.title).await;
    if let Ok(poster_url) = Url::parse(&poster) {
        match bot
            .send_photo(message.chat.id, InputFile::url(poster_url))
            .caption(caption.clone())
            .reply_markup(markup.clone())
            .reply_parameters(ReplyParameters::new(message.id))
            .await
        {
            Ok(sent) => return Ok(sent),
            Err(err) => warn!("Poster reply failed, falling back to text: {err}"),
        }
    }

    let sent = bot
        .send_message(message.chat.id, caption)
        .reply_markup(markup)
        .reply_parameters(ReplyParameters::new(message.id))
        .await?;
    Ok(sent)
}
