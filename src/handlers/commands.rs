use anyhow::Result;
use chrono::Utc;
use teloxide::prelude::*;

use crate::handlers::access::check_admin_access;
use crate::state::AppState;
use crate::utils::normalize::normalize_title;

const HELP_TEXT: &str = "🎬 Movie filter bot\n\n\
Type a movie name in the group chat to search.\n\
Tap the button on a result to receive the file in private chat.\n\
Delivered files auto-delete after a couple of minutes, so save them.\n\n\
Commands:\n\
/id - show this chat's id and your user id\n\
/stats - catalog statistics (admin)\n\
/del <title> - delete entries matching a title substring (admin)\n\
/delall - clear the whole catalog (admin)\n\
/shortlink on|off - toggle link shortening (admin)";

pub async fn help_handler(bot: Bot, message: Message) -> Result<()> {
    bot.send_message(message.chat.id, HELP_TEXT).await?;
    Ok(())
}

pub async fn id_handler(bot: Bot, message: Message) -> Result<()> {
    let user_id = message
        .from
        .as_ref()
        .map(|user| user.id.to_string())
        .unwrap_or_else(|| "unknown".to_string());
    bot.send_message(
        message.chat.id,
        format!("chat_id: {}\nuser_id: {user_id}", message.chat.id.0),
    )
    .await?;
    Ok(())
}

async fn build_status_report(state: &AppState) -> String {
    let mut report = String::new();
    report.push_str("Catalog status\n");
    report.push_str(&format!("time_utc: {}\n", Utc::now().to_rfc3339()));

    match state.db.count_all().await {
        Ok(count) => report.push_str(&format!("movies: {count}\n")),
        Err(err) => report.push_str(&format!("movies: unavailable ({err})\n")),
    }

    let db_result = state.db.health_check().await;
    report.push_str(&format!(
        "db: {}\n",
        if db_result.is_ok() { "ok" } else { "error" }
    ));
    if let Err(err) = db_result {
        report.push_str(&format!("db_error: {err}\n"));
    }

    report.push_str(&format!(
        "delete_queue: pending={} capacity={}\n",
        state.deletes.pending_count(),
        state.deletes.capacity()
    ));
    report.push_str(&format!(
        "shortlink: {}\n",
        if state.shortener.is_enabled() { "on" } else { "off" }
    ));
    report
}

pub async fn stats_handler(bot: Bot, state: AppState, message: Message) -> Result<()> {
    if !check_admin_access(&bot, &message).await {
        return Ok(());
    }
    let report = build_status_report(&state).await;
    bot.send_message(message.chat.id, report).await?;
    Ok(())
}

pub async fn del_handler(
    bot: Bot,
    state: AppState,
    message: Message,
    arg: Option<String>,
) -> Result<()> {
    if !check_admin_access(&bot, &message).await {
        return Ok(());
    }

    let query = arg.map(|raw| normalize_title(&raw)).unwrap_or_default();
    if query.is_empty() {
        bot.send_message(message.chat.id, "Usage: /del <title substring>")
            .await?;
        return Ok(());
    }

    let removed = state.db.delete_by_title(&query).await?;
    bot.send_message(message.chat.id, format!("🗑 Deleted: {removed}"))
        .await?;
    Ok(())
}

pub async fn delall_handler(bot: Bot, state: AppState, message: Message) -> Result<()> {
    if !check_admin_access(&bot, &message).await {
        return Ok(());
    }

    let removed = state.db.delete_all().await?;
    bot.send_message(
        message.chat.id,
        format!("🗑 Cleared the catalog: {removed} entries removed"),
    )
    .await?;
    Ok(())
}

pub async fn shortlink_handler(
    bot: Bot,
    state: AppState,
    message: Message,
    arg: Option<String>,
) -> Result<()> {
    if !check_admin_access(&bot, &message).await {
        return Ok(());
    }

    let desired = match arg.as_deref().map(|value| value.trim().to_lowercase()) {
        Some(value) if value == "on" => true,
        Some(value) if value == "off" => false,
        _ => {
            bot.send_message(message.chat.id, "Usage: /shortlink on|off")
                .await?;
            return Ok(());
        }
    };

    let enabled = state.shortener.set_enabled(desired);
    bot.send_message(
        message.chat.id,
        format!("✅ Shortlink is now {}", if enabled { "on" } else { "off" }),
    )
    .await?;
    Ok(())
}
