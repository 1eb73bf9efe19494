use std::error::Error;

use dotenvy::dotenv;
use teloxide::dispatching::UpdateFilterExt;
use teloxide::prelude::*;
use teloxide::utils::command::BotCommands;
use tracing::{error, info};

mod config;
mod db;
mod handlers;
mod services;
mod state;
mod utils;
mod web;

use config::CONFIG;
use db::database::Database;
use handlers::{commands, delivery, ingest, search};
use services::poster::PosterClient;
use services::shortener::LinkShortener;
use state::AppState;
use utils::autodelete::DeleteQueue;
use utils::logging::init_logging;

#[derive(BotCommands, Clone)]
#[command(rename_rule = "lowercase")]
enum Command {
    Start(String),
    Help,
    Stats,
    Del(String),
    Delall,
    Shortlink(String),
    Id,
}

type HandlerResult = Result<(), Box<dyn Error + Send + Sync>>;

#[tokio::main]
async fn main() -> HandlerResult {
    dotenv().ok();
    let _guards = init_logging();

    info!("Starting movie filter bot");
    let bot = Bot::new(CONFIG.bot_token.clone());
    let me = bot.get_me().await?;
    let bot_username = me.username().to_string();

    let db = Database::init(&CONFIG.database_url).await?;
    let deletes = DeleteQueue::start(bot.clone(), CONFIG.delete_queue_capacity);
    let shortener = LinkShortener::from_config();
    let poster = PosterClient::from_config();
    let state = AppState::new(db, deletes, shortener, poster, bot_username);

    tokio::spawn(async {
        if let Err(err) = web::run_health_server(CONFIG.health_port).await {
            error!("Health server stopped: {err}");
        }
    });

    let command_handler = dptree::entry()
        .filter_command::<Command>()
        .endpoint(handle_command);

    let search_branch = dptree::filter(|message: Message| {
        message.chat.id.0 == CONFIG.search_chat_id
            && message
                .text()
                .map(|text| !text.trim_start().starts_with('/'))
                .unwrap_or(false)
    })
    .endpoint(handle_search_message);

    let message_handler = Update::filter_message()
        .branch(command_handler)
        .branch(search_branch)
        .endpoint(ignore_message);

    let storage_branch = dptree::filter(|message: Message| {
        message.chat.id.0 == CONFIG.storage_channel_id
            && (message.video().is_some() || message.document().is_some())
    })
    .endpoint(handle_storage_post);

    let channel_handler = Update::filter_channel_post()
        .branch(storage_branch)
        .endpoint(ignore_message);

    let handler = dptree::entry()
        .branch(message_handler)
        .branch(channel_handler);

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![state])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    Ok(())
}

async fn handle_command(
    bot: Bot,
    state: AppState,
    message: Message,
    command: Command,
) -> HandlerResult {
    fn optional_arg(arg: String) -> Option<String> {
        if arg.trim().is_empty() {
            None
        } else {
            Some(arg)
        }
    }

    match command {
        Command::Start(payload) => {
            tokio::spawn(async move {
                if let Err(err) = delivery::start_handler(bot, state, message, payload).await {
                    error!("start handler failed: {err}");
                }
            });
        }
        Command::Help => commands::help_handler(bot, message).await?,
        Command::Id => commands::id_handler(bot, message).await?,
        Command::Stats => {
            tokio::spawn(async move {
                if let Err(err) = commands::stats_handler(bot, state, message).await {
                    error!("stats handler failed: {err}");
                }
            });
        }
        Command::Del(arg) => {
            let arg = optional_arg(arg);
            tokio::spawn(async move {
                if let Err(err) = commands::del_handler(bot, state, message, arg).await {
                    error!("del handler failed: {err}");
                }
            });
        }
        Command::Delall => {
            tokio::spawn(async move {
                if let Err(err) = commands::delall_handler(bot, state, message).await {
                    error!("delall handler failed: {err}");
                }
            });
        }
        Command::Shortlink(arg) => {
            let arg = optional_arg(arg);
            tokio::spawn(async move {
                if let Err(err) = commands::shortlink_handler(bot, state, message, arg).await {
                    error!("shortlink handler failed: {err}");
                }
            });
        }
    }
    Ok(())
}

async fn handle_search_message(bot: Bot, state: AppState, message: Message) -> HandlerResult {
    if let Err(err) = search::search_message_handler(bot, state, message).await {
        error!("search handler failed: {err}");
    }
    Ok(())
}

async fn handle_storage_post(bot: Bot, state: AppState, message: Message) -> HandlerResult {
    if let Err(err) = ingest::storage_post_handler(bot, state, message).await {
        error!("storage ingest handler failed: {err}");
    }
    Ok(())
}

async fn ignore_message(_message: Message) -> HandlerResult {
    Ok(())
}
