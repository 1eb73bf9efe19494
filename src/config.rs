use std::env;

use anyhow::{anyhow, Result};
use once_cell::sync::Lazy;

#[derive(Debug, Clone)]
pub struct Config {
    pub bot_token: String,
    pub log_level: String,
    pub database_url: String,
    pub storage_channel_id: i64,
    pub search_chat_id: i64,
    pub fsub_channel_id: i64,
    pub main_channel_link: String,
    pub admin_ids: Vec<i64>,
    pub tmdb_api_key: String,
    pub poster_fallback_url: String,
    pub shortener_domain: String,
    pub shortener_api_key: String,
    pub shortlink_enabled: bool,
    pub fsub_fail_open: bool,
    pub delivery_caption: String,
    pub file_delete_seconds: u64,
    pub result_delete_seconds: u64,
    pub query_delete_seconds: u64,
    pub notice_delete_seconds: u64,
    pub min_query_chars: usize,
    pub search_cooldown_seconds: u64,
    pub bulk_delivery_limit: i64,
    pub delete_queue_capacity: usize,
    pub health_port: u16,
}

pub static CONFIG: Lazy<Config> =
    Lazy::new(|| Config::load().expect("Failed to load configuration"));

fn env_string(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

fn env_bool(name: &str, default: bool) -> bool {
    env::var(name)
        .ok()
        .map(|value| value.trim().eq_ignore_ascii_case("true") || value.trim() == "1")
        .unwrap_or(default)
}

fn env_u64(name: &str, default: u64) -> Result<u64> {
    match env::var(name) {
        Err(_) => Ok(default),
        Ok(value) => value
            .trim()
            .parse::<u64>()
            .map_err(|_| anyhow!("Invalid {name} value: {value}")),
    }
}

fn env_usize(name: &str, default: usize) -> Result<usize> {
    match env::var(name) {
        Err(_) => Ok(default),
        Ok(value) => value
            .trim()
            .parse::<usize>()
            .map_err(|_| anyhow!("Invalid {name} value: {value}")),
    }
}

fn required_string(name: &str) -> Result<String> {
    let value = env::var(name).unwrap_or_default();
    if value.trim().is_empty() {
        return Err(anyhow!("{name} is required"));
    }
    Ok(value)
}

fn required_i64(name: &str) -> Result<i64> {
    let value = required_string(name)?;
    value
        .trim()
        .parse::<i64>()
        .map_err(|_| anyhow!("Invalid {name} value: {value}"))
}

pub fn parse_admin_ids(raw: &str) -> Vec<i64> {
    raw.split(|ch: char| ch == ',' || ch.is_whitespace())
        .map(|entry| entry.trim())
        .filter(|entry| !entry.is_empty())
        .filter_map(|entry| entry.parse::<i64>().ok())
        .collect()
}

impl Config {
    pub fn load() -> Result<Self> {
        let admin_ids = parse_admin_ids(&env_string("ADMIN_IDS", ""));

        Ok(Config {
            bot_token: required_string("BOT_TOKEN")?,
            log_level: env_string("LOG_LEVEL", "info").to_lowercase(),
            database_url: env_string("DATABASE_URL", "sqlite://movies.db"),
            storage_channel_id: required_i64("STORAGE_CHANNEL_ID")?,
            search_chat_id: required_i64("SEARCH_CHAT_ID")?,
            fsub_channel_id: required_i64("FSUB_CHANNEL_ID")?,
            main_channel_link: required_string("MAIN_CHANNEL_LINK")?,
            admin_ids,
            tmdb_api_key: env_string("TMDB_API_KEY", ""),
            poster_fallback_url: env_string(
                "POSTER_FALLBACK_URL",
                "https://telegra.ph/file/0f0f3a47990177708573a.jpg",
            ),
            shortener_domain: env_string("SHORTENER_DOMAIN", ""),
            shortener_api_key: env_string("SHORTENER_API_KEY", ""),
            shortlink_enabled: env_bool("SHORTLINK_ENABLED", true),
            fsub_fail_open: env_bool("FSUB_FAIL_OPEN", true),
            delivery_caption: env_string(
                "DELIVERY_CAPTION",
                "⚠️ This file will be deleted in {minutes} minutes. Save or forward it now!",
            ),
            file_delete_seconds: env_u64("FILE_DELETE_SECONDS", 120)?,
            result_delete_seconds: env_u64("RESULT_DELETE_SECONDS", 120)?,
            query_delete_seconds: env_u64("QUERY_DELETE_SECONDS", 60)?,
            notice_delete_seconds: env_u64("NOTICE_DELETE_SECONDS", 15)?,
            min_query_chars: env_usize("MIN_QUERY_CHARS", 3)?,
            search_cooldown_seconds: env_u64("SEARCH_COOLDOWN_SECONDS", 10)?,
            bulk_delivery_limit: env_u64("BULK_DELIVERY_LIMIT", 10)? as i64,
            delete_queue_capacity: env_usize("DELETE_QUEUE_CAPACITY", 1000)?,
            health_port: u16::try_from(env_u64("HEALTH_PORT", 8080)?)
                .map_err(|_| anyhow!("HEALTH_PORT does not fit in a port number"))?,
        })
    }

    pub fn is_admin(&self, user_id: i64) -> bool {
        self.admin_ids.contains(&user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_comma_and_space_separated_admin_ids() {
        let ids = parse_admin_ids("123, -1001234567890 42");
        assert_eq!(ids, vec![123, -1001234567890, 42]);
    }

    #[test]
    fn skips_garbage_admin_id_entries() {
        let ids = parse_admin_ids("abc, 77,, 12x");
        assert_eq!(ids, vec![77]);
    }

    #[test]
    fn empty_admin_id_list_parses_to_nothing() {
        assert!(parse_admin_ids("").is_empty());
    }
}
