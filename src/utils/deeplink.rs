use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;

const FILE_PREFIX: &str = "file_";
const ALL_PREFIX: &str = "all_";

/// Decoded `/start` payload. Anything that does not parse cleanly maps to
/// `None` and is handled upstream as "not found" rather than an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartPayload {
    File(i64),
    All(String),
}

pub fn build_file_link(bot_username: &str, id: i64) -> String {
    format!("https://t.me/{bot_username}?start={FILE_PREFIX}{id}")
}

pub fn build_all_link(bot_username: &str, query: &str) -> String {
    let encoded = URL_SAFE_NO_PAD.encode(query.as_bytes());
    format!("https://t.me/{bot_username}?start={ALL_PREFIX}{encoded}")
}

pub fn parse_start_payload(arg: &str) -> Option<StartPayload> {
    let arg = arg.trim();
    if let Some(raw_id) = arg.strip_prefix(FILE_PREFIX) {
        return raw_id.parse::<i64>().ok().map(StartPayload::File);
    }
    if let Some(encoded) = arg.strip_prefix(ALL_PREFIX) {
        let bytes = URL_SAFE_NO_PAD.decode(encoded).ok()?;
        let query = String::from_utf8(bytes).ok()?;
        let query = query.trim().to_string();
        if query.is_empty() {
            return None;
        }
        return Some(StartPayload::All(query));
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_link_round_trips() {
        let link = build_file_link("movie_bot", 42);
        assert_eq!(link, "https://t.me/movie_bot?start=file_42");
        assert_eq!(parse_start_payload("file_42"), Some(StartPayload::File(42)));
    }

    #[test]
    fn all_link_round_trips_the_query() {
        let link = build_all_link("movie_bot", "pathaan 2023");
        let payload = link.rsplit("start=").next().unwrap();
        assert_eq!(
            parse_start_payload(payload),
            Some(StartPayload::All("pathaan 2023".to_string()))
        );
    }

    #[test]
    fn malformed_payloads_parse_to_none() {
        assert_eq!(parse_start_payload("file_abc"), None);
        assert_eq!(parse_start_payload("file_"), None);
        assert_eq!(parse_start_payload("all_%%%"), None);
        assert_eq!(parse_start_payload("all_"), None);
        assert_eq!(parse_start_payload("unrelated"), None);
        assert_eq!(parse_start_payload(""), None);
    }
}
