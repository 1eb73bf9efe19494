use once_cell::sync::Lazy;
use regex::Regex;

/// Tokens stripped from titles before indexing. Matched as whole words on
/// the separator-collapsed, lowercased text, so multi-word entries use
/// single spaces.
const JUNK_TOKENS: &[&str] = &[
    "360p", "480p", "540p", "720p", "1080p", "2160p", "4k", "8k", "8bit", "10bit", "hdr", "sdr",
    "ds4k", "60fps", "hdrip", "webrip", "web dl", "webdl", "bluray", "blu ray", "brrip", "bdrip",
    "dvdrip", "dvdscr", "camrip", "hdcam", "hdtc", "hdts", "predvd", "hdtv", "x264", "x265",
    "h264", "h265", "hevc", "avc", "aac", "ac3", "eac3", "esub", "esubs", "msubs", "hindi",
    "english", "tamil", "telugu", "malayalam", "kannada", "bengali", "marathi", "punjabi",
    "gujarati", "urdu", "dual audio", "multi audio", "yts", "yify", "rarbg", "galaxyrg", "pahe",
    "amzn", "nf", "dsnp", "zee5", "sonyliv", "proper", "uncut", "untouched", "remastered", "mkv",
    "mp4", "avi", "webm",
];

static MENTION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(^|\s)@[a-z0-9_]{3,}").expect("valid mention regex"));
static SEPARATOR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[._\-\[\]\(\)\{\}+|:]+").expect("valid separator regex"));
static WHITESPACE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+").expect("valid whitespace regex"));
static URL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)https?://\S+|www\.\S+|t\.me/\S+").expect("valid url regex"));

static JUNK_RE: Lazy<Regex> = Lazy::new(|| {
    let mut tokens: Vec<&str> = JUNK_TOKENS.to_vec();
    tokens.sort_by_key(|token| std::cmp::Reverse(token.len()));
    let alternation = tokens
        .iter()
        .map(|token| regex::escape(token))
        .collect::<Vec<_>>()
        .join("|");
    Regex::new(&format!(r"\b(?:{alternation})\b")).expect("valid junk token regex")
});

/// Derives the search key stored in the catalog: lowercase, separators and
/// repeated whitespace collapsed to single spaces, @mentions and known
/// quality/codec/language/release tokens removed. Total and idempotent;
/// an empty or all-junk input yields an empty string.
pub fn normalize_title(raw: &str) -> String {
    let lowered = raw.to_lowercase();
    let without_mentions = MENTION_RE.replace_all(&lowered, " ");
    let separated = SEPARATOR_RE.replace_all(&without_mentions, " ");
    let without_junk = JUNK_RE.replace_all(&separated, " ");
    WHITESPACE_RE
        .replace_all(&without_junk, " ")
        .trim()
        .to_string()
}

pub fn contains_url(text: &str) -> bool {
    URL_RE.is_match(text)
}

/// The original's "spelling correction": retry a failed lookup with the
/// longest word of the query. Returns None when the query has fewer than
/// two words (the retry would repeat the original lookup).
pub fn longest_word(query: &str) -> Option<&str> {
    let mut words = query.split_whitespace();
    let first = words.next()?;
    let mut longest = first;
    let mut multiple = false;
    for word in words {
        multiple = true;
        if word.chars().count() > longest.chars().count() {
            longest = word;
        }
    }
    multiple.then_some(longest)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_release_junk_and_separators() {
        let cleaned = normalize_title("Pathaan.2023.1080p.WEB-DL.Hindi.x264-YTS");
        assert_eq!(cleaned, "pathaan 2023");
    }

    #[test]
    fn strips_mentions_and_bracketed_tags() {
        let cleaned = normalize_title("KGF Chapter 2 [2022] 4K HEVC @MoviezHub");
        assert_eq!(cleaned, "kgf chapter 2 2022");
    }

    #[test]
    fn normalization_is_idempotent() {
        let samples = [
            "Jawan (2023) 720p WEBRip Dual Audio ESubs",
            "  plain   title  ",
            "",
            "1080p x265",
        ];
        for sample in samples {
            let once = normalize_title(sample);
            assert_eq!(normalize_title(&once), once);
        }
    }

    #[test]
    fn all_junk_input_collapses_to_empty() {
        assert_eq!(normalize_title("720p.BluRay.x264"), "");
        assert_eq!(normalize_title(""), "");
    }

    #[test]
    fn detects_urls_for_the_spam_guard() {
        assert!(contains_url("watch https://example.com/movie now"));
        assert!(contains_url("join t.me/somechannel"));
        assert!(!contains_url("pathaan 2023"));
    }

    #[test]
    fn longest_word_needs_at_least_two_words() {
        assert_eq!(longest_word("pathaan full movie"), Some("pathaan"));
        assert_eq!(longest_word("pathaan"), None);
        assert_eq!(longest_word(""), None);
    }
}
