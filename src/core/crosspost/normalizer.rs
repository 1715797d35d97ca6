// Message normalization - reduces a raw chat message to a comparable string.
//
// Markup, links and platform references are noise for duplicate detection:
// two posts that differ only in bold markers or a pinged role are still the
// same post.

use once_cell::sync::Lazy;
use regex::Regex;

/// Messages shorter than this (after normalization) are never compared.
pub const MIN_MESSAGE_LENGTH: usize = 10;

static RE_CODE_BLOCK: Lazy<Regex> = Lazy::new(|| Regex::new(r"```[\s\S]*?```").unwrap());
static RE_INLINE_CODE: Lazy<Regex> = Lazy::new(|| Regex::new(r"`[^`]+`").unwrap());
static RE_BOLD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*\*([^*]+)\*\*").unwrap());
static RE_ITALIC: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*([^*]+)\*").unwrap());
static RE_UNDERLINE: Lazy<Regex> = Lazy::new(|| Regex::new(r"__([^_]+)__").unwrap());
static RE_STRIKE: Lazy<Regex> = Lazy::new(|| Regex::new(r"~~([^~]+)~~").unwrap());
static RE_URL: Lazy<Regex> = Lazy::new(|| Regex::new(r"https?://\S+").unwrap());

static RE_REFERENCES: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        Regex::new(r"<@!?\d+>").unwrap(),   // user mentions
        Regex::new(r"<#\d+>").unwrap(),     // channel mentions
        Regex::new(r"<@&\d+>").unwrap(),    // role mentions
        Regex::new(r"<a?:\w+:\d+>").unwrap(), // custom emoji
    ]
});

static RE_WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Normalize a message body for similarity comparison.
///
/// Lowercases, drops code (fenced and inline), unwraps emphasis markup,
/// removes URLs, mentions and custom emoji, then collapses whitespace.
/// Unterminated markup is left as literal text.
///
/// The transformation is repeated until it stops changing the string, so
/// `normalize(normalize(s)) == normalize(s)` holds even for inputs like
/// `<@<@1>2>` where one removal exposes another token.
pub fn normalize(raw: &str) -> String {
    // After the first pass every change strictly shortens the string.
    let mut current = single_pass(raw);
    loop {
        let next = single_pass(&current);
        if next == current {
            break;
        }
        current = next;
    }
    current
}

fn single_pass(raw: &str) -> String {
    if raw.is_empty() {
        return String::new();
    }

    let text = raw.to_lowercase();
    let text = RE_CODE_BLOCK.replace_all(&text, "");
    let text = RE_INLINE_CODE.replace_all(&text, "");
    let text = RE_BOLD.replace_all(&text, "${1}");
    let text = RE_ITALIC.replace_all(&text, "${1}");
    let text = RE_UNDERLINE.replace_all(&text, "${1}");
    let text = RE_STRIKE.replace_all(&text, "${1}");
    let mut text = RE_URL.replace_all(&text, "").into_owned();

    for pattern in RE_REFERENCES.iter() {
        text = pattern.replace_all(&text, "").into_owned();
    }

    RE_WHITESPACE.replace_all(&text, " ").trim().to_string()
}

/// Length used for the minimum-length gate (in characters, not bytes).
pub fn normalized_len(raw: &str) -> usize {
    normalize(raw).chars().count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_input() {
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("   \n\t "), "");
    }

    #[test]
    fn test_lowercases_and_collapses_whitespace() {
        assert_eq!(normalize("  Hello   WORLD\n\nagain "), "hello world again");
    }

    #[test]
    fn test_strips_code() {
        assert_eq!(
            normalize("look ```rust\nfn main() {}\n``` here"),
            "look here"
        );
        assert_eq!(normalize("run `cargo test` now"), "run now");
    }

    #[test]
    fn test_unwraps_emphasis() {
        assert_eq!(
            normalize("**Big** *small* __under__ ~~gone~~"),
            "big small under gone"
        );
    }

    #[test]
    fn test_removes_links_and_references() {
        let raw = "Join <@123> and <@!456> in <#789> with <@&42> <:wave:1234> <a:spin:99> https://example.com/x?y=1 today";
        assert_eq!(normalize(raw), "join and in with today");
    }

    #[test]
    fn test_unterminated_fence_is_literal() {
        assert_eq!(normalize("```not closed"), "```not closed");
    }

    #[test]
    fn test_idempotent() {
        let samples = [
            "**Please** check out our NEW channel: https://discord.gg/abc <#1>",
            "***triple*** ___under___ ~~~strike~~~",
            "<@<@1>2> nested tokens",
            "`a` `b` ``c``",
            "plain text",
        ];
        let deep = (0..12).fold("1".to_string(), |inner, i| format!("<@{inner}{i}>"));
        let deep = format!("hello world {deep}");
        for sample in samples.iter().copied().chain([deep.as_str()]) {
            let once = normalize(sample);
            assert_eq!(normalize(&once), once, "not idempotent for {sample:?}");
        }
    }

    #[test]
    fn test_normalized_len_counts_chars() {
        assert_eq!(normalized_len("ÉÉÉÉÉ"), 5);
        assert!(normalized_len("hi <@1>") < MIN_MESSAGE_LENGTH);
    }
}
