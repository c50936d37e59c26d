//! Deterministic text helpers used by the research pipeline.
//!
//! Everything here is lossy on purpose: outputs feed search phrases and LLM prompts, not
//! anything that has to round-trip.

use regex::Regex;
use std::sync::OnceLock;

/// Upper bound on keywords taken from a query.
pub const MAX_KEYWORDS: usize = 8;

/// Label used when a query yields no keywords.
pub const FALLBACK_KEYWORDS: &str = "general research";

fn keyword_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b[a-z]{4,}\b").expect("valid keyword regex"))
}

fn tag_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<[^>]+>").expect("valid tag regex"))
}

fn ws_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").expect("valid whitespace regex"))
}

fn boilerplate_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)(cookies|privacy policy|subscribe|terms)").expect("valid boilerplate regex")
    })
}

/// Lowercase alphabetic words of 4+ letters, in order of appearance, at most
/// [`MAX_KEYWORDS`]. Duplicates are kept.
pub fn extract_keywords(text: &str) -> Vec<String> {
    let lower = text.to_lowercase();
    keyword_re()
        .find_iter(&lower)
        .take(MAX_KEYWORDS)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Keywords joined with `", "`, or [`FALLBACK_KEYWORDS`] when there are none.
pub fn keywords_label(query: &str) -> String {
    let joined = extract_keywords(query).join(", ");
    if joined.is_empty() {
        FALLBACK_KEYWORDS.to_string()
    } else {
        joined
    }
}

fn clean_once(text: &str) -> String {
    let s = tag_re().replace_all(text, " ");
    let s = ws_re().replace_all(&s, " ");
    let s = boilerplate_re().replace_all(&s, "");
    s.trim().to_string()
}

/// Strip markup, collapse whitespace, and delete boilerplate words anywhere they occur.
///
/// Deleting a word can expose a new match ("cookcookiesies") or leave a double space, so
/// the pass is repeated until nothing changes.
pub fn clean_text(text: &str) -> String {
    let mut cur = clean_once(text);
    loop {
        let next = clean_once(&cur);
        if next == cur {
            return cur;
        }
        cur = next;
    }
}

/// Prefix of `s` holding at most `max_chars` characters.
pub fn truncate_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

fn bold_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\*\*(.*?)\*\*").expect("valid bold regex"))
}

fn italic_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\*(.*?)\*").expect("valid italic regex"))
}

fn blank_lines_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\n{2,}").expect("valid newline regex"))
}

/// Flatten a Markdown report into plain readable text (for terminals and TTS-style output).
pub fn plain_text_summary(summary: &str) -> String {
    if summary.is_empty() {
        return String::new();
    }
    let s = summary.replace("#### ", "").replace("### ", "");
    let s = bold_re().replace_all(&s, "$1");
    let s = italic_re().replace_all(&s, "$1");
    let s = s.replace("- ", "• ");
    let s = blank_lines_re().replace_all(&s, "\n");
    s.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn keywords_keep_order_and_skip_short_words() {
        assert_eq!(
            extract_keywords("Market trends for electric vehicles"),
            vec!["market", "trends", "electric", "vehicles"]
        );
    }

    #[test]
    fn keywords_are_capped_and_keep_duplicates() {
        let kw = extract_keywords("alpha alpha bravo charlie delta echoes foxtrot golfs hotel india");
        assert_eq!(kw.len(), MAX_KEYWORDS);
        assert_eq!(kw[0], "alpha");
        assert_eq!(kw[1], "alpha");
        assert_eq!(kw[7], "golfs");
    }

    #[test]
    fn keyword_label_falls_back_when_nothing_matches() {
        assert_eq!(keywords_label("AI is ok"), FALLBACK_KEYWORDS);
        assert_eq!(keywords_label(""), FALLBACK_KEYWORDS);
        assert_eq!(keywords_label("AI note-taking apps"), "note, taking, apps");
    }

    #[test]
    fn clean_strips_tags_whitespace_and_boilerplate() {
        let s = clean_text("<p>Accept   Cookies</p>\n\n<b>Great</b> product. Subscribe now!");
        assert_eq!(s, "Accept Great product. now!");
    }

    #[test]
    fn clean_mangles_words_containing_boilerplate() {
        // Known approximation: matches inside words are removed too.
        assert_eq!(clean_text("determsine"), "deine");
    }

    #[test]
    fn clean_reaches_a_fixed_point_on_nested_matches() {
        assert_eq!(clean_text("cookcookiesies"), "");
        assert_eq!(clean_text("a terms b"), "a b");
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("abc", 10), "abc");
        assert_eq!(truncate_chars("abc", 0), "");
    }

    #[test]
    fn plain_text_summary_flattens_markdown() {
        let md = "### Market\n\n\n- **Big** player\n- *niche* one\n#### Notes";
        assert_eq!(plain_text_summary(md), "Market\n• Big player\n• niche one\nNotes");
        assert_eq!(plain_text_summary(""), "");
    }

    proptest! {
        #[test]
        fn clean_is_idempotent(s in "[a-zA-Z <>/\\n\\t.]{0,80}") {
            let once = clean_text(&s);
            prop_assert_eq!(clean_text(&once), once.clone());
        }

        #[test]
        fn clean_is_idempotent_with_boilerplate(parts in proptest::collection::vec(
            prop_oneof![
                Just("cookies".to_string()),
                Just("Privacy Policy".to_string()),
                Just("subscribe".to_string()),
                Just("terms".to_string()),
                Just(" ".to_string()),
                Just("<br>".to_string()),
                "[a-z]{1,4}",
            ],
            0..12,
        )) {
            let s = parts.concat();
            let once = clean_text(&s);
            prop_assert_eq!(clean_text(&once), once.clone());
        }
    }
}
