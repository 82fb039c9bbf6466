//! Small parsing helpers shared across the harvest pipeline.

use std::sync::OnceLock;

use regex::Regex;

/// Parse a localized abbreviated count ("1.2K", "4.5M", "1B", "327") into an
/// absolute number. Unknown or empty input is 0 — counters are best-effort
/// display strings, never worth failing a record over.
pub fn parse_count(raw: &str) -> u64 {
    let s = raw.trim();
    if s.is_empty() || s.eq_ignore_ascii_case("unknown") {
        return 0;
    }

    let (digits, multiplier) = match s.chars().last() {
        Some(c) if c.eq_ignore_ascii_case(&'k') => (&s[..s.len() - 1], 1_000_f64),
        Some(c) if c.eq_ignore_ascii_case(&'m') => (&s[..s.len() - 1], 1_000_000_f64),
        Some(c) if c.eq_ignore_ascii_case(&'b') => (&s[..s.len() - 1], 1_000_000_000_f64),
        _ => (s, 1_f64),
    };

    let digits = digits.trim().replace(',', "");
    match digits.parse::<f64>() {
        Ok(v) if v >= 0.0 => (v * multiplier).round() as u64,
        _ => 0,
    }
}

/// Pull the leading number out of a "View 12 replies" style label.
/// Returns 0 when no digit run is present ("View more replies", "Hide").
pub fn parse_reply_label(label: &str) -> u64 {
    static DIGITS: OnceLock<Regex> = OnceLock::new();
    let re = DIGITS.get_or_init(|| Regex::new(r"(\d[\d,]*)").expect("static regex"));
    re.captures(label)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().replace(',', ""))
        .and_then(|d| d.parse().ok())
        .unwrap_or(0)
}

fn video_url_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"tiktok\.com/@([^/]+)/(?:video|photo)/(\d+)").expect("static regex")
    })
}

/// Whether `url` points at a single video (or photo-mode post) page.
pub fn is_video_url(url: &str) -> bool {
    video_url_re().is_match(url)
}

/// Numeric post id from a video URL, when present.
pub fn video_id_from_url(url: &str) -> Option<String> {
    video_url_re()
        .captures(url)
        .and_then(|c| c.get(2))
        .map(|m| m.as_str().to_string())
}

/// Creator handle (`@` stripped) from a video or profile URL.
pub fn username_from_url(url: &str) -> Option<String> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"tiktok\.com/@([^/?#]+)").expect("static regex"));
    re.captures(url)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

/// Make `name` safe as a filename component: path separators and shell-hostile
/// characters become `_`, and the result is clamped so the full path stays
/// under common filesystem limits.
pub fn clean_filename(name: &str) -> String {
    const MAX_LEN: usize = 240;
    let cleaned: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' | '\0' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    let trimmed = cleaned.trim();
    if trimmed.len() <= MAX_LEN {
        trimmed.to_string()
    } else {
        let mut end = MAX_LEN;
        while !trimmed.is_char_boundary(end) {
            end -= 1;
        }
        trimmed[..end].to_string()
    }
}

/// Truncated single-line preview of a comment body, for logs and parent
/// references. Appends an ellipsis when anything was cut.
pub fn preview_of(text: &str, max_chars: usize) -> String {
    let flat = text.replace(['\n', '\r'], " ");
    let flat = flat.trim();
    if flat.chars().count() <= max_chars {
        return flat.to_string();
    }
    let mut out: String = flat.chars().take(max_chars).collect();
    out.push('…');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_abbreviated_counts() {
        assert_eq!(parse_count("1.2K"), 1_200);
        assert_eq!(parse_count("4.5M"), 4_500_000);
        assert_eq!(parse_count("1b"), 1_000_000_000);
        assert_eq!(parse_count("327"), 327);
        assert_eq!(parse_count("1,024"), 1_024);
    }

    #[test]
    fn bad_counts_default_to_zero() {
        assert_eq!(parse_count(""), 0);
        assert_eq!(parse_count("Unknown"), 0);
        assert_eq!(parse_count("-5"), 0);
        assert_eq!(parse_count("lots"), 0);
    }

    #[test]
    fn reply_labels_yield_their_number() {
        assert_eq!(parse_reply_label("View 12 replies"), 12);
        assert_eq!(parse_reply_label("View 1,204 replies"), 1_204);
        assert_eq!(parse_reply_label("View more replies"), 0);
    }

    #[test]
    fn recognizes_video_urls() {
        assert!(is_video_url("https://www.tiktok.com/@someone/video/7301234567890123456"));
        assert!(is_video_url("https://www.tiktok.com/@someone/photo/7301234567890123456"));
        assert!(!is_video_url("https://www.tiktok.com/@someone"));
        assert!(!is_video_url("https://example.com/watch?v=abc"));
    }

    #[test]
    fn extracts_video_id_and_username() {
        let url = "https://www.tiktok.com/@crafty.fox/video/7301234567890123456?lang=en";
        assert_eq!(
            video_id_from_url(url).as_deref(),
            Some("7301234567890123456")
        );
        assert_eq!(username_from_url(url).as_deref(), Some("crafty.fox"));
        assert_eq!(
            username_from_url("https://www.tiktok.com/@solo_handle").as_deref(),
            Some("solo_handle")
        );
    }

    #[test]
    fn filenames_are_sanitized() {
        assert_eq!(clean_filename("a/b:c*d"), "a_b_c_d");
        assert_eq!(clean_filename("  plain.csv  "), "plain.csv");
        let long = "x".repeat(400);
        assert!(clean_filename(&long).len() <= 240);
    }

    #[test]
    fn previews_truncate_with_ellipsis() {
        assert_eq!(preview_of("short", 10), "short");
        assert_eq!(preview_of("line\nbreak", 20), "line break");
        let p = preview_of("abcdefghij", 4);
        assert_eq!(p, "abcd…");
    }
}
