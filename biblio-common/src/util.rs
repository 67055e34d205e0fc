//! Utility functions for Biblio services.

use std::sync::OnceLock;

/// Truncate a string to at most `max_chars` characters, appending "..." if truncated.
///
/// This function safely handles multi-byte UTF-8 characters (emoji, accented characters)
/// by using character boundaries instead of byte indices.
pub fn truncate_with_ellipsis(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => {
            let truncated = &s[..idx];
            format!("{}...", truncated.trim_end())
        }
        None => s.to_string(),
    }
}

fn secret_patterns() -> &'static [(regex::Regex, &'static str)] {
    static PATTERNS: OnceLock<Vec<(regex::Regex, &'static str)>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            (r"(?i)(api[_-]?key|apikey)[=:]\s*\S{8,}", "$1=***REDACTED***"),
            (r"(?i)(bearer)\s+\S{10,}", "$1 ***REDACTED***"),
            (r"sk-[a-zA-Z0-9_-]{16,}", "***REDACTED_API_KEY***"),
        ]
        .into_iter()
        .filter_map(|(pattern, replacement)| {
            regex::Regex::new(pattern).ok().map(|re| (re, replacement))
        })
        .collect()
    })
}

/// Sanitize a string for safe logging (redact API keys and bearer tokens).
///
/// Upstream error bodies sometimes echo the request headers back.
pub fn sanitize_for_log(s: &str) -> String {
    let mut result = s.to_string();
    for (re, replacement) in secret_patterns() {
        result = re.replace_all(&result, *replacement).to_string();
    }
    result
}

/// Lower-case and trim, the normalization every word-list check works on.
pub fn normalize(s: &str) -> String {
    s.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn test_truncate_with_ellipsis() {
        assert_eq!(truncate_with_ellipsis("hello", 10), "hello");
        assert_eq!(truncate_with_ellipsis("hello world", 5), "hello...");
        assert_eq!(truncate_with_ellipsis("📚📚📚📚", 2), "📚📚...");
        assert_eq!(truncate_with_ellipsis("", 10), "");
    }

    #[test]
    fn test_sanitize_for_log() {
        let input = "401 from upstream: api_key=sk-proj-12345678901234567890";
        let output = sanitize_for_log(input);
        assert!(!output.contains("sk-proj-12345678901234567890"));
        assert!(output.contains("REDACTED"));

        let bearer = sanitize_for_log("Authorization: Bearer abcdefghijklmnop");
        assert!(!bearer.contains("abcdefghijklmnop"));
    }

    #[test_case("  Olá  ", "olá" ; "trims and lowercases accents")]
    #[test_case("DUNE", "dune" ; "ascii upper")]
    #[test_case("", "" ; "empty")]
    fn test_normalize(input: &str, expected: &str) {
        assert_eq!(normalize(input), expected);
    }
}
