//! URL list parsing for command-line and piped input.
//!
//! Input is whitespace-separated; blank lines and lines starting with `#` are
//! ignored. Tokens are passed through as-is: an unfetchable URL still gets an
//! outcome, classified when its attempts run out.

/// Extracts the URLs from a block of text.
#[must_use]
pub fn parse_url_list(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .flat_map(str::split_whitespace)
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_url_list_one_per_line() {
        let urls = parse_url_list("https://a.example/x.bin\nhttps://b.example/y.bin\n");
        assert_eq!(urls, vec!["https://a.example/x.bin", "https://b.example/y.bin"]);
    }

    #[test]
    fn test_parse_url_list_skips_blank_and_comment_lines() {
        let text = "# model files\n\n  https://a.example/config.json  \n   # trailing note\n";
        assert_eq!(parse_url_list(text), vec!["https://a.example/config.json"]);
    }

    #[test]
    fn test_parse_url_list_splits_whitespace() {
        let urls = parse_url_list("https://a.example/1 https://a.example/2\thttps://a.example/3");
        assert_eq!(urls.len(), 3);
    }

    #[test]
    fn test_parse_url_list_keeps_duplicates_and_order() {
        let urls = parse_url_list("https://a.example/f\nhttps://a.example/f");
        assert_eq!(urls, vec!["https://a.example/f", "https://a.example/f"]);
    }

    #[test]
    fn test_parse_url_list_empty() {
        assert!(parse_url_list("").is_empty());
        assert!(parse_url_list("\n# only comments\n").is_empty());
    }
}
