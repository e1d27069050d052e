// =====================================================================================
// VALIDATION SERVICE - EMAIL, LINK & MARKUP CHECKS
// =====================================================================================

use std::sync::LazyLock;

use regex::Regex;
use reqwest::Url;

static EMAIL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern compiles")
});

pub struct ValidationService;

impl ValidationService {
    /// Simple `local@domain.tld` shape check.
    pub fn validate_email(email: &str) -> bool {
        EMAIL_PATTERN.is_match(email)
    }

    /// Absolute URL with an `http` or `https` scheme. Rejects `javascript:`, `data:` and friends.
    pub fn is_allowed_link(link: &str) -> bool {
        match Url::parse(link) {
            Ok(url) => matches!(url.scheme(), "http" | "https"),
            Err(_) => false,
        }
    }

    /// Entity-encodes user text before it is placed into an HTML email.
    pub fn escape_html(input: &str) -> String {
        let mut escaped = String::with_capacity(input.len());
        for c in input.chars() {
            match c {
                '&' => escaped.push_str("&amp;"),
                '<' => escaped.push_str("&lt;"),
                '>' => escaped.push_str("&gt;"),
                '"' => escaped.push_str("&quot;"),
                '\'' => escaped.push_str("&#x27;"),
                other => escaped.push(other),
            }
        }
        escaped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_shapes() {
        assert!(ValidationService::validate_email("jane@example.com"));
        assert!(ValidationService::validate_email("a.b+c@sub.example.co"));
        assert!(!ValidationService::validate_email("jane@example"));
        assert!(!ValidationService::validate_email("jane example@x.com"));
        assert!(!ValidationService::validate_email("@example.com"));
    }

    #[test]
    fn only_web_links_are_allowed() {
        assert!(ValidationService::is_allowed_link("https://onedrive.live.com/x"));
        assert!(ValidationService::is_allowed_link("http://example.com/file"));
        assert!(!ValidationService::is_allowed_link("javascript:alert(1)"));
        assert!(!ValidationService::is_allowed_link("data:text/html,hi"));
        assert!(!ValidationService::is_allowed_link("ftp://example.com/a"));
        assert!(!ValidationService::is_allowed_link("onedrive.live.com/x"));
    }

    #[test]
    fn markup_is_escaped() {
        assert_eq!(
            ValidationService::escape_html("<b>Tom & \"Jerry\"</b>"),
            "&lt;b&gt;Tom &amp; &quot;Jerry&quot;&lt;/b&gt;"
        );
    }
}
