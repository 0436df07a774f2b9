use url::Url;

/// Decide whether an href is worth sending a webmention for.
///
/// Rules apply in order, first failure rejects: plain `http://` links,
/// empty / site-relative / fragment-only hrefs, hrefs padded with
/// whitespace or carrying control characters, unparseable URLs, and any
/// scheme other than `https`.
pub fn is_valid_link(href: &str) -> bool {
    if href.starts_with("http://") {
        return false;
    }
    if href.is_empty() || href.starts_with('/') || href.starts_with('#') {
        return false;
    }
    // Url::parse strips surrounding whitespace and controls; the raw href must not need it
    if href.trim() != href || href.chars().any(char::is_control) {
        return false;
    }
    match Url::parse(href) {
        Ok(url) => url.scheme() == "https",
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_absolute_https() {
        assert!(is_valid_link("https://anytarget"));
        assert!(is_valid_link("https://example.com/posts/1?ref=feed#top"));
    }

    #[test]
    fn test_rejects_plain_http() {
        assert!(!is_valid_link("http://example.com"));
    }

    #[test]
    fn test_rejects_relative_and_fragments() {
        assert!(!is_valid_link(""));
        assert!(!is_valid_link("/relativepath1"));
        assert!(!is_valid_link("/long/relative/path2"));
        assert!(!is_valid_link("//example.com/protocol-relative"));
        assert!(!is_valid_link("#fragment1"));
    }

    #[test]
    fn test_rejects_other_schemes() {
        assert!(!is_valid_link("sftp://ugh/no/ftp"));
        assert!(!is_valid_link("mailto://why/would/anyone/use/mail/links"));
        assert!(!is_valid_link("mailto:someone@example.com"));
        assert!(!is_valid_link("javascript:void(0)"));
    }

    #[test]
    fn test_rejects_unparseable() {
        assert!(!is_valid_link("alskjdf://@#$asdf"));
        assert!(!is_valid_link("relative/path/without/slash"));
        assert!(!is_valid_link("https://exa mple.com"));
    }

    #[test]
    fn test_rejects_padded_and_control_characters() {
        assert!(!is_valid_link(" https://x.example"));
        assert!(!is_valid_link("https://x.example "));
        assert!(!is_valid_link("https://x.example\n"));
        assert!(!is_valid_link("\thttps://x.example"));
        assert!(!is_valid_link("https://x.example/a\u{7f}b"));
    }
}
