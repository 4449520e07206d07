use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

/// Canonicalizers for identity-bearing fields.
///
/// These produce comparison forms only: the stored display value is never
/// rewritten by normalization, except where the data model itself is
/// canonical (email lowercase, phone `+1` digits).

// RFC 5322 simplified email pattern, requiring at least one dot label in the
// domain (local@domain.tld).
static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)+$",
    )
    .expect("email regex is valid")
});

/// Normalizes a URL for comparison: no scheme, no `www.` prefix, no query
/// string or fragment, no trailing slash, lowercase host and path.
///
/// Returns `None` for values that cannot be parsed as a URL.
pub fn normalize_url(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    // Bare "linkedin.com/in/x" inputs parse once a scheme is supplied.
    let with_scheme = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("https://{}", trimmed)
    };

    let parsed = match Url::parse(&with_scheme) {
        Ok(url) => url,
        Err(e) => {
            tracing::debug!("Unparsable URL '{}': {}", raw, e);
            return None;
        }
    };

    let host = parsed.host_str()?.to_lowercase();
    let host = host.strip_prefix("www.").unwrap_or(&host).to_string();
    if host.is_empty() {
        return None;
    }

    let path = parsed.path().trim_end_matches('/').to_lowercase();
    if path.is_empty() {
        Some(host)
    } else {
        Some(format!("{}{}", host, path))
    }
}

/// Normalizes an email for comparison and storage: trimmed and lowercased.
///
/// Anything failing the basic `local@domain.tld` pattern is treated as
/// absent rather than stored as junk.
pub fn normalize_email(raw: &str) -> Option<String> {
    let lowered = raw.trim().to_lowercase();
    if lowered.is_empty() {
        return None;
    }
    if !EMAIL_RE.is_match(&lowered) {
        tracing::debug!("Rejecting malformed email: {}", raw);
        return None;
    }
    Some(lowered)
}

/// Extracts the domain part of an already-normalized email.
pub fn email_domain(email: &str) -> Option<String> {
    email.rsplit_once('@').map(|(_, domain)| domain.to_string())
}

/// Normalizes a phone number to `+1XXXXXXXXXX` form.
///
/// Strips every non-digit character; 10 digits get a `+1` country prefix,
/// 11 digits with a leading `1` get a `+`. Anything else is unparsable and
/// returns `None` rather than a guess.
pub fn normalize_phone(raw: &str) -> Option<String> {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    match digits.len() {
        10 => Some(format!("+1{}", digits)),
        11 if digits.starts_with('1') => Some(format!("+{}", digits)),
        _ => {
            if !digits.is_empty() {
                tracing::debug!("Unparsable phone '{}' ({} digits)", raw, digits.len());
            }
            None
        }
    }
}

/// Case-folds and whitespace-collapses a name or company string for
/// comparison. The display value is never case-folded in storage.
pub fn normalize_name(raw: &str) -> String {
    raw.to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_strips_scheme_www_query_and_slash() {
        assert_eq!(
            normalize_url("https://www.linkedin.com/in/johnsmith/?utm=x"),
            Some("linkedin.com/in/johnsmith".to_string())
        );
        assert_eq!(
            normalize_url("http://LinkedIn.com/in/JohnSmith"),
            Some("linkedin.com/in/johnsmith".to_string())
        );
        assert_eq!(
            normalize_url("linkedin.com/in/johnsmith"),
            Some("linkedin.com/in/johnsmith".to_string())
        );
    }

    #[test]
    fn test_url_host_only() {
        assert_eq!(
            normalize_url("https://example.com/"),
            Some("example.com".to_string())
        );
    }

    #[test]
    fn test_url_rejects_garbage() {
        assert_eq!(normalize_url(""), None);
        assert_eq!(normalize_url("   "), None);
    }

    #[test]
    fn test_url_idempotent() {
        let once = normalize_url("https://www.linkedin.com/in/JohnSmith/").unwrap();
        let twice = normalize_url(&once).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_email_lowercases() {
        assert_eq!(
            normalize_email("BOB@EXAMPLE.COM"),
            Some("bob@example.com".to_string())
        );
    }

    #[test]
    fn test_email_rejects_malformed() {
        assert_eq!(normalize_email("not-an-email"), None);
        assert_eq!(normalize_email("user@nodot"), None);
        assert_eq!(normalize_email("@example.com"), None);
        assert_eq!(normalize_email(""), None);
    }

    #[test]
    fn test_phone_ten_digits() {
        assert_eq!(
            normalize_phone("(555) 123-4567"),
            Some("+15551234567".to_string())
        );
    }

    #[test]
    fn test_phone_eleven_digits_leading_one() {
        assert_eq!(
            normalize_phone("1-555-123-4567"),
            Some("+15551234567".to_string())
        );
        assert_eq!(
            normalize_phone("+1 555 123 4567"),
            Some("+15551234567".to_string())
        );
    }

    #[test]
    fn test_phone_unparsable_is_none() {
        assert_eq!(normalize_phone("12345"), None);
        assert_eq!(normalize_phone("25551234567"), None);
        assert_eq!(normalize_phone("no digits here"), None);
    }

    #[test]
    fn test_name_casefold_and_collapse() {
        assert_eq!(normalize_name("  John   SMITH "), "john smith");
    }

    #[test]
    fn test_email_domain() {
        assert_eq!(
            email_domain("bob@techcorp.com"),
            Some("techcorp.com".to_string())
        );
        assert_eq!(email_domain("nodomain"), None);
    }
}
