//! Secret redaction for user-facing output.
//!
//! Credential values never appear verbatim in plans, rationale text, or
//! logs. Short values are fully masked; longer ones keep just enough of
//! the ends to be recognizable.

/// Redact a secret for display: values of 8 chars or fewer render as
/// `***`; longer values render `first4…last2`.
pub fn redact_secret(value: &str) -> String {
    let chars: Vec<char> = value.chars().collect();
    if chars.len() <= 8 {
        return "***".to_string();
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 2..].iter().collect();
    format!("{head}\u{2026}{tail}")
}

/// Redact the value part of an HTTP header line (`Name: value`),
/// leaving the header name readable.
pub fn redact_header(header: &str) -> String {
    match header.split_once(':') {
        Some((name, value)) => format!("{}: {}", name.trim(), redact_secret(value.trim())),
        None => redact_secret(header),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_values_fully_masked() {
        assert_eq!(redact_secret(""), "***");
        assert_eq!(redact_secret("hunter2"), "***");
        assert_eq!(redact_secret("12345678"), "***");
    }

    #[test]
    fn long_values_keep_ends() {
        assert_eq!(redact_secret("123456789"), "1234\u{2026}89");
        assert_eq!(
            redact_secret("Bearer eyJhbGciOiJIUzI1NiJ9"),
            "Bear\u{2026}J9"
        );
    }

    #[test]
    fn header_keeps_name() {
        assert_eq!(
            redact_header("Authorization: Bearer secrettoken123"),
            "Authorization: Bear\u{2026}23"
        );
    }
}
