use crate::error::{AppError, Result};

/// Normalizes a customer-supplied phone number to the gateway's required
/// MSISDN shape (`2547XXXXXXXX` / `2541XXXXXXXX`).
///
/// Accepts `07…`/`01…` local forms, `+254…`, and bare `254…`, with optional
/// spaces or dashes. Anything else fails with `InvalidExternalAccount`
/// before any network call is made.
pub fn normalize_msisdn(raw: &str) -> Result<String> {
    let cleaned: String = raw
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '-')
        .collect();

    let digits = cleaned.strip_prefix('+').unwrap_or(&cleaned);

    if digits.chars().any(|c| !c.is_ascii_digit()) {
        return Err(invalid(raw));
    }

    let msisdn = if let Some(rest) = digits.strip_prefix("254") {
        format!("254{rest}")
    } else if let Some(rest) = digits.strip_prefix('0') {
        format!("254{rest}")
    } else {
        return Err(invalid(raw));
    };

    if msisdn.len() != 12 {
        return Err(invalid(raw));
    }
    if !msisdn.starts_with("2547") && !msisdn.starts_with("2541") {
        return Err(invalid(raw));
    }

    Ok(msisdn)
}

fn invalid(raw: &str) -> AppError {
    AppError::InvalidExternalAccount(raw.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_forms() {
        assert_eq!(normalize_msisdn("0712345678").unwrap(), "254712345678");
        assert_eq!(normalize_msisdn("0112345678").unwrap(), "254112345678");
    }

    #[test]
    fn test_international_forms() {
        assert_eq!(normalize_msisdn("+254712345678").unwrap(), "254712345678");
        assert_eq!(normalize_msisdn("254712345678").unwrap(), "254712345678");
    }

    #[test]
    fn test_spaces_and_dashes_are_stripped() {
        assert_eq!(normalize_msisdn("0712 345-678").unwrap(), "254712345678");
        assert_eq!(normalize_msisdn("+254 712 345 678").unwrap(), "254712345678");
    }

    #[test]
    fn test_rejects_wrong_length() {
        assert!(normalize_msisdn("07123").is_err());
        assert!(normalize_msisdn("07123456789").is_err());
        assert!(normalize_msisdn("2547123456789").is_err());
    }

    #[test]
    fn test_rejects_wrong_prefix() {
        assert!(normalize_msisdn("0812345678").is_err());
        assert!(normalize_msisdn("254812345678").is_err());
        assert!(normalize_msisdn("441234567890").is_err());
    }

    #[test]
    fn test_rejects_non_digits() {
        assert!(normalize_msisdn("07one23456").is_err());
        assert!(normalize_msisdn("").is_err());
    }
}
