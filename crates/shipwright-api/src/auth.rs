//! Shared-secret validation for the deployment webhook.

/// Checks a presented secret against the configured one.
pub fn validate_secret(presented: &str, configured: &str) -> bool {
    timing_safe_eq(presented, configured)
}

/// Timing-safe string comparison to prevent timing attacks.
///
/// Length is not secret here, so unequal lengths may return early.
fn timing_safe_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;
    for (a_byte, b_byte) in a.as_bytes().iter().zip(b.as_bytes().iter()) {
        result |= a_byte ^ b_byte;
    }

    result == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_matching_secret() {
        assert!(validate_secret("abc", "abc"));
    }

    #[test]
    fn rejects_near_miss() {
        assert!(!validate_secret("abc", "abd"));
    }

    #[test]
    fn rejects_length_mismatch() {
        assert!(!validate_secret("abc", "abcd"));
        assert!(!validate_secret("", "abc"));
    }
}
