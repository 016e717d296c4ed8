//! Avatar assignment from an email address.
//!
//! The hash reproduces the 32-bit string hash already used for existing
//! accounts, so an email always maps to the avatar it was given before.

use crate::models::Avatar;

/// Hash an email over its UTF-16 code units.
///
/// Each step computes `c + ((h << 5) - h)` where the shift operates on `h`
/// wrapped to a signed 32-bit integer and the subtraction does not wrap.
pub fn email_hash(email: &str) -> i64 {
    email.encode_utf16().fold(0i64, |h, unit| {
        i64::from(unit) + (i64::from((h as i32).wrapping_shl(5)) - h)
    })
}

/// Avatar for a new account
pub fn assign_avatar(email: &str) -> Avatar {
    // rem_euclid has the parity of |h| for negative hashes too
    Avatar::from_number(email_hash(email).rem_euclid(2) as u8)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_email_hash_reference_values() {
        assert_eq!(email_hash(""), 0);
        assert_eq!(email_hash("x"), 120);
        assert_eq!(email_hash("ab"), 3105);
        assert_eq!(email_hash("a@example.com"), -667974242);
        assert_eq!(email_hash("asha@example.com"), -6708839704);
        assert_eq!(email_hash("student@school.edu"), -2876310175);
        assert_eq!(email_hash("josé@ex.com"), -1512867125);
    }

    #[test]
    fn test_assign_avatar() {
        assert_eq!(assign_avatar("a@example.com"), Avatar::Male);
        assert_eq!(assign_avatar("ab"), Avatar::Female);
        assert_eq!(assign_avatar("student@school.edu"), Avatar::Female);
        assert_eq!(assign_avatar("josé@ex.com"), Avatar::Female);
    }

    #[test]
    fn test_assignment_is_stable() {
        assert_eq!(
            assign_avatar("ravi.k@example.com"),
            assign_avatar("ravi.k@example.com")
        );
    }
}
