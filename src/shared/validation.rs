use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// At least one lowercase ASCII letter
    pub static ref LOWERCASE_REGEX: Regex = Regex::new(r"[a-z]").unwrap();

    /// At least one uppercase ASCII letter
    pub static ref UPPERCASE_REGEX: Regex = Regex::new(r"[A-Z]").unwrap();

    /// At least one digit
    pub static ref DIGIT_REGEX: Regex = Regex::new(r"[0-9]").unwrap();

    /// Six-digit verification code
    /// - Valid: "123456", "000001"
    /// - Invalid: "12345", "12a456", " 123456"
    pub static ref VERIFICATION_CODE_REGEX: Regex = Regex::new(r"^[0-9]{6}$").unwrap();
}

/// Password strength score in steps of 25.
///
/// One step each for: length of at least 8, a lowercase letter, an uppercase
/// letter, a digit.
pub fn password_strength(password: &str) -> u8 {
    let mut strength = 0;
    if password.chars().count() >= 8 {
        strength += 25;
    }
    if LOWERCASE_REGEX.is_match(password) {
        strength += 25;
    }
    if UPPERCASE_REGEX.is_match(password) {
        strength += 25;
    }
    if DIGIT_REGEX.is_match(password) {
        strength += 25;
    }
    strength
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_strength_steps() {
        assert_eq!(password_strength(""), 0);
        assert_eq!(password_strength("abc"), 25);
        assert_eq!(password_strength("abcdefgh"), 50);
        assert_eq!(password_strength("Abcdefgh"), 75);
        assert_eq!(password_strength("Abcdefg1"), 100);
    }

    #[test]
    fn test_short_password_can_still_score_75() {
        assert_eq!(password_strength("Ab1"), 75);
    }

    #[test]
    fn test_verification_code_regex() {
        assert!(VERIFICATION_CODE_REGEX.is_match("123456"));
        assert!(VERIFICATION_CODE_REGEX.is_match("000001"));
        assert!(!VERIFICATION_CODE_REGEX.is_match("12345"));
        assert!(!VERIFICATION_CODE_REGEX.is_match("12a456"));
        assert!(!VERIFICATION_CODE_REGEX.is_match(" 123456"));
    }
}
