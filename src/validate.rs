//! Client-side input checks shared by the auth and OTP flows.
//!
//! Validation failures are reported inline and never reach the network.

use std::sync::OnceLock;

use regex::Regex;

static EMAIL_RE: OnceLock<Regex> = OnceLock::new();

/// Same shape check the storefront forms apply before submitting.
pub fn is_valid_email(email: &str) -> bool {
    let re = EMAIL_RE
        .get_or_init(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email regex is valid"));
    re.is_match(email)
}

/// OTP codes are exactly six ASCII digits.
pub fn is_six_digits(code: &str) -> bool {
    code.len() == 6 && code.chars().all(|c| c.is_ascii_digit())
}
