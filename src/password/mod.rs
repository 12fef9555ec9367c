//! Password strength heuristic for the sign-up and reset-password flows.

use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;

/// Minimum length the backend accepts for new passwords.
pub const MIN_PASSWORD_LENGTH: usize = 12;

lazy_static! {
    static ref UPPERCASE: Regex = Regex::new("[A-Z]").unwrap();
    static ref LOWERCASE: Regex = Regex::new("[a-z]").unwrap();
    static ref DIGIT: Regex = Regex::new(r"\d").unwrap();
    static ref SPECIAL: Regex = Regex::new(r#"[!@#$%^&*(),.?":{}|<>]"#).unwrap();
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
pub struct PasswordChecks {
    pub length: bool,
    pub uppercase: bool,
    pub lowercase: bool,
    pub digit: bool,
    pub special: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StrengthLabel {
    Empty,
    Weak,
    Medium,
    Strong,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PasswordStrength {
    pub score: u8,
    pub label: StrengthLabel,
    pub checks: PasswordChecks,
}

/// Score a candidate password: one point per satisfied check, all five for
/// "Strong", three or more for "Medium", anything else non-empty "Weak".
pub fn evaluate(password: &str) -> PasswordStrength {
    if password.is_empty() {
        return PasswordStrength {
            score: 0,
            label: StrengthLabel::Empty,
            checks: PasswordChecks::default(),
        };
    }

    let checks = PasswordChecks {
        length: password.chars().count() >= MIN_PASSWORD_LENGTH,
        uppercase: UPPERCASE.is_match(password),
        lowercase: LOWERCASE.is_match(password),
        digit: DIGIT.is_match(password),
        special: SPECIAL.is_match(password),
    };

    let score = [
        checks.length,
        checks.uppercase,
        checks.lowercase,
        checks.digit,
        checks.special,
    ]
    .iter()
    .filter(|&&ok| ok)
    .count() as u8;

    let label = match score {
        5 => StrengthLabel::Strong,
        3 | 4 => StrengthLabel::Medium,
        _ => StrengthLabel::Weak,
    };

    PasswordStrength {
        score,
        label,
        checks,
    }
}
