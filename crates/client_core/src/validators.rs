use std::sync::LazyLock;

use regex::Regex;

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\S+@\S+\.\S+$").expect("email pattern"));

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Validator {
    Require,
    MinLength(usize),
    MaxLength(usize),
    Min(f64),
    Max(f64),
    Email,
    /// File presence is decided by the picker, so this always passes.
    File,
}

impl Validator {
    pub fn check(&self, value: &str) -> bool {
        match *self {
            Self::Require => !value.trim().is_empty(),
            Self::MinLength(min) => value.trim().chars().count() >= min,
            Self::MaxLength(max) => value.trim().chars().count() <= max,
            Self::Min(min) => parse_number(value).is_some_and(|n| n >= min),
            Self::Max(max) => parse_number(value).is_some_and(|n| n <= max),
            Self::Email => EMAIL_RE.is_match(value),
            Self::File => true,
        }
    }
}

fn parse_number(value: &str) -> Option<f64> {
    value.trim().parse::<f64>().ok()
}

/// True when every validator accepts `value`.
pub fn validate(value: &str, validators: &[Validator]) -> bool {
    validators.iter().all(|validator| validator.check(value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn require_rejects_blank() {
        assert!(!validate("", &[Validator::Require]));
        assert!(!validate("   ", &[Validator::Require]));
        assert!(validate("test", &[Validator::Require]));
    }

    #[test]
    fn email_shape() {
        for email in ["test", "test@", "test@.com", "@test.com", "a b@c.d"] {
            assert!(!validate(email, &[Validator::Email]), "{email}");
        }
        assert!(validate("test@example.com", &[Validator::Email]));
    }

    #[test]
    fn length_bounds_are_inclusive() {
        assert!(!validate("test", &[Validator::MinLength(5)]));
        assert!(validate("test", &[Validator::MinLength(4)]));
        assert!(validate("testing", &[Validator::MinLength(4)]));

        assert!(!validate("testing", &[Validator::MaxLength(5)]));
        assert!(validate("test", &[Validator::MaxLength(4)]));
        assert!(validate("test", &[Validator::MaxLength(5)]));
    }

    #[test]
    fn numeric_bounds() {
        assert!(validate("10", &[Validator::Min(5.0), Validator::Max(10.0)]));
        assert!(!validate("4.5", &[Validator::Min(5.0)]));
        assert!(!validate("eleven", &[Validator::Max(20.0)]));
    }

    #[test]
    fn combined_rules() {
        let rules = [
            Validator::Require,
            Validator::MinLength(5),
            Validator::MaxLength(10),
        ];
        assert!(!validate("", &rules));
        assert!(!validate("test", &rules));
        assert!(!validate("verylongstring", &rules));
        assert!(validate("valid123", &rules));

        let email_rules = [Validator::Require, Validator::Email];
        assert!(!validate("", &email_rules));
        assert!(!validate("notanemail", &email_rules));
        assert!(validate("test@example.com", &email_rules));
    }

    #[test]
    fn no_rules_accepts_anything() {
        assert!(validate("", &[]));
        assert!(validate("", &[Validator::File]));
    }
}
