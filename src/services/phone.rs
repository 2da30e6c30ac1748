/// Domestic trunk prefix that stands in for the country code.
pub const TRUNK_PREFIX: char = '8';

/// Digits after the country code under [`PhonePolicy::Strict`].
pub const NATIONAL_DIGITS: usize = 9;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PhonePolicy {
    /// Country code followed by exactly [`NATIONAL_DIGITS`] digits.
    #[default]
    Strict,
    /// Any 10 to 15 digit number not starting with 0.
    International,
}

impl PhonePolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            PhonePolicy::Strict => "strict",
            PhonePolicy::International => "international",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "international" | "intl" => PhonePolicy::International,
            _ => PhonePolicy::Strict,
        }
    }

    /// The digits sent to the backend for a number this policy accepted.
    /// Strict numbers are coerced into `country_code`; international
    /// numbers already carry their own country code and keep it.
    pub fn normalize(&self, raw: &str, country_code: &str) -> String {
        match self {
            PhonePolicy::Strict => normalize_phone(raw, country_code),
            PhonePolicy::International => raw.chars().filter(|c| c.is_ascii_digit()).collect(),
        }
    }
}

/// Canonical digit form sent to the backend for SMS delivery, e.g.
/// `+998 (90) 123-45-67` → `998901234567`.
///
/// Idempotent: the output always starts with `country_code`, which is
/// returned unchanged on a second pass.
pub fn normalize_phone(raw: &str, country_code: &str) -> String {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();

    if digits.starts_with(country_code) {
        return digits;
    }
    match digits.strip_prefix(TRUNK_PREFIX) {
        Some(rest) => format!("{country_code}{rest}"),
        None => format!("{country_code}{digits}"),
    }
}
