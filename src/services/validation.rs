use once_cell::sync::Lazy;
use regex::Regex;

use crate::errors::{BookingError, FieldErrors};
use crate::models::ContactForm;
use crate::services::phone::{normalize_phone, PhonePolicy, NATIONAL_DIGITS};

pub const NAME_MIN_CHARS: usize = 2;
pub const NAME_MAX_CHARS: usize = 50;
pub const NOTES_MAX_CHARS: usize = 500;
pub const INPUT_MAX_CHARS: usize = 1000;

static NAME_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[\p{L}\s'\-]+$").unwrap());
static PHONE_CHARS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\+?[\d\s\-()]+$").unwrap());
static INTERNATIONAL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[1-9]\d{9,14}$").unwrap());

pub fn validate_name(name: &str) -> Option<String> {
    let name = name.trim();
    if name.is_empty() {
        return Some("Name is required".to_string());
    }
    let len = name.chars().count();
    if len < NAME_MIN_CHARS {
        return Some(format!(
            "Name must be at least {NAME_MIN_CHARS} characters long"
        ));
    }
    if len > NAME_MAX_CHARS {
        return Some(format!("Name must be at most {NAME_MAX_CHARS} characters"));
    }
    if !NAME_RE.is_match(name) {
        return Some(
            "Name can only contain letters, spaces, hyphens, and apostrophes".to_string(),
        );
    }
    None
}

pub fn validate_phone(phone: &str, policy: PhonePolicy, country_code: &str) -> Option<String> {
    let phone = phone.trim();
    if phone.is_empty() {
        return Some("Phone number is required".to_string());
    }
    if !PHONE_CHARS_RE.is_match(phone) {
        return Some("Please enter a valid phone number".to_string());
    }

    match policy {
        PhonePolicy::Strict => {
            let normalized = normalize_phone(phone, country_code);
            if normalized.len() != country_code.len() + NATIONAL_DIGITS {
                return Some(format!(
                    "Phone number must be +{country_code} followed by {NATIONAL_DIGITS} digits"
                ));
            }
        }
        PhonePolicy::International => {
            let digits: String = phone.chars().filter(|c| c.is_ascii_digit()).collect();
            if digits.len() < 10 {
                return Some("Phone number must be at least 10 digits".to_string());
            }
            if digits.len() > 15 {
                return Some("Phone number must be at most 15 digits".to_string());
            }
            if !INTERNATIONAL_RE.is_match(&digits) {
                return Some("Please enter a valid phone number".to_string());
            }
        }
    }
    None
}

pub fn validate_notes(notes: Option<&str>) -> Option<String> {
    match notes {
        Some(n) if n.trim().chars().count() > NOTES_MAX_CHARS => Some(format!(
            "Notes must be at most {NOTES_MAX_CHARS} characters"
        )),
        _ => None,
    }
}

/// Checks every field and reports all failures at once.
pub fn validate_contact_form(
    form: &ContactForm,
    policy: PhonePolicy,
    country_code: &str,
) -> Result<(), BookingError> {
    let mut errors = FieldErrors::new();
    if let Some(e) = validate_name(&form.name) {
        errors.insert("name".to_string(), e);
    }
    if let Some(e) = validate_phone(&form.phone, policy, country_code) {
        errors.insert("phone".to_string(), e);
    }
    if let Some(e) = validate_notes(form.notes.as_deref()) {
        errors.insert("notes".to_string(), e);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(BookingError::Validation(errors))
    }
}

/// Trims, strips angle brackets and caps free-text input.
pub fn sanitize_input(input: &str) -> String {
    input
        .trim()
        .chars()
        .filter(|c| *c != '<' && *c != '>')
        .take(INPUT_MAX_CHARS)
        .collect()
}
