//! Input validation for API requests.
//!
//! Validators are keyed by semantics rather than by entity and return
//! `Result<(), String>`. Handlers collect the failures per field with the
//! `ValidationErrorBuilder` from the `error` module.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// Phone numbers: digits only, 8 to 15 of them
    static ref PHONE_REGEX: Regex = Regex::new(r"^\d{8,15}$").unwrap();

    static ref EMAIL_REGEX: Regex = Regex::new(
        r"^[a-zA-Z0-9._%+\-]+@[a-zA-Z0-9.\-]+\.[a-zA-Z]{2,}$"
    ).unwrap();
}

/// Minimum password length accepted at registration and login
pub const MIN_PASSWORD_LEN: usize = 8;
pub const MIN_NAME_LEN: usize = 3;
pub const MAX_NAME_LEN: usize = 50;

/// Validate a required string whose trimmed length (in characters) lies in `min..=max`
pub fn validate_required(value: &str, field: &str, min: usize, max: usize) -> Result<(), String> {
    let len = value.trim().chars().count();

    if len == 0 {
        return Err(format!("{} is required", field));
    }

    if len < min {
        return Err(format!("{} is too short (min {} characters)", field, min));
    }

    if len > max {
        return Err(format!("{} is too long (max {} characters)", field, max));
    }

    Ok(())
}

/// Validate an optional free-text field against a maximum length
pub fn validate_max_len(value: &str, field: &str, max: usize) -> Result<(), String> {
    if value.chars().count() > max {
        return Err(format!("{} is too long (max {} characters)", field, max));
    }
    Ok(())
}

pub fn validate_phone(phone: &str) -> Result<(), String> {
    if phone.trim().is_empty() {
        return Err("Phone is required".to_string());
    }

    if !PHONE_REGEX.is_match(phone.trim()) {
        return Err("Phone must contain 8 to 15 digits".to_string());
    }

    Ok(())
}

pub fn validate_email(email: &str) -> Result<(), String> {
    if email.trim().is_empty() {
        return Err("Email is required".to_string());
    }

    if email.len() > 254 || !EMAIL_REGEX.is_match(email.trim()) {
        return Err("Invalid email format".to_string());
    }

    Ok(())
}

/// Validate a person's display name
/// Person names: 3 to 50 letters (any script) or spaces, counted after trimming
pub fn validate_person_name(name: &str) -> Result<(), String> {
    let name = name.trim();
    if name.is_empty() {
        return Err("Name is required".to_string());
    }

    let len = name.chars().count();
    if !(MIN_NAME_LEN..=MAX_NAME_LEN).contains(&len)
        || !name.chars().all(|c| c.is_alphabetic() || c.is_whitespace())
    {
        return Err("Name must be 3-50 characters and contain only letters and spaces".to_string());
    }

    Ok(())
}

pub fn validate_password(password: &str) -> Result<(), String> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        ));
    }
    Ok(())
}

/// Validate membership in a fixed set of values (case sensitive)
pub fn validate_one_of(value: &str, field: &str, allowed: &[&str]) -> Result<(), String> {
    if value.is_empty() {
        return Err(format!("{} is required", field));
    }

    if !allowed.contains(&value) {
        return Err(format!(
            "Invalid {}. Must be one of: {}",
            field,
            allowed.join(", ")
        ));
    }

    Ok(())
}

/// Validate a strictly positive, finite number
pub fn validate_positive(value: f64, field: &str) -> Result<(), String> {
    if !value.is_finite() || value <= 0.0 {
        return Err(format!("{} must be greater than 0", field));
    }
    Ok(())
}

/// Validate a UUID
pub fn validate_uuid(id: &str, field_name: &str) -> Result<(), String> {
    if id.is_empty() {
        return Err(format!("{} is required", field_name));
    }

    if uuid::Uuid::parse_str(id).is_err() {
        return Err(format!("Invalid {} format", field_name));
    }

    Ok(())
}

/// Parse an RFC 3339 timestamp and normalize it to UTC
pub fn parse_rfc3339(value: &str, field: &str) -> Result<String, String> {
    if value.trim().is_empty() {
        return Err(format!("{} is required", field));
    }

    chrono::DateTime::parse_from_rfc3339(value.trim())
        .map(|dt| dt.with_timezone(&chrono::Utc).to_rfc3339())
        .map_err(|_| format!("Invalid {} format. Use RFC 3339, e.g. 2024-05-01T09:00:00Z", field))
}

/// Every entry of a URL list must be non-blank and an http(s) address
pub fn validate_url_list(urls: &[String], field: &str) -> Result<(), String> {
    for (i, url) in urls.iter().enumerate() {
        let url = url.trim();
        if url.is_empty() {
            return Err(format!("{}[{}] must not be empty", field, i));
        }
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(format!("{}[{}] must be an http(s) URL", field, i));
        }
    }
    Ok(())
}

/// Parse a student number path segment
pub fn parse_npm(raw: &str) -> Result<i64, String> {
    match raw.trim().parse::<i64>() {
        Ok(npm) if npm > 0 => Ok(npm),
        _ => Err("NPM must be a positive number".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_required() {
        assert!(validate_required("Budi", "Name", 3, 100).is_ok());
        assert!(validate_required("Bob", "Name", 3, 100).is_ok());

        assert!(validate_required("", "Name", 3, 100).is_err());
        assert!(validate_required("   ", "Name", 3, 100).is_err());
        assert!(validate_required("Bo", "Name", 3, 100).is_err());
        assert!(validate_required(&"x".repeat(101), "Name", 3, 100).is_err());
        // Character count, not bytes
        assert!(validate_required("Ñoño", "Name", 3, 4).is_ok());
    }

    #[test]
    fn test_validate_max_len() {
        assert!(validate_max_len("", "Description", 500).is_ok());
        assert!(validate_max_len(&"a".repeat(500), "Description", 500).is_ok());
        assert!(validate_max_len(&"a".repeat(501), "Description", 500).is_err());
    }

    #[test]
    fn test_validate_phone() {
        assert!(validate_phone("08123456789").is_ok());
        assert!(validate_phone("12345678").is_ok());
        assert!(validate_phone("123456789012345").is_ok());

        assert!(validate_phone("").is_err());
        assert!(validate_phone("1234567").is_err());
        assert!(validate_phone("1234567890123456").is_err());
        assert!(validate_phone("+628123456789").is_err());
        assert!(validate_phone("0812-3456-789").is_err());
    }

    #[test]
    fn test_validate_email() {
        assert!(validate_email("ayu@example.com").is_ok());
        assert!(validate_email("first.last+tag@mail.co.id").is_ok());

        assert!(validate_email("").is_err());
        assert!(validate_email("not-an-email").is_err());
        assert!(validate_email("a@b").is_err());
        assert!(validate_email("a@b.c").is_err());
    }

    #[test]
    fn test_validate_person_name() {
        assert!(validate_person_name("Ayu Lestari").is_ok());
        assert!(validate_person_name("Bob").is_ok());

        assert!(validate_person_name("").is_err());
        assert!(validate_person_name("Al").is_err());
        assert!(validate_person_name("R2D2").is_err());
        assert!(validate_person_name(&"a".repeat(51)).is_err());
    }

    #[test]
    fn test_validate_person_name_accepts_non_ascii_letters() {
        assert!(validate_person_name("José Núñez").is_ok());
        assert!(validate_person_name("Çağla Öztürk").is_ok());
        assert!(validate_person_name("José-Núñez").is_err());
    }

    #[test]
    fn test_validate_person_name_counts_trimmed_length() {
        assert!(validate_person_name("  Al  ").is_err());
        assert!(validate_person_name("   ").is_err());
        assert!(validate_person_name("  Ayu  ").is_ok());

        let padded = format!(" {} ", "a".repeat(50));
        assert!(validate_person_name(&padded).is_ok());
    }

    #[test]
    fn test_validate_password() {
        assert!(validate_password("rahasia123").is_ok());
        assert!(validate_password("short").is_err());
    }

    #[test]
    fn test_validate_one_of() {
        let allowed = ["transfer", "ewallet"];
        assert!(validate_one_of("transfer", "method", &allowed).is_ok());
        assert!(validate_one_of("ewallet", "method", &allowed).is_ok());

        assert!(validate_one_of("", "method", &allowed).is_err());
        assert!(validate_one_of("cash", "method", &allowed).is_err());
        assert!(validate_one_of("Transfer", "method", &allowed).is_err());
    }

    #[test]
    fn test_validate_positive() {
        assert!(validate_positive(150000.0, "total").is_ok());
        assert!(validate_positive(0.01, "total").is_ok());

        assert!(validate_positive(0.0, "total").is_err());
        assert!(validate_positive(-5.0, "total").is_err());
        assert!(validate_positive(f64::NAN, "total").is_err());
        assert!(validate_positive(f64::INFINITY, "total").is_err());
    }

    #[test]
    fn test_validate_uuid() {
        assert!(validate_uuid("550e8400-e29b-41d4-a716-446655440000", "booking_id").is_ok());
        assert!(validate_uuid("", "booking_id").is_err());
        assert!(validate_uuid("not-a-uuid", "booking_id").is_err());
        assert!(validate_uuid("64b7f0c2e4b0a1a2b3c4d5e6", "booking_id").is_err());
    }

    #[test]
    fn test_parse_rfc3339_normalizes_to_utc() {
        let parsed = parse_rfc3339("2024-05-01T16:00:00+07:00", "date").unwrap();
        assert_eq!(parsed, "2024-05-01T09:00:00+00:00");

        assert!(parse_rfc3339("2024-05-01T09:00:00Z", "date").is_ok());
        assert!(parse_rfc3339("2024-05-01", "date").is_err());
        assert!(parse_rfc3339("", "date").is_err());
    }

    #[test]
    fn test_validate_url_list() {
        let ok = vec![
            "https://cdn.example.com/a.jpg".to_string(),
            "http://example.com/b.png".to_string(),
        ];
        assert!(validate_url_list(&ok, "portfolio").is_ok());
        assert!(validate_url_list(&[], "portfolio").is_ok());

        assert!(validate_url_list(&["".to_string()], "portfolio").is_err());
        assert!(validate_url_list(&["ftp://x/y".to_string()], "portfolio").is_err());
    }

    #[test]
    fn test_parse_npm() {
        assert_eq!(parse_npm("1214001"), Ok(1214001));
        assert!(parse_npm("0").is_err());
        assert!(parse_npm("-3").is_err());
        assert!(parse_npm("abc").is_err());
        assert_eq!(
            parse_npm("12.5").unwrap_err(),
            "NPM must be a positive number"
        );
    }
}
