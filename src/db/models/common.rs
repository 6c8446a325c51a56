//! Helpers shared across models.

/// Parse a JSON string array column (portfolio URLs, interests)
pub fn parse_string_list(json: &str) -> Vec<String> {
    serde_json::from_str(json).unwrap_or_default()
}

/// Serialize a string list for storage in a TEXT column
pub fn serialize_string_list(items: &[String]) -> String {
    serde_json::to_string(items).unwrap_or_else(|_| "[]".to_string())
}

/// Treat `None`, empty and whitespace-only strings alike: "not provided".
///
/// Partial updates only touch a column when this returns `Some`.
pub fn provided(value: &Option<String>) -> Option<&str> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
}
