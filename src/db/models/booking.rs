//! Booking models.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Done,
}

impl BookingStatus {
    pub const ALL: [&'static str; 3] = ["pending", "confirmed", "done"];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Done => "done",
        }
    }
}

impl Default for BookingStatus {
    fn default() -> Self {
        Self::Pending
    }
}

impl std::fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for BookingStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "confirmed" => Ok(Self::Confirmed),
            "done" => Ok(Self::Done),
            _ => Err(format!("Unknown booking status: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Booking {
    pub id: String,
    pub client_id: String,
    pub photographer_id: String,
    /// RFC 3339, normalized to UTC
    pub date: String,
    pub location: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl Booking {
    /// Unknown stored values are treated as not pending
    pub fn status_enum(&self) -> Option<BookingStatus> {
        self.status.parse().ok()
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateBookingRequest {
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub photographer_id: String,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub location: String,
    pub status: Option<String>,
    pub note: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateBookingRequest {
    pub client_id: Option<String>,
    pub photographer_id: Option<String>,
    pub date: Option<String>,
    pub location: Option<String>,
    pub status: Option<String>,
    pub note: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_booking_status_roundtrip() {
        for s in BookingStatus::ALL {
            let status: BookingStatus = s.parse().unwrap();
            assert_eq!(status.to_string(), s);
        }
        assert!("cancelled".parse::<BookingStatus>().is_err());
        assert_eq!(BookingStatus::default(), BookingStatus::Pending);
    }
}
