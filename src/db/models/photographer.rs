//! Photographer profile models.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::common::parse_string_list;

/// Stored row; `portfolio` is a JSON array of URLs
#[derive(Debug, Clone, FromRow)]
pub struct Photographer {
    pub id: String,
    pub user_id: String,
    pub phone: String,
    pub description: String,
    pub portfolio: String,
    pub location: String,
    pub profile_photo: String,
    pub created_at: String,
    pub updated_at: String,
}

impl Photographer {
    pub fn portfolio_urls(&self) -> Vec<String> {
        parse_string_list(&self.portfolio)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhotographerResponse {
    pub id: String,
    pub user_id: String,
    pub phone: String,
    pub description: String,
    pub portfolio: Vec<String>,
    pub location: String,
    pub profile_photo: String,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Photographer> for PhotographerResponse {
    fn from(p: Photographer) -> Self {
        let portfolio = p.portfolio_urls();
        Self {
            id: p.id,
            user_id: p.user_id,
            phone: p.phone,
            description: p.description,
            portfolio,
            location: p.location,
            profile_photo: p.profile_photo,
            created_at: p.created_at,
            updated_at: p.updated_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreatePhotographerRequest {
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub portfolio: Vec<String>,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub profile_photo: String,
}

/// Partial profile update, from a JSON body or a multipart form
#[derive(Debug, Default, Deserialize)]
pub struct UpdatePhotographerRequest {
    pub phone: Option<String>,
    pub description: Option<String>,
    pub portfolio: Option<Vec<String>>,
    pub location: Option<String>,
    pub profile_photo: Option<String>,
}
