use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Gallery {
    pub id: String,
    pub photographer_id: String,
    pub title: String,
    pub image_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateGalleryRequest {
    #[serde(default)]
    pub photographer_id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub image_url: String,
    pub description: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateGalleryRequest {
    pub photographer_id: Option<String>,
    pub title: Option<String>,
    pub image_url: Option<String>,
    pub description: Option<String>,
}
