//! Client profile models.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Contact details attached to a user with the `client` role
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Client {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub phone: String,
    pub address: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateClientRequest {
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub address: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateClientRequest {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
}
