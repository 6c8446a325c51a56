//! Student registry models.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::common::parse_string_list;

/// Stored row; `minat` is a JSON array of interests
#[derive(Debug, Clone, FromRow)]
pub struct Mahasiswa {
    pub npm: i64,
    pub nama: String,
    pub prodi: String,
    pub fakultas: String,
    pub alamat: Option<String>,
    pub minat: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MahasiswaResponse {
    pub npm: i64,
    pub nama: String,
    pub prodi: String,
    pub fakultas: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alamat: Option<String>,
    pub minat: Vec<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Mahasiswa> for MahasiswaResponse {
    fn from(m: Mahasiswa) -> Self {
        let minat = parse_string_list(&m.minat);
        Self {
            npm: m.npm,
            nama: m.nama,
            prodi: m.prodi,
            fakultas: m.fakultas,
            alamat: m.alamat,
            minat,
            created_at: m.created_at,
            updated_at: m.updated_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateMahasiswaRequest {
    #[serde(default)]
    pub npm: i64,
    #[serde(default)]
    pub nama: String,
    #[serde(default)]
    pub prodi: String,
    #[serde(default)]
    pub fakultas: String,
    pub alamat: Option<String>,
    #[serde(default)]
    pub minat: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateMahasiswaRequest {
    pub nama: Option<String>,
    pub prodi: Option<String>,
    pub fakultas: Option<String>,
    pub alamat: Option<String>,
    pub minat: Option<Vec<String>>,
}

/// Envelope used by every student registry response
#[derive(Debug, Serialize)]
pub struct MahasiswaEnvelope<T: Serialize> {
    pub status: u16,
    pub message: String,
    pub data: T,
}
