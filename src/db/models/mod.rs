//! Stored records and request/response DTOs, one module per collection.

pub mod booking;
pub mod client;
pub mod common;
pub mod gallery;
pub mod mahasiswa;
pub mod photographer;
pub mod transaction;
pub mod user;

pub use booking::*;
pub use client::*;
pub use common::*;
pub use gallery::*;
pub use mahasiswa::*;
pub use photographer::*;
pub use transaction::*;
pub use user::*;
