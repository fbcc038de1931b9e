pub mod models;
pub mod multipart;
pub mod upload_service;
