pub mod disk_service;
pub mod retention;
