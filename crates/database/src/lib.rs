pub mod basic_db;
pub mod file_storage;
