pub mod delete;
pub mod file_stream;
pub mod health;
pub mod upload;
