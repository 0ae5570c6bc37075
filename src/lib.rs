pub mod prelude;
pub mod error;
pub mod config;
pub mod file_callback;
pub mod scene;
