pub mod config;
pub mod dictionary;
pub mod entry;
pub mod error;
pub mod file;
pub mod item;
pub mod session;
pub mod types;
