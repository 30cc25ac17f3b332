pub mod cache;
pub mod cancel;
pub mod engine;
pub mod matcher;
pub mod results;
