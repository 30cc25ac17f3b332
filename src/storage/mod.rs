pub mod header;
pub mod loader;
pub mod sequence;
