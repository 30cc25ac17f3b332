pub mod column;
pub mod inference;
