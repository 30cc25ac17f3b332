pub mod debounce;
pub mod export;
pub mod guard;
pub mod patch;
