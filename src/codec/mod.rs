pub mod input;
pub mod record;

pub use input::{parse_input, ParsedInput};
pub use record::Data;
