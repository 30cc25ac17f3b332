use crate::core::error::{Error, ErrorKind, Result};
use crate::schema::column::Column;

/// Classify one raw field: any non-ASCII char makes it text, pure ASCII
/// digits make it a weight, everything else is code.
pub fn classify_field(field: &str) -> Column {
    if !field.is_ascii() {
        return Column::Text;
    }
    if !field.is_empty() && field.bytes().all(|b| b.is_ascii_digit()) {
        Column::Weight
    } else {
        Column::Code
    }
}

/// Infer a column schema from the fields of the first valid data line.
///
/// The line must contain exactly one text field and exactly one code
/// field; weights are optional and may appear anywhere.
pub fn infer_columns(fields: &[&str]) -> Result<Vec<Column>> {
    let columns: Vec<Column> = fields.iter().map(|f| classify_field(f)).collect();
    let text_count = columns.iter().filter(|c| **c == Column::Text).count();
    let code_count = columns.iter().filter(|c| **c == Column::Code).count();

    if text_count == 1 && code_count == 1 {
        Ok(columns)
    } else {
        Err(Error::new(
            ErrorKind::Parse,
            format!(
                "cannot infer columns: need one text and one code field, found {} text and {} code",
                text_count, code_count
            ),
        ))
    }
}
