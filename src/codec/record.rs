use crate::codec::input::ParsedInput;
use crate::schema::column::Column;

/// Typed projection of one dictionary line.
///
/// `weight == 0` means the weight is unset; it serializes as an empty field.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Data {
    pub text: String,
    pub code: String,
    pub stem: String,
    pub weight: i64,
    pub columns: Vec<Column>,
}

impl Data {
    /// Parse an already tab-separated line against a declared schema.
    ///
    /// Tokens are consumed column by column, except that a token that is not
    /// an integer is not consumed by a weight column: it is retried against
    /// the next column, so an omitted weight does not shift later fields.
    pub fn parse(raw: &str, columns: &[Column]) -> Data {
        let tokens: Vec<&str> = raw.split('\t').map(str::trim).collect();
        let mut data = Data {
            columns: columns.to_vec(),
            ..Data::default()
        };

        let mut next = 0;
        for column in columns {
            let Some(token) = tokens.get(next) else {
                break;
            };
            match column {
                Column::Weight => {
                    if token.is_empty() {
                        next += 1;
                    } else if let Ok(weight) = token.parse::<i64>() {
                        data.weight = weight;
                        next += 1;
                    }
                }
                Column::Text => {
                    data.text = token.to_string();
                    next += 1;
                }
                Column::Code => {
                    data.code = token.to_string();
                    next += 1;
                }
                Column::Stem => {
                    data.stem = token.to_string();
                    next += 1;
                }
            }
        }
        data
    }

    /// Build a record from free-text input, keeping the order in which the
    /// input established its fields.
    pub fn from_input(input: &ParsedInput) -> Data {
        let mut data = Data::default();
        for (column, value) in input.columns.iter().zip(&input.values) {
            data.set(*column, value);
        }
        data.columns = input.columns.clone();
        data
    }

    pub fn get(&self, column: Column) -> String {
        match column {
            Column::Text => self.text.clone(),
            Column::Code => self.code.clone(),
            Column::Stem => self.stem.clone(),
            Column::Weight if self.weight == 0 => String::new(),
            Column::Weight => self.weight.to_string(),
        }
    }

    pub fn set(&mut self, column: Column, value: &str) {
        match column {
            Column::Text => self.text = value.to_string(),
            Column::Code => self.code = value.to_string(),
            Column::Stem => self.stem = value.to_string(),
            Column::Weight => self.weight = value.trim().parse().unwrap_or(0),
        }
    }

    pub fn reset_columns(&mut self, columns: &[Column]) {
        self.columns = columns.to_vec();
    }

    /// Serialize in this record's own column order.
    pub fn to_line(&self) -> String {
        self.to_line_with(&self.columns)
    }

    /// Serialize in an arbitrary column order.
    ///
    /// Empty fields between non-empty ones keep their tab so columns stay
    /// aligned; leading and trailing empty fields produce nothing.
    pub fn to_line_with(&self, columns: &[Column]) -> String {
        let fields: Vec<String> = columns.iter().map(|c| self.get(*c)).collect();
        let end = fields.iter().rposition(|f| !f.is_empty()).map_or(0, |i| i + 1);
        let start = fields.iter().position(|f| !f.is_empty()).unwrap_or(end);
        fields[start..end].join("\t")
    }
}
