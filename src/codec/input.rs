use crate::schema::column::Column;

/// Fields recognised in a line typed by the user, in the order the input
/// first established them.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ParsedInput {
    pub values: Vec<String>,
    pub columns: Vec<Column>,
}

impl ParsedInput {
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn value_of(&self, column: Column) -> Option<&str> {
        self.columns.iter()
            .position(|c| *c == column)
            .map(|i| self.values[i].as_str())
    }
}

pub fn is_number(token: &str) -> bool {
    token.bytes().all(|b| b.is_ascii_digit())
}

struct Slot<'a> {
    column: Column,
    tokens: Vec<&'a str>,
}

fn slot_index(slots: &[Slot], column: Column) -> Option<usize> {
    slots.iter().position(|s| s.column == column)
}

fn slot_mut<'s, 'a>(slots: &'s mut Vec<Slot<'a>>, column: Column) -> &'s mut Vec<&'a str> {
    let index = match slot_index(slots, column) {
        Some(i) => i,
        None => {
            slots.push(Slot { column, tokens: Vec::new() });
            slots.len() - 1
        }
    };
    &mut slots[index].tokens
}

/// Parse unordered, human-typed input such as `"mao 猫 5"`.
///
/// Digits become the weight, the first ASCII token the code and the other
/// ASCII tokens the stem (or more code when `has_stem` is off); the rest is
/// text, joined with single spaces. Input without any text demotes its
/// first ASCII token to text and promotes the second one to code.
pub fn parse_input(raw: &str, has_stem: bool) -> ParsedInput {
    let mut slots: Vec<Slot> = Vec::new();

    for token in raw.split_whitespace() {
        if is_number(token) {
            let weight = slot_mut(&mut slots, Column::Weight);
            weight.clear();
            weight.push(token);
        } else if token.is_ascii() {
            if slot_index(&slots, Column::Code).is_none() || !has_stem {
                slot_mut(&mut slots, Column::Code).push(token);
            } else {
                slot_mut(&mut slots, Column::Stem).push(token);
            }
        } else {
            slot_mut(&mut slots, Column::Text).push(token);
        }
    }

    if slot_index(&slots, Column::Text).is_none() {
        demote_code_to_text(&mut slots);
    }

    ParsedInput {
        values: slots.iter().map(|s| s.tokens.join(" ")).collect(),
        columns: slots.iter().map(|s| s.column).collect(),
    }
}

fn demote_code_to_text(slots: &mut Vec<Slot>) {
    let Some(code_at) = slot_index(slots, Column::Code) else {
        return;
    };
    let mut latin: Vec<&str> = slots[code_at].tokens.drain(..).collect();
    let stem_at = slot_index(slots, Column::Stem);
    if let Some(i) = stem_at {
        latin.extend(slots[i].tokens.drain(..));
    }

    let mut rest = latin.into_iter();
    slots[code_at] = Slot { column: Column::Text, tokens: rest.next().into_iter().collect() };
    let Some(second) = rest.next() else {
        if let Some(i) = stem_at {
            slots.remove(i);
        }
        return;
    };
    let remainder: Vec<&str> = rest.collect();

    match stem_at {
        Some(i) if remainder.is_empty() => {
            slots[i] = Slot { column: Column::Code, tokens: vec![second] };
        }
        Some(i) => {
            slots[i].tokens = remainder;
            slots.insert(i, Slot { column: Column::Code, tokens: vec![second] });
        }
        None => {
            let mut tokens = vec![second];
            tokens.extend(remainder);
            slots.insert(code_at + 1, Slot { column: Column::Code, tokens });
        }
    }
}
