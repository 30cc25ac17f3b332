use serde::{Serialize, Deserialize};

/// Small stable identifier given to each loaded dictionary file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FileId(pub u32);

impl FileId {
    pub fn new(id: u32) -> Self {
        FileId(id)
    }

    pub fn value(&self) -> u32 {
        self.0
    }
}

impl From<u32> for FileId {
    fn from(id: u32) -> Self {
        FileId(id)
    }
}

/// Pending mutation of a record relative to the last committed file snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ModifyType {
    #[default]
    Unchanged,
    Deleted,
    Modified,
    Added,
}

impl ModifyType {
    pub fn label(&self) -> &'static str {
        match self {
            ModifyType::Unchanged => "NC",
            ModifyType::Deleted => "DEL",
            ModifyType::Modified => "MOD",
            ModifyType::Added => "ADD",
        }
    }
}
