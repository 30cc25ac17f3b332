use std::fs::File;
use std::io::{BufWriter, Write};
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};
use log::{debug, info};
use crate::core::error::{Error, Result};
use crate::core::file::FileEntries;
use crate::schema::column::Column;

/// Code point blocks whose single characters are left out of exports.
pub const EXCLUDED_RANGES: [RangeInclusive<u32>; 14] = [
    0x3400..=0x4DBF,   // CJK Unified Ideographs Extension A
    0x20000..=0x2A6DF, // Extension B
    0x2A700..=0x2B73F, // Extension C
    0x2B740..=0x2B81F, // Extension D
    0x2B820..=0x2CEAF, // Extension E
    0x2CEB0..=0x2EBEF, // Extension F
    0x30000..=0x3134F, // Extension G
    0x31350..=0x323AF, // Extension H
    0x2EBF0..=0x2EE5F, // Extension I
    0x323B0..=0x3347F, // Extension J
    0x3300..=0x33FF,   // CJK Compatibility
    0xFE30..=0xFE4F,   // CJK Compatibility Forms
    0xF900..=0xFAFF,   // CJK Compatibility Ideographs
    0x2F800..=0x2FA1F, // CJK Compatibility Ideographs Supplement
];

/// Text made of exactly one character from an excluded block.
pub fn is_excluded_text(text: &str) -> bool {
    let mut chars = text.chars();
    match (chars.next(), chars.next()) {
        (Some(ch), None) => EXCLUDED_RANGES.iter().any(|r| r.contains(&(ch as u32))),
        _ => false,
    }
}

/// Writes records of many files into one file, in one column projection.
pub struct Exporter {
    path: PathBuf,
    columns: Vec<Column>,
    writer: BufWriter<File>,
    written: usize,
}

impl Exporter {
    pub fn create(path: &Path, columns: &[Column]) -> Result<Self> {
        let file = File::create(path).map_err(|e| Error::io_at(path, e))?;
        Ok(Exporter {
            path: path.to_path_buf(),
            columns: columns.to_vec(),
            writer: BufWriter::new(file),
            written: 0,
        })
    }

    /// Append the live, non-excluded records of `file` in record order.
    pub fn write_file(&mut self, file: &FileEntries) -> Result<usize> {
        debug!("exporting {}", file.path.display());
        let mut count = 0;
        for entry in &file.entries {
            if entry.is_deleted() {
                continue;
            }
            let data = entry.data();
            if is_excluded_text(&data.text) {
                continue;
            }
            writeln!(self.writer, "{}", data.to_line_with(&self.columns))
                .map_err(|e| Error::io_at(&self.path, e))?;
            count += 1;
        }
        self.written += count;
        Ok(count)
    }

    /// Flush buffered lines. Returns the number of records written.
    pub fn finish(mut self) -> Result<usize> {
        self.writer.flush().map_err(|e| Error::io_at(&self.path, e))?;
        info!("exported {} records to {}", self.written, self.path.display());
        Ok(self.written)
    }
}
