//! Ordered (tag, value) parameter blocks
//!
//! Both formats attach parameter lists to the file and to individual sequences.
//! Entries keep file order and duplicate tags are preserved.

use std::io::{Read, Write};

use crate::codec::{string_size, TableRead, TableWrite};
use crate::error::Result;

/// A single parameter entry
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TagValue {
    pub tag: String,
    pub value: String,
}
impl TagValue {
    pub fn new(tag: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ParameterList {
    entries: Vec<TagValue>,
}
impl ParameterList {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an entry at the end of the list
    pub fn append(&mut self, tag: impl Into<String>, value: impl Into<String>) {
        self.entries.push(TagValue::new(tag, value));
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the entry at position `index`
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&TagValue> {
        self.entries.get(index)
    }

    /// Returns the value of the first entry carrying `tag`
    #[must_use]
    pub fn find(&self, tag: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.tag == tag)
            .map(|e| e.value.as_str())
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TagValue> {
        self.entries.iter()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Reads `count` (tag, value) string pairs in file order
    pub fn read_entries<R: Read>(reader: &mut R, count: usize) -> Result<Self> {
        let mut entries = Vec::new();
        for _ in 0..count {
            let tag = reader.read_string("parameter tag")?;
            let value = reader.read_string("parameter value")?;
            entries.push(TagValue { tag, value });
        }
        Ok(Self { entries })
    }

    /// Writes every entry as a (tag, value) string pair
    ///
    /// The count is not written; each format places it differently.
    pub fn write_entries<W: Write>(&self, writer: &mut W) -> Result<()> {
        for entry in &self.entries {
            writer.write_string(&entry.tag)?;
            writer.write_string(&entry.value)?;
        }
        Ok(())
    }

    /// Number of bytes `write_entries` produces
    #[must_use]
    pub fn encoded_size(&self) -> usize {
        self.entries
            .iter()
            .map(|e| string_size(&e.tag) + string_size(&e.value))
            .sum()
    }
}

impl<'a> IntoIterator for &'a ParameterList {
    type Item = &'a TagValue;
    type IntoIter = std::slice::Iter<'a, TagValue>;
    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

impl FromIterator<TagValue> for ParameterList {
    fn from_iter<I: IntoIterator<Item = TagValue>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}
