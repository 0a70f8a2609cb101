use csv::StringRecordIter;
use std::collections::HashMap;

use super::Row;

/// Header names whose columns are carried along the chain but never written.
pub fn is_internal(name: &str) -> bool {
    name.starts_with('_')
}

/// A structure for keeping relationship between the headers and their positions
#[derive(Debug, Clone, PartialEq)]
pub struct Headers {
    indexes: HashMap<String, usize>,
    names: Row,
}

impl Headers {
    pub fn from_row(row: Row) -> Headers {
        let mut indexes = HashMap::new();

        for (index, entry) in row.iter().enumerate() {
            indexes.entry(entry.to_string()).or_insert(index);
        }

        Headers {
            indexes,
            names: row,
        }
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn as_row(&self) -> &Row {
        &self.names
    }

    pub fn get(&self, field: &str) -> Option<usize> {
        self.indexes.get(field).copied()
    }

    pub fn iter(&self) -> StringRecordIter<'_> {
        self.names.iter()
    }

    /// Value of the named column in `row`.
    pub fn get_field<'r>(&self, row: &'r Row, field: &str) -> Option<&'r str> {
        self.get(field).and_then(|i| row.get(i))
    }

    /// The header row as it is written to disk, internal columns removed.
    pub fn public_row(&self) -> Row {
        self.iter().filter(|h| !is_internal(h)).collect()
    }

    /// `row` with the fields under internal columns removed.
    pub fn public_fields(&self, row: &Row) -> Row {
        self.iter()
            .zip(row.iter())
            .filter(|(h, _)| !is_internal(h))
            .map(|(_, f)| f)
            .collect()
    }
}

impl PartialEq<Headers> for Row {
    fn eq(&self, other: &Headers) -> bool {
        self == other.as_row()
    }
}
