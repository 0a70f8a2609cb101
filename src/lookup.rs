//! The table telling the remapper which column each category name lands in.
//!
//! The file holds one `key,column_index` pair per line. Column indices are
//! 1-indexed positions, the same numbering the exports are documented with,
//! and must name a column of the flag block.
//! The whole table is parsed before any record is touched so a bad line stops
//! the run instead of misaligning records half way through.

use std::collections::HashMap;
use std::io;
use std::path::Path;

use csv::{ReaderBuilder, Trim};
use tracing::{debug, warn};

use crate::{
    error::{Error, Result},
    layout::{Column, Layout},
};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Lookup {
    entries: HashMap<String, Column>,
}

impl Lookup {
    pub fn from_path<P: AsRef<Path>>(path: P, layout: &Layout) -> Result<Lookup> {
        let path = path.as_ref();
        let file = std::fs::File::open(path)?;

        Lookup::from_reader(file, path, layout)
    }

    /// `origin` names the table in errors and logs.
    pub fn from_reader<R: io::Read>(reader: R, origin: &Path, layout: &Layout) -> Result<Lookup> {
        let mut reader = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .comment(Some(b'#'))
            .trim(Trim::All)
            .from_reader(reader);

        let mut entries = HashMap::new();
        let mut lines: HashMap<String, u64> = HashMap::new();

        for result in reader.records() {
            let record = result?;
            let line = record.position().map_or(0, |p| p.line());
            let invalid = |reason: String| Error::InvalidLookup {
                path: origin.to_path_buf(),
                line,
                reason,
            };

            if record.len() != 2 {
                return Err(invalid(format!("expected 2 fields, found {}", record.len())));
            }

            let key = &record[0];
            let column = record[1]
                .parse::<usize>()
                .ok()
                .and_then(Column::from_position)
                .ok_or_else(|| invalid(format!("{:?} is not a column position", &record[1])))?;

            if !layout.is_flag(column.index()) {
                return Err(invalid(format!(
                    "{} for {:?} lies outside the flag block {}..={}",
                    column,
                    key,
                    layout.flag_indices().start() + 1,
                    layout.flag_indices().end() + 1
                )));
            }

            if let Some(previous) = lines.insert(key.to_string(), line) {
                warn!(?origin, key, previous, line, "duplicate lookup key, the later line wins");
            }

            entries.insert(key.to_string(), column);
        }

        debug!(?origin, entries = entries.len(), "lookup table loaded");

        Ok(Lookup { entries })
    }

    pub fn get(&self, key: &str) -> Option<Column> {
        self.entries.get(key).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, Column)> for Lookup {
    fn from_iter<T: IntoIterator<Item = (K, Column)>>(iter: T) -> Lookup {
        Lookup {
            entries: iter.into_iter().map(|(k, c)| (k.into(), c)).collect(),
        }
    }
}
