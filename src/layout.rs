//! Column positions of the exported records.
//!
//! Exported records are positional: nothing but the column number tells the
//! key apart from the flags. Positions are 1-indexed everywhere a human sees
//! them (configuration, lookup tables, log messages) and 0-indexed inside a
//! [`Row`].

use std::fmt;
use std::ops::RangeInclusive;

use crate::{
    error::{Error, Result},
    flag::Flag,
    headers::is_internal,
    Headers, Row,
};

/// Position of the key column.
pub const KEY_POSITION: usize = 2;

/// Position of the column holding the name the remapper looks up.
pub const REMAP_SOURCE_POSITION: usize = 3;

/// First column of the flag block.
pub const FIRST_FLAG_POSITION: usize = 12;

/// Last column of the flag block, inclusive.
pub const LAST_FLAG_POSITION: usize = 23;

pub const FLAG_COUNT: usize = LAST_FLAG_POSITION - FIRST_FLAG_POSITION + 1;

/// Narrowest record the default layout can work with.
pub const MIN_WIDTH: usize = LAST_FLAG_POSITION;

/// A column of a record, stored 0-indexed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Column(usize);

impl Column {
    /// Builds a column from its 1-indexed position. Position zero does not
    /// exist.
    pub const fn from_position(position: usize) -> Option<Column> {
        if position == 0 {
            None
        } else {
            Some(Column(position - 1))
        }
    }

    pub const fn from_index(index: usize) -> Column {
        Column(index)
    }

    pub const fn index(self) -> usize {
        self.0
    }

    pub const fn position(self) -> usize {
        self.0 + 1
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "column {}", self.position())
    }
}

/// Where the key, the flag block and the remap source live in a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    key: Column,
    remap_source: Column,
    first_flag: Column,
    last_flag: Column,
}

impl Default for Layout {
    fn default() -> Layout {
        Layout {
            key: Column(KEY_POSITION - 1),
            remap_source: Column(REMAP_SOURCE_POSITION - 1),
            first_flag: Column(FIRST_FLAG_POSITION - 1),
            last_flag: Column(LAST_FLAG_POSITION - 1),
        }
    }
}

impl Layout {
    /// Builds a layout from 1-indexed positions. The flag block must not
    /// contain the key or the remap source, and the key is not the remap
    /// source.
    pub fn new(
        key: usize,
        remap_source: usize,
        first_flag: usize,
        last_flag: usize,
    ) -> Result<Layout> {
        let column = |position: usize, what: &str| {
            Column::from_position(position)
                .ok_or_else(|| Error::Layout(format!("{} position must start at 1", what)))
        };

        let layout = Layout {
            key: column(key, "key")?,
            remap_source: column(remap_source, "remap source")?,
            first_flag: column(first_flag, "first flag")?,
            last_flag: column(last_flag, "last flag")?,
        };

        if layout.first_flag > layout.last_flag {
            return Err(Error::Layout(format!(
                "flag block {}..{} is empty",
                first_flag, last_flag
            )));
        }

        if layout.is_flag(layout.key.index()) {
            return Err(Error::Layout(format!(
                "key {} lies inside the flag block",
                layout.key
            )));
        }

        if layout.is_flag(layout.remap_source.index()) {
            return Err(Error::Layout(format!(
                "remap source {} lies inside the flag block",
                layout.remap_source
            )));
        }

        if layout.key == layout.remap_source {
            return Err(Error::Layout(format!(
                "key and remap source are both {}",
                layout.key
            )));
        }

        Ok(layout)
    }

    pub fn key(&self) -> Column {
        self.key
    }

    pub fn remap_source(&self) -> Column {
        self.remap_source
    }

    /// 0-based indices of the flag block.
    pub fn flag_indices(&self) -> RangeInclusive<usize> {
        self.first_flag.index()..=self.last_flag.index()
    }

    pub fn is_flag(&self, index: usize) -> bool {
        self.flag_indices().contains(&index)
    }

    /// Fewest fields a record needs for every column of this layout to exist.
    pub fn min_width(&self) -> usize {
        self.key
            .position()
            .max(self.remap_source.position())
            .max(self.last_flag.position())
    }

    pub fn key_of<'r>(&self, row: &'r Row) -> Option<&'r str> {
        row.get(self.key.index())
    }

    /// Reads the flag at `index`, `None` if the column is missing or holds
    /// something other than a flag token.
    pub fn flag_at(&self, row: &Row, index: usize) -> Option<Flag> {
        row.get(index).and_then(Flag::parse)
    }

    /// Number of flags set in `row`.
    pub fn count_set(&self, row: &Row) -> usize {
        self.flag_indices()
            .filter(|&i| self.flag_at(row, i) == Some(Flag::Set))
            .count()
    }

    /// Checks that `row` is wide enough for this layout. `offset` is only used
    /// to describe the record in the error.
    pub fn check(&self, row: &Row, offset: usize) -> Result<()> {
        if row.len() < self.min_width() {
            return Err(Error::MalformedRecord {
                offset,
                key: self.key_of(row).map(str::to_string),
                found: row.len(),
                expected: self.min_width(),
            });
        }

        Ok(())
    }

    /// Every column this layout reads or writes.
    fn columns(&self) -> impl Iterator<Item = Column> + '_ {
        [self.key, self.remap_source]
            .into_iter()
            .chain(self.flag_indices().map(Column::from_index))
    }

    /// Checks that a stream with these headers can carry this layout. Every
    /// layout column must be a data column: internal columns appended along
    /// the chain do not count towards the width of the export.
    pub fn check_headers(&self, headers: &Headers) -> Result<()> {
        let data_width = headers.public_row().len();

        for column in self.columns() {
            match headers.as_row().get(column.index()) {
                Some(name) if !is_internal(name) => {}
                _ => {
                    return Err(Error::Layout(format!(
                        "records have {} data columns but the layout needs {}",
                        data_width,
                        self.min_width()
                    )));
                }
            }
        }

        Ok(())
    }
}
