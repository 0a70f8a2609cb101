use tracing::warn;

use crate::{
    error::{Error, Result},
    flag::Flag,
    layout::Layout,
    lookup::Lookup,
    Headers, Row, RowResult, RowStream,
};

/// Moves a record's category into place.
///
/// The trimmed value of the layout's remap source column names a category;
/// the lookup table says which column flags it. On a hit the source column and
/// the looked-up column trade places and the category name, now sitting in the
/// looked-up column, is replaced by `J`. Flag columns left empty afterwards
/// receive `fill`. `offset` only describes the record in errors.
pub fn remap(layout: &Layout, lookup: &Lookup, fill: &str, row: &Row, offset: usize) -> RowResult {
    layout.check(row, offset)?;

    let source = layout.remap_source().index();
    let value = row.get(source).unwrap_or_default();

    let target = lookup
        .get(value.trim())
        .ok_or_else(|| Error::LookupMiss {
            offset,
            key: layout.key_of(row).unwrap_or_default().to_string(),
            value: value.trim().to_string(),
        })?
        .index();

    if target >= row.len() {
        return Err(Error::MalformedRecord {
            offset,
            key: layout.key_of(row).map(str::to_string),
            found: row.len(),
            expected: target + 1,
        });
    }

    let capacity = row.as_slice().len() + fill.len() * layout.flag_indices().count();
    let mut remapped = Row::with_capacity(capacity, row.len());

    for (index, field) in row.iter().enumerate() {
        let field = if index == target {
            Flag::Set.as_str()
        } else if index == source {
            &row[target]
        } else {
            field
        };

        if layout.is_flag(index) && field.trim().is_empty() {
            remapped.push_field(fill);
        } else {
            remapped.push_field(field);
        }
    }

    Ok(remapped)
}

/// Applies [`remap`] to every record of the stream.
pub struct Remap<I> {
    iter: I,
    lookup: Lookup,
    layout: Layout,
    fill: String,
    headers: Headers,
}

impl<I> Remap<I>
where
    I: RowStream,
{
    pub fn new(iter: I, lookup: Lookup, layout: Layout) -> Result<Remap<I>> {
        let headers = iter.headers().clone();

        layout.check_headers(&headers)?;

        Ok(Remap {
            iter,
            lookup,
            layout,
            fill: Flag::Unset.as_str().to_string(),
            headers,
        })
    }

    /// Token written into empty flag columns, `N` unless changed.
    pub fn with_fill(mut self, fill: &str) -> Remap<I> {
        self.fill = fill.to_string();
        self
    }
}

pub struct IntoIter<I> {
    iter: I,
    lookup: Lookup,
    layout: Layout,
    fill: String,
    offset: usize,
}

impl<I> Iterator for IntoIter<I>
where
    I: Iterator<Item = RowResult>,
{
    type Item = RowResult;

    fn next(&mut self) -> Option<Self::Item> {
        self.iter.next().map(|result| {
            result.and_then(|row| {
                self.offset += 1;

                remap(&self.layout, &self.lookup, &self.fill, &row, self.offset).map_err(|e| {
                    warn!(error = %e, "record not remapped");
                    e
                })
            })
        })
    }
}

impl<I> IntoIterator for Remap<I>
where
    I: RowStream,
{
    type Item = RowResult;

    type IntoIter = IntoIter<I::IntoIter>;

    fn into_iter(self) -> Self::IntoIter {
        IntoIter {
            iter: self.iter.into_iter(),
            lookup: self.lookup,
            layout: self.layout,
            fill: self.fill,
            offset: 0,
        }
    }
}

impl<I> RowStream for Remap<I>
where
    I: RowStream,
{
    fn headers(&self) -> &Headers {
        &self.headers
    }
}
