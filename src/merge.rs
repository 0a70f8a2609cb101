use std::iter::Fuse;
use std::mem;

use tracing::{debug, warn};

use crate::{error::Result, flag::Flag, layout::Layout, Headers, Row, RowResult, RowStream};

/// Folds `next` into `accumulator`: every flag set in either record stays set,
/// every other column comes from `next`.
pub fn fold(layout: &Layout, accumulator: &Row, next: &Row) -> Row {
    let mut merged = Row::with_capacity(next.as_slice().len(), next.len());

    for (index, field) in next.iter().enumerate() {
        let carried = layout.is_flag(index) && accumulator.get(index).map_or(false, Flag::is_set);

        if carried && !Flag::is_set(field) {
            merged.push_field(Flag::Set.as_str());
        } else {
            merged.push_field(field);
        }
    }

    merged
}

/// Columns outside the flag block where `later` overrides `earlier`.
fn overridden(layout: &Layout, earlier: &Row, later: &Row) -> usize {
    earlier
        .iter()
        .zip(later.iter())
        .enumerate()
        .filter(|(i, (a, b))| !layout.is_flag(*i) && a != b)
        .count()
}

/// Collapses adjacent records sharing a key into one, OR-ing their flags.
///
/// Assumes records with the same key arrive next to each other, as the sorter
/// leaves them. A key found again after a different one starts a new group
/// and is emitted separately.
pub struct MergeFlags<I> {
    iter: I,
    layout: Layout,
    headers: Headers,
}

impl<I> MergeFlags<I>
where
    I: RowStream,
{
    pub fn new(iter: I, layout: Layout) -> Result<MergeFlags<I>> {
        let headers = iter.headers().clone();

        layout.check_headers(&headers)?;

        Ok(MergeFlags {
            iter,
            layout,
            headers,
        })
    }
}

enum State {
    Empty,
    Holding { key: String, row: Row },
}

pub struct IntoIter<I> {
    iter: Fuse<I>,
    layout: Layout,
    state: State,
    offset: usize,
}

impl<I> IntoIter<I> {
    /// Takes `row` into the state machine, returning the finished group if
    /// `row` starts a new one.
    fn push(&mut self, key: String, row: Row) -> Option<Row> {
        match mem::replace(&mut self.state, State::Empty) {
            State::Empty => {
                self.state = State::Holding { key, row };

                None
            }
            State::Holding {
                key: held,
                row: accumulator,
            } if held == key => {
                let merged = fold(&self.layout, &accumulator, &row);

                let changed = overridden(&self.layout, &accumulator, &row);
                if changed > 0 {
                    debug!(key = %held, columns = changed, "later record overrides non-flag columns");
                }

                self.state = State::Holding {
                    key: held,
                    row: merged,
                };

                None
            }
            State::Holding {
                row: accumulator, ..
            } => {
                self.state = State::Holding { key, row };

                Some(accumulator)
            }
        }
    }

    fn finish(&mut self) -> Option<Row> {
        match mem::replace(&mut self.state, State::Empty) {
            State::Holding { row, .. } => Some(row),
            State::Empty => None,
        }
    }
}

impl<I> Iterator for IntoIter<I>
where
    I: Iterator<Item = RowResult>,
{
    type Item = RowResult;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.iter.next() {
                Some(Ok(row)) => {
                    self.offset += 1;

                    if let Err(e) = self.layout.check(&row, self.offset) {
                        warn!(error = %e, "skipping record");

                        return Some(Err(e));
                    }

                    let key = self.layout.key_of(&row).unwrap_or_default().to_string();

                    if let Some(done) = self.push(key, row) {
                        return Some(Ok(done));
                    }
                }
                Some(Err(e)) => return Some(Err(e)),
                None => return self.finish().map(Ok),
            }
        }
    }
}

impl<I> IntoIterator for MergeFlags<I>
where
    I: RowStream,
{
    type Item = RowResult;

    type IntoIter = IntoIter<I::IntoIter>;

    fn into_iter(self) -> Self::IntoIter {
        IntoIter {
            iter: self.iter.into_iter().fuse(),
            layout: self.layout,
            state: State::Empty,
            offset: 0,
        }
    }
}

impl<I> RowStream for MergeFlags<I>
where
    I: RowStream,
{
    fn headers(&self) -> &Headers {
        &self.headers
    }
}
