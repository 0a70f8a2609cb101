use std::vec;

use tracing::debug;

use crate::{error::Error, layout::Layout, Headers, Row, RowResult, RowStream};

/// Orders the whole stream by the raw bytes of its key, keeping the arrival
/// order of records with equal keys.
///
/// Nothing comes out before the upstream is exhausted. Errors found upstream
/// are yielded first, in the order they arrived.
pub struct SortByKey<I> {
    iter: I,
    layout: Layout,
    headers: Headers,
}

impl<I> SortByKey<I>
where
    I: RowStream,
{
    pub fn new(iter: I, layout: Layout) -> SortByKey<I> {
        let headers = iter.headers().clone();

        SortByKey {
            iter,
            layout,
            headers,
        }
    }
}

/// Stable sort of `rows` by key. Records without a key column sort first.
pub fn sort_by_key(layout: &Layout, rows: &mut [Row]) {
    rows.sort_by(|a, b| {
        let a = layout.key_of(a).unwrap_or_default();
        let b = layout.key_of(b).unwrap_or_default();

        a.as_bytes().cmp(b.as_bytes())
    });
}

pub struct IntoIter {
    errors: vec::IntoIter<Error>,
    rows: vec::IntoIter<Row>,
}

impl Iterator for IntoIter {
    type Item = RowResult;

    fn next(&mut self) -> Option<Self::Item> {
        match self.errors.next() {
            Some(e) => Some(Err(e)),
            None => self.rows.next().map(Ok),
        }
    }
}

impl<I> IntoIterator for SortByKey<I>
where
    I: RowStream,
{
    type Item = RowResult;

    type IntoIter = IntoIter;

    fn into_iter(self) -> Self::IntoIter {
        let mut rows = Vec::new();
        let mut errors = Vec::new();

        for result in self.iter {
            match result {
                Ok(row) => rows.push(row),
                Err(e) => errors.push(e),
            }
        }

        sort_by_key(&self.layout, &mut rows);

        debug!(records = rows.len(), errors = errors.len(), "sorted by key");

        IntoIter {
            errors: errors.into_iter(),
            rows: rows.into_iter(),
        }
    }
}

impl<I> RowStream for SortByKey<I>
where
    I: RowStream,
{
    fn headers(&self) -> &Headers {
        &self.headers
    }
}

#[cfg(test)]
mod tests {
    use super::SortByKey;
    use crate::{
        error::Error,
        layout::Layout,
        mock::{export_stream, flagged_row},
        Row,
    };

    fn keys(rows: &[Row]) -> Vec<&str> {
        rows.iter().map(|r| r.get(1).unwrap()).collect()
    }

    #[test]
    fn orders_by_raw_bytes() {
        let stream = export_stream(vec![
            Ok(flagged_row("10", &[])),
            Ok(flagged_row("9", &[])),
            Ok(flagged_row("B", &[])),
            Ok(flagged_row("a", &[])),
            Ok(flagged_row("100", &[])),
        ]);

        let rows: Vec<Row> = SortByKey::new(stream, Layout::default())
            .into_iter()
            .map(|r| r.unwrap())
            .collect();

        assert_eq!(keys(&rows), vec!["10", "100", "9", "B", "a"]);
    }

    #[test]
    fn equal_keys_keep_arrival_order() {
        let stream = export_stream(vec![
            Ok(flagged_row("B", &[12])),
            Ok(flagged_row("A", &[13])),
            Ok(flagged_row("B", &[14])),
            Ok(flagged_row("A", &[15])),
        ]);

        let rows: Vec<Row> = SortByKey::new(stream, Layout::default())
            .into_iter()
            .map(|r| r.unwrap())
            .collect();

        assert_eq!(
            rows,
            vec![
                flagged_row("A", &[13]),
                flagged_row("A", &[15]),
                flagged_row("B", &[12]),
                flagged_row("B", &[14]),
            ]
        );
    }

    #[test]
    fn errors_come_first() {
        let stream = export_stream(vec![
            Ok(flagged_row("B", &[])),
            Err(Error::InconsistentHeaders("x.csv".into())),
            Ok(flagged_row("A", &[])),
        ]);

        let mut r = SortByKey::new(stream, Layout::default()).into_iter();

        assert!(matches!(r.next(), Some(Err(Error::InconsistentHeaders(_)))));
        assert_eq!(r.next().unwrap().unwrap(), flagged_row("A", &[]));
        assert_eq!(r.next().unwrap().unwrap(), flagged_row("B", &[]));
        assert!(r.next().is_none());
    }
}
