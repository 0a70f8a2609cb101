//! In-memory sources of rows, used in testing
use crate::{
    flag::{SET_TOKEN, UNSET_TOKEN},
    layout::{Layout, MIN_WIDTH},
    Headers, Row, RowResult, RowStream,
};

#[derive(Debug, PartialEq)]
pub enum BuildError {
    EmptyIterator,
    FailedHeader,
}

/// A stream over any iterator of row results, with headers given up front.
pub struct MockStream<I> {
    iter: I,
    headers: Headers,
}

impl<I> MockStream<I>
where
    I: Iterator<Item = RowResult>,
{
    pub fn new(iter: I, headers: Headers) -> MockStream<I> {
        MockStream { iter, headers }
    }

    /// Takes the first row of `iter` as the headers.
    pub fn from_rows(mut iter: I) -> Result<MockStream<I>, BuildError> {
        match iter.next() {
            Some(Ok(row)) => Ok(MockStream::new(iter, Headers::from_row(row))),
            Some(Err(_)) => Err(BuildError::FailedHeader),
            None => Err(BuildError::EmptyIterator),
        }
    }
}

impl<I> IntoIterator for MockStream<I>
where
    I: Iterator<Item = RowResult>,
{
    type Item = RowResult;

    type IntoIter = I;

    fn into_iter(self) -> Self::IntoIter {
        self.iter
    }
}

impl<I> RowStream for MockStream<I>
where
    I: Iterator<Item = RowResult>,
{
    fn headers(&self) -> &Headers {
        &self.headers
    }
}

/// Headers `c1` .. `c23` of an export with the default layout.
pub fn export_headers() -> Headers {
    Headers::from_row((1..=MIN_WIDTH).map(|p| format!("c{}", p)).collect::<Vec<_>>().into())
}

/// A record of the default layout with `key` as its key, every flag position
/// listed in `set` (1-indexed) holding `J`, the remaining flags `N` and every
/// other column holding `v<position>`.
pub fn flagged_row(key: &str, set: &[usize]) -> Row {
    let layout = Layout::default();

    (1..=MIN_WIDTH)
        .map(|position| {
            let index = position - 1;

            if index == layout.key().index() {
                key.to_string()
            } else if layout.is_flag(index) {
                let token = if set.contains(&position) {
                    SET_TOKEN
                } else {
                    UNSET_TOKEN
                };

                token.to_string()
            } else {
                format!("v{}", position)
            }
        })
        .collect::<Vec<_>>()
        .into()
}

/// Streams `rows` under [`export_headers`].
pub fn export_stream(rows: Vec<RowResult>) -> MockStream<std::vec::IntoIter<RowResult>> {
    MockStream::new(rows.into_iter(), export_headers())
}

#[cfg(test)]
mod tests {
    use super::{flagged_row, BuildError, Headers, MockStream, Row, RowStream};
    use crate::RowResult;

    #[test]
    fn test_mock_stream() {
        let m = MockStream::from_rows(
            vec![
                Ok(Row::from(vec!["id", "num"])),
                Ok(Row::from(vec!["1", "40"])),
                Ok(Row::from(vec!["2", "39"])),
            ]
            .into_iter(),
        )
        .unwrap();

        assert_eq!(*m.headers(), Headers::from_row(Row::from(vec!["id", "num"])));

        let mut m = m.into_iter();

        assert_eq!(m.next().unwrap().unwrap(), Row::from(vec!["1", "40"]));
        assert_eq!(m.next().unwrap().unwrap(), Row::from(vec!["2", "39"]));
    }

    #[test]
    fn empty_source_has_no_headers() {
        let rows: Vec<RowResult> = Vec::new();

        assert_eq!(
            MockStream::from_rows(rows.into_iter()).err(),
            Some(BuildError::EmptyIterator)
        );
    }

    #[test]
    fn flagged_row_shape() {
        let row = flagged_row("K1", &[12, 23]);

        assert_eq!(row.len(), 23);
        assert_eq!(row.get(0), Some("v1"));
        assert_eq!(row.get(1), Some("K1"));
        assert_eq!(row.get(11), Some("J"));
        assert_eq!(row.get(12), Some("N"));
        assert_eq!(row.get(22), Some("J"));
    }
}
