use crate::{Headers, RowResult, RowStream};

/// Calls a closure on every item of the stream and passes the item on
/// untouched.
pub struct Inspect<I, F> {
    iter: I,
    f: F,
    headers: Headers,
}

impl<I, F> Inspect<I, F>
where
    I: RowStream,
    F: FnMut(&Headers, &RowResult),
{
    pub fn new(iter: I, f: F) -> Inspect<I, F> {
        let headers = iter.headers().clone();

        Inspect { iter, f, headers }
    }
}

pub struct IntoIter<I, F> {
    iter: I,
    f: F,
    headers: Headers,
}

impl<I, F> Iterator for IntoIter<I, F>
where
    I: Iterator<Item = RowResult>,
    F: FnMut(&Headers, &RowResult),
{
    type Item = RowResult;

    fn next(&mut self) -> Option<Self::Item> {
        let item = self.iter.next()?;

        (self.f)(&self.headers, &item);

        Some(item)
    }
}

impl<I, F> IntoIterator for Inspect<I, F>
where
    I: RowStream,
    F: FnMut(&Headers, &RowResult),
{
    type Item = RowResult;

    type IntoIter = IntoIter<I::IntoIter, F>;

    fn into_iter(self) -> Self::IntoIter {
        IntoIter {
            iter: self.iter.into_iter(),
            f: self.f,
            headers: self.headers,
        }
    }
}

impl<I, F> RowStream for Inspect<I, F>
where
    I: RowStream,
    F: FnMut(&Headers, &RowResult),
{
    fn headers(&self) -> &Headers {
        &self.headers
    }
}

#[cfg(test)]
mod tests {
    use super::Inspect;
    use crate::{error::Error, mock::MockStream, Row, RowResult};

    #[test]
    fn sees_rows_and_errors() {
        let iter = MockStream::from_rows(
            vec![
                Ok(Row::from(vec!["id"])),
                Ok(Row::from(vec!["1"])),
                Err(Error::InconsistentHeaders("b.csv".into())),
                Ok(Row::from(vec!["2"])),
            ]
            .into_iter(),
        )
        .unwrap();

        let mut rows = 0;
        let mut errors = 0;

        let results: Vec<RowResult> = Inspect::new(iter, |headers, item| {
            assert_eq!(headers.len(), 1);

            match item {
                Ok(_) => rows += 1,
                Err(_) => errors += 1,
            }
        })
        .into_iter()
        .collect();

        assert_eq!(results.len(), 3);
        assert_eq!((rows, errors), (2, 1));
    }
}
