use csv::{Writer, WriterBuilder};
use std::fs::{self, File};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::{
    error::{Error, Result},
    Headers, RowResult, RowStream,
};

/// Writes the rows to a delimited file as they pass through.
///
/// Fields under columns starting with underscore are not written. The file
/// and its header line are created when the `Flush` is built, so a stream
/// without rows still leaves a file behind.
pub struct Flush<I> {
    iter: I,
    writer: Writer<File>,
    path: PathBuf,
    headers: Headers,
}

impl<I> Flush<I>
where
    I: RowStream,
{
    pub fn new<P: AsRef<Path>>(iter: I, path: P, delimiter: u8) -> Result<Flush<I>> {
        let path = path.as_ref().to_path_buf();

        if let Some(dirname) = path.parent() {
            fs::create_dir_all(dirname)?;
        }

        let headers = iter.headers().clone();
        let mut writer = WriterBuilder::new().delimiter(delimiter).from_path(&path)?;

        writer.write_record(&headers.public_row())?;

        Ok(Flush {
            iter,
            writer,
            path,
            headers,
        })
    }
}

pub struct IntoIter<I> {
    writer: Option<Writer<File>>,
    path: PathBuf,
    headers: Headers,
    iter: I,
}

impl<I> Iterator for IntoIter<I>
where
    I: Iterator<Item = RowResult>,
{
    type Item = RowResult;

    fn next(&mut self) -> Option<Self::Item> {
        let writer = self.writer.as_mut()?;

        match self.iter.next() {
            Some(Ok(row)) => match writer.write_record(&self.headers.public_fields(&row)) {
                Ok(_) => Some(Ok(row)),
                Err(e) => {
                    // Nothing more can be written once the output has failed
                    self.writer = None;

                    Some(Err(Error::Output {
                        path: self.path.clone(),
                        source: e.into(),
                    }))
                }
            },
            err @ Some(Err(_)) => err,
            None => {
                let result = writer.flush();

                self.writer = None;
                debug!(path = ?self.path, "flushed");

                result.err().map(|source| {
                    Err(Error::Output {
                        path: self.path.clone(),
                        source,
                    })
                })
            }
        }
    }
}

impl<I> IntoIterator for Flush<I>
where
    I: RowStream,
{
    type Item = RowResult;

    type IntoIter = IntoIter<I::IntoIter>;

    fn into_iter(self) -> Self::IntoIter {
        IntoIter {
            writer: Some(self.writer),
            path: self.path,
            headers: self.headers,
            iter: self.iter.into_iter(),
        }
    }
}

impl<I> RowStream for Flush<I>
where
    I: RowStream,
{
    fn headers(&self) -> &Headers {
        &self.headers
    }
}
