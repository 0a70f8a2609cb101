use csv::{ByteRecord, ByteRecordsIntoIter, Reader, ReaderBuilder};
use encoding::label::encoding_from_whatwg_label;
use encoding::{DecoderTrap, EncodingRef};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::vec;

use tracing::{debug, warn};

use crate::{
    error::{Error, Result},
    Headers, Row, RowResult, RowStream,
};

/// Name of the column carrying the path each record was read from.
pub const SOURCE_FIELD: &str = "_source";

fn decode(data: &ByteRecord, encoding: EncodingRef) -> Row {
    let mut row = Row::with_capacity(data.as_slice().len(), data.len());

    for item in data.iter() {
        // With `Replace` decoding does not fail, unmappable bytes become U+FFFD
        let field = encoding
            .decode(item, DecoderTrap::Replace)
            .unwrap_or_else(|partial| partial.into_owned());

        row.push_field(&field);
    }

    row
}

/// How the exported files are written.
#[derive(Clone)]
pub struct InputFormat {
    pub delimiter: u8,
    pub encoding: EncodingRef,
}

impl InputFormat {
    /// `label` is a WHATWG encoding label such as `latin1` or `utf-8`.
    pub fn new(delimiter: u8, label: &str) -> Result<InputFormat> {
        let encoding = encoding_from_whatwg_label(label)
            .ok_or_else(|| Error::UnknownEncoding(label.to_string()))?;

        Ok(InputFormat {
            delimiter,
            encoding,
        })
    }
}

impl std::fmt::Debug for InputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InputFormat")
            .field("delimiter", &(self.delimiter as char))
            .field("encoding", &self.encoding.name())
            .finish()
    }
}

pub struct ReaderSource {
    reader: Reader<File>,
    path: PathBuf,
    encoding: EncodingRef,
}

impl ReaderSource {
    pub fn from_reader<P: AsRef<Path>>(
        reader: Reader<File>,
        path: P,
        encoding: EncodingRef,
    ) -> ReaderSource {
        ReaderSource {
            reader,
            path: path.as_ref().to_path_buf(),
            encoding,
        }
    }

    pub fn from_path<P: AsRef<Path>>(path: P, format: &InputFormat) -> Result<ReaderSource> {
        let reader = ReaderBuilder::new()
            .delimiter(format.delimiter)
            .flexible(true)
            .from_path(&path)?;

        Ok(ReaderSource::from_reader(reader, path, format.encoding))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The decoded header line plus [`SOURCE_FIELD`], `None` for a file
    /// without even a header line.
    fn headers(&mut self) -> Result<Option<Row>> {
        let data = self.reader.byte_headers()?.clone();

        if data.is_empty() {
            return Ok(None);
        }

        let mut headers = decode(&data, self.encoding);

        headers.push_field(SOURCE_FIELD);

        Ok(Some(headers))
    }
}

struct CurrentSource {
    records: ByteRecordsIntoIter<File>,
    path: PathBuf,
    encoding: EncodingRef,
    offset: usize,
}

impl CurrentSource {
    fn from_source(source: ReaderSource) -> CurrentSource {
        debug!(path = ?source.path, "reading");

        CurrentSource {
            records: source.reader.into_byte_records(),
            path: source.path,
            encoding: source.encoding,
            offset: 0,
        }
    }
}

/// Concatenates the records of several exported files sharing the same
/// headers, decoding them into UTF-8 and tagging each one with its file.
pub struct InputStream {
    readers: vec::IntoIter<ReaderSource>,
    current: CurrentSource,
    headers: Headers,
}

impl InputStream {
    /// The headers of the first source with a header line are the headers of
    /// the stream. Empty files yield no records and no errors.
    pub fn new(sources: Vec<ReaderSource>) -> Result<InputStream> {
        if sources.is_empty() {
            return Err(Error::NoInput {
                dir: PathBuf::new(),
                pattern: String::new(),
            });
        }

        let paths: Vec<PathBuf> = sources.iter().map(|s| s.path.clone()).collect();
        let mut readers = sources.into_iter();

        while let Some(mut source) = readers.next() {
            match source.headers()? {
                Some(row) => {
                    return Ok(InputStream {
                        readers,
                        headers: Headers::from_row(row),
                        current: CurrentSource::from_source(source),
                    });
                }
                None => debug!(path = ?source.path(), "empty file"),
            }
        }

        Err(Error::EmptyInput(paths))
    }

    /// Opens every path with the same format.
    pub fn from_paths<P: AsRef<Path>>(paths: &[P], format: &InputFormat) -> Result<InputStream> {
        let sources = paths
            .iter()
            .map(|p| ReaderSource::from_path(p, format))
            .collect::<Result<Vec<_>>>()?;

        InputStream::new(sources)
    }

    /// Moves on to the next file, returning the error that caused a file to be
    /// skipped, if any.
    fn advance(&mut self) -> Option<Option<Error>> {
        let mut source = self.readers.next()?;

        match source.headers() {
            Ok(None) => {
                debug!(path = ?source.path(), "empty file");

                Some(None)
            }
            Ok(Some(headers)) if headers == self.headers => {
                self.current = CurrentSource::from_source(source);

                Some(None)
            }
            Ok(Some(_)) => {
                warn!(path = ?source.path(), "headers differ from the first file, skipping it");

                Some(Some(Error::InconsistentHeaders(source.path)))
            }
            Err(e) => {
                warn!(path = ?source.path(), error = %e, "could not read headers, skipping file");

                Some(Some(e))
            }
        }
    }
}

impl Iterator for InputStream {
    type Item = RowResult;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.current.records.next() {
                Some(Ok(reg)) => {
                    self.current.offset += 1;

                    let mut row = decode(&reg, self.current.encoding);
                    let expected = self.headers.len() - 1;

                    if row.len() != expected {
                        return Some(Err(Error::InconsistentSizeOfRows {
                            path: self.current.path.clone(),
                            offset: self.current.offset,
                            found: row.len(),
                            expected,
                        }));
                    }

                    row.push_field(&self.current.path.to_string_lossy());

                    return Some(Ok(row));
                }
                Some(Err(e)) => {
                    self.current.offset += 1;

                    return Some(Err(Error::Csv(e)));
                }
                None => match self.advance()? {
                    Some(skipped) => return Some(Err(skipped)),
                    None => continue,
                },
            }
        }
    }
}

impl RowStream for InputStream {
    fn headers(&self) -> &Headers {
        &self.headers
    }
}
