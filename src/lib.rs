mod error;
mod flush;
mod headers;
mod input;
mod inspect;
mod merge;
mod remap;
mod row_stream;
mod sort;

pub mod accumulate;
pub mod config;
pub mod discovery;
pub mod flag;
pub mod layout;
pub mod logging;
pub mod lookup;
pub mod mock;
pub mod pipeline;
pub mod workspace;

pub use error::{Error, Result, RowResult};
pub use flush::Flush;
pub use headers::Headers;
pub use input::{InputFormat, InputStream, ReaderSource, SOURCE_FIELD};
pub use inspect::Inspect;
pub use merge::{fold, MergeFlags};
pub use remap::{remap, Remap};
pub use row_stream::RowStream;
pub use sort::{sort_by_key, SortByKey};

pub type Row = csv::StringRecord;
