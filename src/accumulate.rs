use std::fs::{self, OpenOptions};
use std::path::Path;

use csv::{ReaderBuilder, WriterBuilder};
use tracing::debug;

use crate::error::{Error, Result};

/// Appends the records of one run's output file to the cumulative result
/// file, returning how many were appended.
///
/// The header line is written only when the result file is new or empty.
/// Nothing is deduplicated against what the result file already holds.
pub fn append<P, Q>(run_file: P, result_file: Q, delimiter: u8) -> Result<usize>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
{
    let result_file = result_file.as_ref();

    if let Some(dirname) = result_file.parent() {
        fs::create_dir_all(dirname)?;
    }

    let mut reader = ReaderBuilder::new()
        .delimiter(delimiter)
        .from_path(run_file.as_ref())?;

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(result_file)?;
    let fresh = file.metadata()?.len() == 0;

    let mut writer = WriterBuilder::new().delimiter(delimiter).from_writer(file);

    if fresh {
        writer.write_record(reader.byte_headers()?)?;
    }

    let mut appended = 0;

    for record in reader.byte_records() {
        writer.write_byte_record(&record?)?;
        appended += 1;
    }

    writer.flush().map_err(Error::Io)?;

    debug!(?result_file, appended, fresh, "appended run output");

    Ok(appended)
}

#[cfg(test)]
mod tests {
    use super::append;
    use std::fs;

    #[test]
    fn header_is_written_once() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("first.csv");
        let second = dir.path().join("second.csv");
        let result = dir.path().join("results/all.csv");

        fs::write(&first, "k;f\nA;J\nB;N\n").unwrap();
        fs::write(&second, "k;f\nA;N\n").unwrap();

        assert_eq!(append(&first, &result, b';').unwrap(), 2);
        assert_eq!(append(&second, &result, b';').unwrap(), 1);

        assert_eq!(
            fs::read_to_string(&result).unwrap(),
            "k;f\nA;J\nB;N\nA;N\n"
        );
    }

    #[test]
    fn header_only_run_appends_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let run = dir.path().join("run.csv");
        let result = dir.path().join("all.csv");

        fs::write(&run, "k;f\n").unwrap();
        fs::write(&result, "k;f\nA;J\n").unwrap();

        assert_eq!(append(&run, &result, b';').unwrap(), 0);
        assert_eq!(fs::read_to_string(&result).unwrap(), "k;f\nA;J\n");
    }
}
