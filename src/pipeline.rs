//! One run: exported files in, one record per key out.

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDate};
use regex::Regex;
use strfmt::strfmt;
use tracing::{info, warn};

use crate::{
    accumulate,
    config::Config,
    discovery::{check_file_sets, discover},
    error::{Error, Result},
    headers::is_internal,
    input::{InputStream, SOURCE_FIELD},
    layout::Layout,
    lookup::Lookup,
    workspace::Workspace,
    Headers, RowStream,
};

/// Name of the merged output inside the workspace.
const MERGED_FILE: &str = "merged.csv";

/// Renders the per-run output file name, `{date}` being `YYYYMMDD`.
pub fn output_name(template: &str, date: NaiveDate) -> Result<String> {
    let mut vars = HashMap::new();
    vars.insert("date".to_string(), date.format("%Y%m%d").to_string());

    let name = strfmt(template, &vars).map_err(|e| Error::OutputTemplate {
        template: template.to_string(),
        reason: e.to_string(),
    })?;

    if name.is_empty() || name.contains(|c: char| c == '/' || c == '\\') {
        return Err(Error::OutputTemplate {
            template: template.to_string(),
            reason: format!("{:?} is not a file name", name),
        });
    }

    Ok(name)
}

/// What a run did.
#[derive(Debug, Default)]
pub struct RunSummary {
    pub files: Vec<PathBuf>,
    /// Files that were read but held no records.
    pub empty_files: Vec<PathBuf>,
    pub records_read: usize,
    pub records_written: usize,
    /// Written records with more than one flag set.
    pub multi_flag_records: usize,
    pub lookup_misses: usize,
    pub malformed: usize,
    /// Every record-level error, in the order they were found.
    pub errors: Vec<Error>,
    pub output: PathBuf,
    /// Records appended to the cumulative result file.
    pub appended: usize,
    /// Set when the workspace could not be removed.
    pub cleanup: Option<Error>,
    /// Names of the written flag columns.
    pub flag_columns: Vec<String>,
    /// Names of the other written columns.
    pub static_columns: Vec<String>,
}

impl RunSummary {
    fn describe_columns(&mut self, headers: &Headers, layout: &Layout) {
        for (index, name) in headers.iter().enumerate() {
            if is_internal(name) {
                continue;
            }

            if layout.is_flag(index) {
                self.flag_columns.push(name.to_string());
            } else {
                self.static_columns.push(name.to_string());
            }
        }
    }

    /// Files that produced no record and were not skipped for an error.
    fn find_empty_files(&mut self, per_file: &HashMap<String, usize>) {
        let skipped: Vec<&PathBuf> = self
            .errors
            .iter()
            .filter_map(|e| match e {
                Error::InconsistentHeaders(path) => Some(path),
                _ => None,
            })
            .collect();

        self.empty_files = self
            .files
            .iter()
            .filter(|f| !per_file.contains_key(&*f.to_string_lossy()))
            .filter(|f| !skipped.contains(f))
            .cloned()
            .collect();
    }

    fn record(&mut self, error: Error) {
        match error {
            Error::LookupMiss { .. } => self.lookup_misses += 1,
            Error::MalformedRecord { .. } | Error::InconsistentSizeOfRows { .. } => {
                self.malformed += 1
            }
            _ => {}
        }

        self.errors.push(error);
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Processed {} files", self.files.len())?;

        for file in &self.files {
            writeln!(f, "   - {}", file.display())?;
        }

        writeln!(f, "Files with no records: {}", self.empty_files.len())?;

        for file in &self.empty_files {
            writeln!(f, "   - {}", file.display())?;
        }

        writeln!(f, "Records read: {}", self.records_read)?;
        writeln!(f, "Records written: {}", self.records_written)?;
        writeln!(f, "Records with multiple flags: {}", self.multi_flag_records)?;
        writeln!(f, "Lookup misses: {}", self.lookup_misses)?;
        writeln!(f, "Malformed records: {}", self.malformed)?;
        writeln!(
            f,
            "Other errors: {}",
            self.errors.len() - self.lookup_misses - self.malformed
        )?;

        for error in &self.errors {
            writeln!(f, "   - {}", error)?;
        }

        writeln!(f, "Flag columns: {}", self.flag_columns.len())?;
        writeln!(
            f,
            "Static columns: {} → {}",
            self.static_columns.len(),
            self.static_columns.join(", ")
        )?;
        writeln!(f, "Output: {}", self.output.display())?;
        write!(f, "Appended to result: {}", self.appended)?;

        if let Some(e) = &self.cleanup {
            write!(f, "\nCleanup failed: {}", e)?;
        }

        Ok(())
    }
}

/// Runs with today's date.
pub fn run(config: &Config) -> Result<RunSummary> {
    run_on(config, Local::now().date_naive())
}

/// Runs as if on `date`, which names the per-run output file.
pub fn run_on(config: &Config, date: NaiveDate) -> Result<RunSummary> {
    let layout = config.layout()?;
    let workspace_path = config.workspace_path();
    let output = config
        .output_dir
        .join(output_name(&config.output_template, date)?);

    for path in [&workspace_path, &output] {
        if path.exists() {
            return Err(Error::ConfigurationConflict(path.to_path_buf()));
        }
    }

    let format = config.input_format()?;
    let pattern = Regex::new(&config.file_pattern)?;
    let lookup = Lookup::from_path(&config.lookup, &layout)?;
    let files = discover(&config.input_dir, &pattern, config.exclude_obs)?;

    check_file_sets(&files, &Regex::new(&config.group_pattern)?)?;

    let workspace = Workspace::acquire(&workspace_path)?;
    let merged = workspace.file(MERGED_FILE);

    info!(
        files = files.len(),
        lookup = lookup.len(),
        workspace = ?workspace.path(),
        "starting run"
    );

    let mut summary = RunSummary {
        files: files.clone(),
        output: output.clone(),
        ..Default::default()
    };
    let mut read = 0;
    let mut per_file: HashMap<String, usize> = HashMap::new();

    let input = InputStream::from_paths(&files, &format)?;
    let chain = RowStream::inspect(input, |headers, item| {
        if let Ok(row) = item {
            read += 1;

            if let Some(source) = headers.get_field(row, SOURCE_FIELD) {
                *per_file.entry(source.to_string()).or_default() += 1;
            }
        }
    })
    .remap(lookup, layout.clone())?
    .with_fill(&config.fill)
    .sort_by_key(layout.clone())
    .merge_flags(layout.clone())?
    .flush(&merged, config.output_delimiter)?;

    summary.describe_columns(chain.headers(), &layout);

    for item in chain {
        match item {
            Ok(row) => {
                summary.records_written += 1;

                if layout.count_set(&row) > 1 {
                    summary.multi_flag_records += 1;
                }
            }
            Err(e) if e.is_record_level() => {
                warn!(error = %e, "record skipped");
                summary.record(e);
            }
            Err(e) => return Err(e),
        }
    }

    summary.records_read = read;
    summary.find_empty_files(&per_file);

    for file in &summary.empty_files {
        warn!(path = ?file, "file holds no records");
    }

    fs::copy(&merged, &output)?;
    summary.appended = accumulate::append(&output, &config.result_file, config.output_delimiter)?;

    if let Err(e) = workspace.close() {
        warn!(error = %e, "workspace left behind");
        summary.cleanup = Some(e);
    }

    info!(
        read = summary.records_read,
        written = summary.records_written,
        skipped = summary.errors.len(),
        output = ?summary.output,
        "run finished"
    );

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::{output_name, run_on};
    use crate::{config::Config, error::Error};
    use chrono::NaiveDate;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    /// A `;` separated export line: key, category, twelve empty flags.
    fn line(key: &str, category: &str) -> String {
        (1..=23)
            .map(|p| match p {
                2 => key.to_string(),
                3 => category.to_string(),
                12..=23 => String::new(),
                _ => format!("v{}", p),
            })
            .collect::<Vec<_>>()
            .join(";")
    }

    fn header() -> String {
        (1..=23).map(|p| format!("c{}", p)).collect::<Vec<_>>().join(";")
    }

    fn export(dir: &Path, name: &str, records: &[(&str, &str)]) {
        let mut text = header();
        text.push('\n');

        for (key, category) in records {
            text.push_str(&line(key, category));
            text.push('\n');
        }

        fs::write(dir.join(name), text).unwrap();
    }

    fn setup() -> (TempDir, Config) {
        let root = tempfile::tempdir().unwrap();
        let input = root.path().join("in");
        fs::create_dir(&input).unwrap();

        export(&input, "F.B0001.A.CSV", &[("1001", "LOAN"), ("1002", "CARD")]);
        export(&input, "F.B0001.B.CSV", &[("1001", "CARD"), ("1003", "BOAT")]);
        fs::write(input.join("notes.txt"), "not an export").unwrap();
        fs::write(root.path().join("lookup.csv"), "LOAN,12\nCARD,14\n").unwrap();

        let config = Config {
            input_dir: input,
            lookup: root.path().join("lookup.csv"),
            output_dir: root.path().join("out"),
            result_file: root.path().join("out/result.csv"),
            ..Config::default()
        };

        (root, config)
    }

    fn read(path: &Path) -> Vec<Vec<String>> {
        csv::ReaderBuilder::new()
            .delimiter(b';')
            .has_headers(false)
            .from_path(path)
            .unwrap()
            .records()
            .map(|r| r.unwrap().iter().map(str::to_string).collect())
            .collect()
    }

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 7, day).unwrap()
    }

    #[test]
    fn merges_flags_across_files() {
        let (_root, config) = setup();

        let summary = run_on(&config, date(6)).unwrap();

        assert_eq!(summary.files.len(), 2);
        assert_eq!(summary.records_read, 4);
        assert_eq!(summary.records_written, 2);
        assert_eq!(summary.multi_flag_records, 1);
        assert_eq!(summary.lookup_misses, 1);
        assert_eq!(summary.appended, 2);
        assert!(summary.cleanup.is_none());
        assert!(matches!(
            summary.errors[0],
            Error::LookupMiss { ref key, .. } if key == "1003"
        ));

        let rows = read(&config.output_dir.join("merged_20250706.csv"));

        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].len(), 23);
        assert_eq!(rows[0][1], "c2");
        assert_eq!(rows[1][1], "1001");
        assert_eq!(rows[1][11], "J");
        assert_eq!(rows[1][13], "J");
        assert_eq!(rows[1][12], "N");
        assert_eq!(rows[2][1], "1002");
        assert_eq!(rows[2][11], "N");
        assert_eq!(rows[2][13], "J");

        assert!(!config.workspace_path().exists());
    }

    #[test]
    fn result_file_accumulates_runs() {
        let (_root, config) = setup();

        run_on(&config, date(6)).unwrap();
        run_on(&config, date(7)).unwrap();

        let rows = read(&config.result_file);

        assert_eq!(rows.len(), 5);
        assert_eq!(rows[0][0], "c1");
        assert_eq!(rows.iter().filter(|r| r[0] == "c1").count(), 1);
    }

    #[test]
    fn same_day_output_is_a_conflict() {
        let (_root, config) = setup();

        run_on(&config, date(6)).unwrap();

        match run_on(&config, date(6)) {
            Err(Error::ConfigurationConflict(path)) => {
                assert!(path.ends_with("merged_20250706.csv"))
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn leftover_workspace_stops_the_run() {
        let (_root, config) = setup();
        fs::create_dir_all(config.workspace_path()).unwrap();

        assert!(matches!(
            run_on(&config, date(6)),
            Err(Error::ConfigurationConflict(_))
        ));
        assert!(!config.result_file.exists());
        assert!(config.workspace_path().exists());
    }

    #[test]
    fn bad_lookup_stops_the_run_before_the_workspace() {
        let (_root, config) = setup();
        fs::write(&config.lookup, "LOAN,twelve\n").unwrap();

        assert!(matches!(
            run_on(&config, date(6)),
            Err(Error::InvalidLookup { .. })
        ));
        assert!(!config.workspace_path().exists());
    }

    #[test]
    fn export_narrower_than_the_layout_stops_the_run() {
        let (root, config) = setup();
        let input = root.path().join("narrow");
        fs::create_dir(&input).unwrap();

        let narrow = |fields: Vec<String>| fields[..22].join(";");
        let header: Vec<String> = (1..=23).map(|p| format!("c{}", p)).collect();
        let record: Vec<String> = line("1", "LOAN").split(';').map(str::to_string).collect();

        fs::write(
            input.join("a.csv"),
            format!(
                "{}\n{}\n{}\n",
                narrow(header),
                narrow(record.clone()),
                narrow(record)
            ),
        )
        .unwrap();
        fs::write(&config.lookup, "LOAN,23\n").unwrap();

        let config = Config {
            input_dir: input,
            ..config
        };

        match run_on(&config, date(6)) {
            Err(Error::Layout(reason)) => assert!(reason.contains("22 data columns")),
            other => panic!("unexpected {:?}", other),
        }

        assert!(!config.output_dir.join("merged_20250706.csv").exists());
        assert!(!config.result_file.exists());
        assert!(!config.workspace_path().exists());
    }

    #[test]
    fn incomplete_group_stops_the_run() {
        let (_root, config) = setup();
        export(&config.input_dir, "F.B0002.A.CSV", &[("2001", "LOAN")]);

        match run_on(&config, date(6)) {
            Err(Error::InconsistentFileSet { group, missing, .. }) => {
                assert_eq!(group, "0002");
                assert_eq!(missing, vec!["F.B####.B.CSV"]);
            }
            other => panic!("unexpected {:?}", other),
        }

        assert!(!config.workspace_path().exists());
    }

    #[test]
    fn empty_exports_are_listed_and_observations_skipped() {
        let (_root, config) = setup();
        export(&config.input_dir, "F.B0001.C.CSV", &[]);
        fs::write(config.input_dir.join("F.B0001.D.CSV"), "").unwrap();
        export(&config.input_dir, "F.B0001.OBS.CSV", &[("1009", "BOAT")]);

        let summary = run_on(&config, date(6)).unwrap();

        let names: Vec<String> = summary
            .empty_files
            .iter()
            .map(|f| f.file_name().unwrap().to_string_lossy().into_owned())
            .collect();

        assert_eq!(summary.files.len(), 4);
        assert_eq!(names, vec!["F.B0001.C.CSV", "F.B0001.D.CSV"]);
        assert_eq!(summary.records_read, 4);
        assert_eq!(summary.lookup_misses, 1);
    }

    #[test]
    fn summary_splits_flag_and_static_columns() {
        let (_root, config) = setup();

        let summary = run_on(&config, date(6)).unwrap();

        assert_eq!(summary.flag_columns.len(), 12);
        assert_eq!(summary.flag_columns[0], "c12");
        assert_eq!(summary.static_columns.len(), 11);
        assert!(!summary.static_columns.iter().any(|c| c.starts_with('_')));
    }

    #[test]
    fn output_names() {
        assert_eq!(
            output_name("merged_{date}.csv", date(6)).unwrap(),
            "merged_20250706.csv"
        );
        assert!(matches!(
            output_name("merged_{day}.csv", date(6)),
            Err(Error::OutputTemplate { .. })
        ));
        assert!(matches!(
            output_name("../{date}.csv", date(6)),
            Err(Error::OutputTemplate { .. })
        ));
    }

    #[test]
    fn summary_report() {
        let (_root, config) = setup();

        let report = run_on(&config, date(6)).unwrap().to_string();

        assert!(report.contains("Records written: 2"));
        assert!(report.contains("Files with no records: 0"));
        assert!(report.contains("Static columns: 11"));
        assert!(report.contains("Lookup misses: 1"));
        assert!(report.contains("no lookup entry for \"BOAT\""));
    }
}
