use std::path::PathBuf;

use crate::{
    error::Result,
    flag::UNSET_TOKEN,
    input::InputFormat,
    layout::{
        Layout, FIRST_FLAG_POSITION, KEY_POSITION, LAST_FLAG_POSITION, REMAP_SOURCE_POSITION,
    },
};

/// Everything one run needs to know.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Directory scanned for exported files.
    pub input_dir: PathBuf,
    /// Regular expression file names must match to be read.
    pub file_pattern: String,
    /// Regular expression whose first capture group is the group id of an
    /// export's file name. Every group must deliver the same kinds of file.
    pub group_pattern: String,
    /// Leave out exports whose name contains `OBS`.
    pub exclude_obs: bool,
    /// `key,column_index` table driving the remapper.
    pub lookup: PathBuf,
    /// Directory receiving the per-run output file and the workspace.
    pub output_dir: PathBuf,
    /// Name of the per-run output file, a template where `{date}` expands to
    /// the run date as `YYYYMMDD`.
    pub output_template: String,
    /// Cumulative file every run appends to.
    pub result_file: PathBuf,
    /// Name of the per-run workspace directory inside `output_dir`.
    pub workspace_name: String,
    pub input_delimiter: u8,
    pub output_delimiter: u8,
    /// WHATWG label of the exports' encoding.
    pub encoding: String,
    /// Written into flag columns the exports leave empty.
    pub fill: String,
    /// 1-indexed positions of the key, the remap source and the flag block.
    pub key_position: usize,
    pub remap_source_position: usize,
    pub first_flag_position: usize,
    pub last_flag_position: usize,
}

impl Default for Config {
    fn default() -> Config {
        Config {
            input_dir: PathBuf::from("."),
            file_pattern: String::from(r"(?i)\.csv$"),
            group_pattern: String::from(r"\.B(\d{4})\."),
            exclude_obs: true,
            lookup: PathBuf::from("lookup.csv"),
            output_dir: PathBuf::from("out"),
            output_template: String::from("merged_{date}.csv"),
            result_file: PathBuf::from("out/result.csv"),
            workspace_name: String::from(".csvfold-work"),
            input_delimiter: b';',
            output_delimiter: b';',
            encoding: String::from("latin1"),
            fill: String::from(UNSET_TOKEN),
            key_position: KEY_POSITION,
            remap_source_position: REMAP_SOURCE_POSITION,
            first_flag_position: FIRST_FLAG_POSITION,
            last_flag_position: LAST_FLAG_POSITION,
        }
    }
}

impl Config {
    pub fn workspace_path(&self) -> PathBuf {
        self.output_dir.join(&self.workspace_name)
    }

    pub fn input_format(&self) -> Result<InputFormat> {
        InputFormat::new(self.input_delimiter, &self.encoding)
    }

    pub fn layout(&self) -> Result<Layout> {
        Layout::new(
            self.key_position,
            self.remap_source_position,
            self.first_flag_position,
            self.last_flag_position,
        )
    }
}
