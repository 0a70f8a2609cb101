use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::error;

use csvfold::config::Config;
use csvfold::layout;
use csvfold::logging::{init_logging, LogConfig};
use csvfold::pipeline;

/// Folds exported CSV files into one record per key, merging their J/N flags
#[derive(Debug, Parser)]
#[command(name = "csvfold", version)]
struct Cli {
    /// Directory with the exported files
    #[arg(short = 'i', long)]
    input_dir: PathBuf,

    /// key,column_index table mapping category names to flag columns
    #[arg(short = 'l', long)]
    lookup: PathBuf,

    /// Directory receiving the per-run output file
    #[arg(short = 'o', long, default_value = "out")]
    output_dir: PathBuf,

    /// Cumulative file every run is appended to
    #[arg(short = 'r', long)]
    result_file: Option<PathBuf>,

    /// Regular expression input file names must match
    #[arg(long, default_value = r"(?i)\.csv$")]
    pattern: String,

    /// Encoding of the exported files (WHATWG label)
    #[arg(long, default_value = "latin1")]
    encoding: String,

    /// Field delimiter of the exported files
    #[arg(long, default_value_t = ';')]
    delimiter: char,

    /// Field delimiter of the output files
    #[arg(long, default_value_t = ';')]
    output_delimiter: char,

    /// Name of the per-run output file, `{date}` expands to YYYYMMDD
    #[arg(long, default_value = "merged_{date}.csv")]
    output_template: String,

    /// Regular expression whose first group is the group id in file names
    #[arg(long, default_value = r"\.B(\d{4})\.")]
    group_pattern: String,

    /// Also read exports whose name contains OBS
    #[arg(long)]
    include_obs: bool,

    /// Token written into empty flag columns
    #[arg(long, default_value = "N")]
    fill: String,

    /// Name of the per-run working directory inside the output directory
    #[arg(long, default_value = ".csvfold-work")]
    workspace_name: String,

    /// Position of the key column, counting from 1
    #[arg(long, default_value_t = layout::KEY_POSITION)]
    key_position: usize,

    /// Position of the column holding the category name
    #[arg(long, default_value_t = layout::REMAP_SOURCE_POSITION)]
    remap_source_position: usize,

    /// Position of the first flag column
    #[arg(long, default_value_t = layout::FIRST_FLAG_POSITION)]
    first_flag_position: usize,

    /// Position of the last flag column
    #[arg(long, default_value_t = layout::LAST_FLAG_POSITION)]
    last_flag_position: usize,

    /// Append log lines to this file instead of stderr
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// More output, repeat for even more
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn delimiter(c: char) -> Result<u8, String> {
    u8::try_from(c).map_err(|_| format!("delimiter {:?} is not a single byte", c))
}

impl Cli {
    fn into_config(self) -> Result<Config, String> {
        let result_file = self
            .result_file
            .unwrap_or_else(|| self.output_dir.join("result.csv"));

        Ok(Config {
            input_dir: self.input_dir,
            file_pattern: self.pattern,
            lookup: self.lookup,
            output_dir: self.output_dir,
            output_template: self.output_template,
            result_file,
            input_delimiter: delimiter(self.delimiter)?,
            output_delimiter: delimiter(self.output_delimiter)?,
            encoding: self.encoding,
            group_pattern: self.group_pattern,
            exclude_obs: !self.include_obs,
            fill: self.fill,
            workspace_name: self.workspace_name,
            key_position: self.key_position,
            remap_source_position: self.remap_source_position,
            first_flag_position: self.first_flag_position,
            last_flag_position: self.last_flag_position,
        })
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let log_config = LogConfig::from_verbosity(cli.verbose).with_log_file(cli.log_file.clone());

    if let Err(e) = init_logging(&log_config) {
        eprintln!("could not open log file: {}", e);
        return ExitCode::FAILURE;
    }

    let config = match cli.into_config() {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    match pipeline::run(&config) {
        Ok(summary) => {
            println!("{}", summary);
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "run failed");
            ExitCode::FAILURE
        }
    }
}
