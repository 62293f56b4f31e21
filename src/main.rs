use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use csvs_etl::convert;
use csvs_etl::extract;
use csvs_etl::pipeline::{self, Config};

#[derive(Parser, Debug)]
#[command(version, about = "Download, type-convert and load the pharmacy dataset", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Execute the full ETL pipeline
    Run(RunArgs),
}

#[derive(Args, Debug)]
struct RunArgs {
    /// Google Drive file identifier of the source CSV
    #[arg(long, value_name = "ID", default_value = extract::DEFAULT_FILE_ID)]
    file_id: String,

    /// Path to store the raw CSV
    #[arg(long, value_name = "PATH", default_value = pipeline::DEFAULT_RAW_PATH)]
    raw_csv_path: PathBuf,

    /// Path to store the processed Parquet file
    #[arg(long, value_name = "PATH", default_value = pipeline::DEFAULT_PARQUET_PATH)]
    parquet_path: PathBuf,

    /// Path to the SQLite store holding database credentials
    #[arg(long, value_name = "PATH", default_value = pipeline::DEFAULT_CREDS_DB)]
    creds_db_path: PathBuf,

    /// Target table name in the database
    #[arg(long, value_name = "TABLE", default_value = pipeline::DEFAULT_TARGET_TABLE)]
    table_name: String,

    /// Target schema in the database
    #[arg(long, value_name = "SCHEMA", default_value = pipeline::DEFAULT_SCHEMA)]
    schema: String,

    /// Field delimiter of the source CSV
    #[arg(long, value_name = "CHAR", default_value_t = ';')]
    delimiter: char,

    /// Maximum number of rows to upload (capped at 100)
    #[arg(long, value_name = "N", default_value_t = 100)]
    head_rows: usize,

    /// Fraction of cells that must parse as numbers to convert a column
    #[arg(long, value_name = "RATIO", default_value_t = 0.9)]
    numeric_threshold: f64,

    /// Fraction of cells that must parse as dates to convert a column
    #[arg(long, value_name = "RATIO", default_value_t = 0.9)]
    date_threshold: f64,

    /// Skip the database load stage (useful when creds.db is unavailable)
    #[arg(long)]
    skip_load: bool,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let args = match cli.command {
        Command::Run(args) => args,
    };

    if !args.delimiter.is_ascii() {
        log::error!("Delimiter must be a single ASCII character");
        std::process::exit(2);
    }

    let config = Config::builder()
        .file_id(args.file_id)
        .raw_csv_path(args.raw_csv_path)
        .parquet_path(args.parquet_path)
        .creds_db_path(args.creds_db_path)
        .table_name(args.table_name)
        .schema(args.schema)
        .delimiter(args.delimiter as u8)
        .head_rows(args.head_rows)
        .convert(
            convert::Options::builder()
                .numeric_threshold(args.numeric_threshold)
                .date_threshold(args.date_threshold)
                .build(),
        )
        .load_enabled(!args.skip_load)
        .build();

    if let Err(error) = pipeline::run_pipeline(&config) {
        log::error!("{error}");
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn delimiter_option_is_parsed() {
        let cli = Cli::parse_from(["csvs_etl", "run", "--delimiter", ",", "--skip-load"]);
        let args = match cli.command {
            Command::Run(args) => args,
        };
        assert_eq!(args.delimiter, ',');
        assert!(args.skip_load);

        let cli = Cli::parse_from(["csvs_etl", "run"]);
        let args = match cli.command {
            Command::Run(args) => args,
        };
        assert_eq!(args.delimiter, ';');
    }
}
