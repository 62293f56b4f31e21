pub mod convert;
pub mod extract;
pub mod load;
pub mod materialize;
pub mod pipeline;
pub mod table;

pub use convert::{convert_column, convert_dataset, convert_dataset_copy, ConvertError};
pub use extract::{extract_dataset, fetch_remote_table, parse_delimited};
pub use load::{load_credentials, upload_rows, Credentials};
pub use materialize::{load_parquet, save_parquet};
pub use pipeline::{run_pipeline, Config};
pub use table::{Column, ColumnValues, Dataset, ValueKind};

use snafu::Snafu;

#[non_exhaustive]
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum Error {
    #[snafu(display("{}", message))]
    Validation { message: String },

    #[snafu(display("{}", source))]
    Configuration { source: convert::ConvertError },

    #[snafu(display("Error fetching {}: {}", url, source))]
    Transport { source: reqwest::Error, url: String },

    #[snafu(display("Remote source returned status {} for {}", status, url))]
    TransportStatus { status: u16, url: String },

    #[snafu(display("{}", message))]
    Credentials { message: String },

    #[snafu(display("Upload allows at most {} rows, dataset has {}", max_rows, row_count))]
    RowLimit { row_count: usize, max_rows: usize },

    #[snafu(display("No rows left to upload after truncation"))]
    EmptyDataset {},

    #[snafu(display("Error reading file {}: {}", filename, source))]
    Io {
        source: std::io::Error,
        filename: String,
    },

    #[snafu(display("Error reading CSV: {}", source))]
    Csv { source: csv::Error },

    #[snafu(display("{}{}", message, source))]
    Rusqlite {
        source: rusqlite::Error,
        message: String,
    },

    #[snafu(display("Postgres Error: {}", source))]
    Postgres { source: postgres::Error },

    #[snafu(display("{}", source))]
    Parquet {
        source: parquet::errors::ParquetError,
    },

    #[snafu(display("{}", source))]
    Arrow { source: arrow::error::ArrowError },

    #[snafu(display("{}", message))]
    Materialize { message: String },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
