use std::path::PathBuf;

use snafu::{ensure, ResultExt};
use typed_builder::TypedBuilder;

use crate::table::Dataset;
use crate::{convert, extract, load, materialize};
use crate::{ConfigurationSnafu, CredentialsSnafu, Error};

pub const DEFAULT_RAW_PATH: &str = "data/raw/pharmacy_data.csv";
pub const DEFAULT_PARQUET_PATH: &str = "data/processed/pharmacy_data.parquet";
pub const DEFAULT_CREDS_DB: &str = "creds.db";
pub const DEFAULT_TARGET_TABLE: &str = "pharmacy_data";
pub const DEFAULT_SCHEMA: &str = "public";

#[derive(Debug, Clone, TypedBuilder)]
pub struct Config {
    #[builder(default = extract::DEFAULT_FILE_ID.into())]
    pub file_id: String,
    #[builder(default = DEFAULT_RAW_PATH.into())]
    pub raw_csv_path: PathBuf,
    #[builder(default = DEFAULT_PARQUET_PATH.into())]
    pub parquet_path: PathBuf,
    #[builder(default = DEFAULT_CREDS_DB.into())]
    pub creds_db_path: PathBuf,
    #[builder(default = DEFAULT_TARGET_TABLE.into())]
    pub table_name: String,
    #[builder(default = DEFAULT_SCHEMA.into())]
    pub schema: String,
    #[builder(default = load::MAX_UPLOAD_ROWS)]
    pub head_rows: usize,
    #[builder(default = extract::DEFAULT_DELIMITER)]
    pub delimiter: u8,
    #[builder(default)]
    pub convert: convert::Options,
    #[builder(default = true)]
    pub load_enabled: bool,
}

impl Default for Config {
    fn default() -> Config {
        Config::builder().build()
    }
}

/// Run extract, transform, materialize and (optionally) load, sequentially in
/// a single pass. Artifacts written by earlier stages are kept when a later
/// stage fails.
pub fn run_pipeline(config: &Config) -> Result<Dataset, Error> {
    config.convert.validate().context(ConfigurationSnafu {})?;

    log::info!("extract stage: fetching source {}", config.file_id);
    let mut dataset =
        extract::extract_dataset(&config.file_id, &config.raw_csv_path, config.delimiter)?;
    log::info!(
        "extracted {} rows, {} columns",
        dataset.row_count(),
        dataset.column_count()
    );

    log::info!("transform stage: auto-converting column types");
    convert::convert_dataset(&mut dataset, &config.convert).context(ConfigurationSnafu {})?;
    materialize::save_parquet(&dataset, &config.parquet_path)?;
    log::info!("saved processed dataset to {}", config.parquet_path.display());

    if config.load_enabled {
        ensure!(
            config.creds_db_path.exists(),
            CredentialsSnafu {
                message: format!(
                    "Credential store {} not found. Add it or run with --skip-load.",
                    config.creds_db_path.display()
                ),
            }
        );

        log::info!("load stage: uploading to {}.{}", config.schema, config.table_name);
        let credentials = load::load_credentials(&config.creds_db_path)?;
        let mut client = load::connect(&credentials)?;

        let mut upload = dataset.clone();
        upload.head(config.head_rows);

        load::upload_rows(
            &mut client,
            &upload,
            &config.table_name,
            &config.schema,
            config.head_rows,
        )?;
        let count = load::verify_upload(&mut client, &config.table_name, &config.schema)?;
        log::info!("verified {count} rows in {}.{}", config.schema, config.table_name);
    } else {
        log::info!("load stage skipped");
    }

    Ok(dataset)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults_match_the_conventional_layout() {
        let config = Config::default();
        assert_eq!(config.raw_csv_path, PathBuf::from("data/raw/pharmacy_data.csv"));
        assert_eq!(
            config.parquet_path,
            PathBuf::from("data/processed/pharmacy_data.parquet")
        );
        assert_eq!(config.creds_db_path, PathBuf::from("creds.db"));
        assert_eq!(config.schema, "public");
        assert_eq!(config.head_rows, 100);
        assert_eq!(config.delimiter, b';');
        assert!(config.load_enabled);
        assert_eq!(config.convert.numeric_threshold, 0.9);
        assert_eq!(config.convert.date_threshold, 0.9);
    }

    #[test]
    fn invalid_thresholds_fail_before_any_stage_runs() {
        let config = Config::builder()
            .convert(convert::Options::builder().numeric_threshold(2.0).build())
            .build();
        assert!(matches!(
            run_pipeline(&config),
            Err(Error::Configuration { .. })
        ));
    }
}
