use std::path::{Path, PathBuf};

use snafu::{ensure, ResultExt};

use crate::table::{Column, ColumnValues, Dataset};
use crate::{
    CsvSnafu, Error, IoSnafu, TransportSnafu, TransportStatusSnafu, ValidationSnafu,
};

pub const GOOGLE_DRIVE_URL_TEMPLATE: &str = "https://drive.google.com/uc?export=download&id=";
pub const DEFAULT_FILE_ID: &str = "1Svje8GeeWe-hp_F-FNtnYZEGHWo1Lp-Y";
pub const DEFAULT_DELIMITER: u8 = b';';

/// Direct download URL for a Google Drive file.
pub fn build_download_url(file_id: &str) -> String {
    format!("{GOOGLE_DRIVE_URL_TEMPLATE}{file_id}")
}

/// Fetch the raw delimited payload from the remote source.
pub fn fetch_remote_table(file_id: &str) -> Result<String, Error> {
    let url = build_download_url(file_id);

    let response = reqwest::blocking::get(&url).context(TransportSnafu { url: url.as_str() })?;

    let status = response.status();
    ensure!(
        status.is_success(),
        TransportStatusSnafu {
            status: status.as_u16(),
            url: url.as_str(),
        }
    );

    response.text().context(TransportSnafu { url: url.as_str() })
}

/// Parse delimited text into an untyped dataset where every column is text.
/// Empty cells are recorded as absent.
pub fn parse_delimited(raw: &str, delimiter: u8) -> Result<Dataset, Error> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .from_reader(raw.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .context(CsvSnafu {})?
        .iter()
        .map(|header| header.trim().to_owned())
        .collect();

    let mut columns: Vec<Vec<Option<String>>> = vec![vec![]; headers.len()];

    for record in reader.records() {
        let record = record.context(CsvSnafu {})?;
        for (index, cells) in columns.iter_mut().enumerate() {
            match record.get(index) {
                Some(cell) if !cell.is_empty() => cells.push(Some(cell.to_owned())),
                _ => cells.push(None),
            }
        }
    }

    let mut dataset = Dataset::new();
    for (header, cells) in headers.into_iter().zip(columns) {
        dataset.push_column(Column::new(header, ColumnValues::Text(cells)));
    }
    Ok(dataset)
}

/// Write the dataset as delimited UTF-8 text, creating any missing parent
/// directory first. Absent cells become empty fields.
pub fn save_raw_csv(dataset: &Dataset, path: &Path, delimiter: u8) -> Result<PathBuf, Error> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).context(IoSnafu {
                filename: parent.to_string_lossy(),
            })?;
        }
    }

    let mut writer = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .from_path(path)
        .context(CsvSnafu {})?;

    let names: Vec<&str> = dataset
        .columns()
        .iter()
        .map(|column| column.name.as_str())
        .collect();
    writer.write_record(&names).context(CsvSnafu {})?;

    for row in 0..dataset.row_count() {
        let record: Vec<String> = dataset
            .columns()
            .iter()
            .map(|column| column.values.render(row).unwrap_or_default())
            .collect();
        writer.write_record(&record).context(CsvSnafu {})?;
    }
    writer.flush().context(IoSnafu {
        filename: path.to_string_lossy(),
    })?;

    Ok(path.to_path_buf())
}

/// Full extract stage: download, parse, validate, persist the raw CSV.
pub fn extract_dataset(
    file_id: &str,
    raw_csv_path: &Path,
    delimiter: u8,
) -> Result<Dataset, Error> {
    let raw = fetch_remote_table(file_id)?;
    let dataset = parse_delimited(&raw, delimiter)?;

    ensure!(
        !dataset.is_empty(),
        ValidationSnafu {
            message: "Raw dataset is empty, nothing to process",
        }
    );

    save_raw_csv(&dataset, raw_csv_path, delimiter)?;
    log::info!(
        "saved raw CSV with {} rows to {}",
        dataset.row_count(),
        raw_csv_path.display()
    );
    Ok(dataset)
}
