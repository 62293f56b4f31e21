use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use arrow::array::{Array, ArrayRef, Float64Array, StringArray, TimestampNanosecondArray};
use arrow::datatypes::{DataType, Field, Schema, TimeUnit};
use arrow::record_batch::RecordBatch;
use chrono::DateTime;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;
use snafu::ResultExt;

use crate::table::{Column, ColumnValues, Dataset};
use crate::{ArrowSnafu, Error, IoSnafu, MaterializeSnafu, ParquetSnafu};

fn arrow_field(column: &Column) -> Field {
    let data_type = match column.values {
        ColumnValues::Text(_) => DataType::Utf8,
        ColumnValues::Numeric(_) => DataType::Float64,
        ColumnValues::Temporal(_) => DataType::Timestamp(TimeUnit::Nanosecond, None),
    };
    Field::new(column.name.as_str(), data_type, true)
}

fn arrow_array(column: &Column) -> Result<ArrayRef, Error> {
    let array: ArrayRef = match &column.values {
        ColumnValues::Text(values) => {
            let cells: Vec<Option<&str>> = values.iter().map(|cell| cell.as_deref()).collect();
            Arc::new(StringArray::from(cells))
        }
        ColumnValues::Numeric(values) => Arc::new(Float64Array::from(values.clone())),
        ColumnValues::Temporal(values) => {
            let mut nanos: Vec<Option<i64>> = Vec::with_capacity(values.len());
            for cell in values {
                match cell {
                    None => nanos.push(None),
                    Some(timestamp) => {
                        // A present value must stay present on disk; refuse
                        // timestamps the nanosecond encoding cannot hold.
                        let value =
                            timestamp.and_utc().timestamp_nanos_opt().ok_or_else(|| {
                                MaterializeSnafu {
                                    message: format!(
                                        "Timestamp {timestamp} in column {} is outside the representable range",
                                        column.name
                                    ),
                                }
                                .build()
                            })?;
                        nanos.push(Some(value));
                    }
                }
            }
            Arc::new(TimestampNanosecondArray::from(nanos))
        }
    };
    Ok(array)
}

/// Persist the dataset to a Parquet file, one nullable field per column, and
/// return the written path. Missing parent directories are created.
pub fn save_parquet(dataset: &Dataset, path: &Path) -> Result<PathBuf, Error> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).context(IoSnafu {
                filename: parent.to_string_lossy(),
            })?;
        }
    }

    let fields: Vec<Field> = dataset.columns().iter().map(arrow_field).collect();
    let arrays: Vec<ArrayRef> = dataset
        .columns()
        .iter()
        .map(arrow_array)
        .collect::<Result<_, Error>>()?;

    let batch =
        RecordBatch::try_new(Arc::new(Schema::new(fields)), arrays).context(ArrowSnafu {})?;

    let props = WriterProperties::builder()
        .set_dictionary_enabled(false)
        .set_compression(Compression::SNAPPY);

    let output = File::create(path).context(IoSnafu {
        filename: path.to_string_lossy(),
    })?;

    let mut writer =
        ArrowWriter::try_new(output, batch.schema(), Some(props.build())).context(ParquetSnafu {})?;
    writer.write(&batch).context(ParquetSnafu {})?;
    writer.close().context(ParquetSnafu {})?;

    Ok(path.to_path_buf())
}

/// Read a Parquet file written by [`save_parquet`] back into a dataset with
/// the column types preserved.
pub fn load_parquet(path: &Path) -> Result<Dataset, Error> {
    let file = File::open(path).context(IoSnafu {
        filename: path.to_string_lossy(),
    })?;

    let builder = ParquetRecordBatchReaderBuilder::try_new(file).context(ParquetSnafu {})?;
    let schema = builder.schema().clone();
    let reader = builder.build().context(ParquetSnafu {})?;

    let mut columns: Vec<ColumnValues> = schema
        .fields()
        .iter()
        .map(|field| match field.data_type() {
            DataType::Float64 => Ok(ColumnValues::Numeric(vec![])),
            DataType::Timestamp(TimeUnit::Nanosecond, _) => Ok(ColumnValues::Temporal(vec![])),
            DataType::Utf8 => Ok(ColumnValues::Text(vec![])),
            other => MaterializeSnafu {
                message: format!(
                    "Unsupported column type {other} for field {}",
                    field.name()
                ),
            }
            .fail(),
        })
        .collect::<Result<_, Error>>()?;

    for batch in reader {
        let batch = batch.context(ArrowSnafu {})?;
        for (index, values) in columns.iter_mut().enumerate() {
            append_batch_column(values, batch.column(index))?;
        }
    }

    let mut dataset = Dataset::new();
    for (field, values) in schema.fields().iter().zip(columns) {
        dataset.push_column(Column::new(field.name().clone(), values));
    }
    Ok(dataset)
}

fn append_batch_column(values: &mut ColumnValues, array: &ArrayRef) -> Result<(), Error> {
    match values {
        ColumnValues::Numeric(cells) => {
            let array = downcast::<Float64Array>(array)?;
            for row in 0..array.len() {
                cells.push((!array.is_null(row)).then(|| array.value(row)));
            }
        }
        ColumnValues::Temporal(cells) => {
            let array = downcast::<TimestampNanosecondArray>(array)?;
            for row in 0..array.len() {
                cells.push(
                    (!array.is_null(row))
                        .then(|| DateTime::from_timestamp_nanos(array.value(row)).naive_utc()),
                );
            }
        }
        ColumnValues::Text(cells) => {
            let array = downcast::<StringArray>(array)?;
            for row in 0..array.len() {
                cells.push((!array.is_null(row)).then(|| array.value(row).to_owned()));
            }
        }
    }
    Ok(())
}

fn downcast<T: 'static>(array: &ArrayRef) -> Result<&T, Error> {
    array.as_any().downcast_ref::<T>().ok_or_else(|| {
        MaterializeSnafu {
            message: "Parquet column does not match its declared type".to_string(),
        }
        .build()
    })
}
