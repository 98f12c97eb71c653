//! Arrow schema for the readings table.
//!
//! Column order: `timestamp`, `latitude`, `longitude`, then every entry of
//! [`NUMERIC_FIELDS`]. Timestamps are stored as whole UTC seconds; any
//! sub-second part of the in-memory instant is dropped on encode.

use std::sync::Arc;

use arrow::array::{Array, ArrayRef, AsArray, Float64Array, TimestampSecondArray};
use arrow::compute::cast;
use arrow::datatypes::{DataType, Field, Float64Type, Schema, SchemaRef, TimeUnit, TimestampSecondType};
use arrow::error::ArrowError;
use arrow::record_batch::RecordBatch;
use chrono::DateTime;
use es_common::{Reading, NUMERIC_FIELDS};

pub const TIMESTAMP_COLUMN: &str = "timestamp";
pub const LATITUDE_COLUMN: &str = "latitude";
pub const LONGITUDE_COLUMN: &str = "longitude";

fn timestamp_type() -> DataType {
    DataType::Timestamp(TimeUnit::Second, Some("UTC".into()))
}

/// Schema for the readings table.
pub fn readings_schema() -> SchemaRef {
    let mut fields = vec![
        Field::new(TIMESTAMP_COLUMN, timestamp_type(), false),
        Field::new(LATITUDE_COLUMN, DataType::Float64, false),
        Field::new(LONGITUDE_COLUMN, DataType::Float64, false),
    ];
    fields.extend(
        NUMERIC_FIELDS
            .iter()
            .map(|f| Field::new(f.name, DataType::Float64, true)),
    );
    Arc::new(Schema::new(fields))
}

/// Encode readings into one record batch.
pub fn readings_to_batch(readings: &[Reading]) -> Result<RecordBatch, ArrowError> {
    let timestamps: Vec<i64> = readings.iter().map(|r| r.timestamp.timestamp()).collect();
    let latitudes: Vec<f64> = readings.iter().map(|r| r.latitude).collect();
    let longitudes: Vec<f64> = readings.iter().map(|r| r.longitude).collect();

    let mut columns: Vec<ArrayRef> = Vec::with_capacity(3 + NUMERIC_FIELDS.len());
    columns.push(Arc::new(
        TimestampSecondArray::from(timestamps).with_timezone("UTC"),
    ));
    columns.push(Arc::new(Float64Array::from(latitudes)));
    columns.push(Arc::new(Float64Array::from(longitudes)));
    for field in NUMERIC_FIELDS {
        let values: Vec<Option<f64>> = readings.iter().map(|r| (field.get)(r)).collect();
        columns.push(Arc::new(Float64Array::from(values)));
    }

    RecordBatch::try_new(readings_schema(), columns)
}

/// Decode a record batch back into readings.
///
/// Tolerant of files written by other tools: absent numeric columns decode
/// as `None`, numeric columns of other types are cast to `Float64`, and
/// timestamps of any unit are cast to whole seconds.
pub fn batch_to_readings(batch: &RecordBatch) -> Result<Vec<Reading>, ArrowError> {
    let ts_column = required_column(batch, TIMESTAMP_COLUMN)?;
    let ts_array = cast(ts_column, &DataType::Timestamp(TimeUnit::Second, None))?;
    let timestamps = ts_array.as_primitive::<TimestampSecondType>();
    let latitudes = float_column(batch, LATITUDE_COLUMN)?;
    let longitudes = float_column(batch, LONGITUDE_COLUMN)?;

    let numeric: Vec<Option<Float64Array>> = NUMERIC_FIELDS
        .iter()
        .map(|f| match batch.column_by_name(f.name) {
            Some(_) => float_column(batch, f.name).map(Some),
            None => Ok(None),
        })
        .collect::<Result<_, _>>()?;

    let mut readings = Vec::with_capacity(batch.num_rows());
    for row in 0..batch.num_rows() {
        if timestamps.is_null(row) {
            return Err(ArrowError::InvalidArgumentError(format!(
                "null timestamp at row {row}"
            )));
        }
        let secs = timestamps.value(row);
        let timestamp = DateTime::from_timestamp(secs, 0).ok_or_else(|| {
            ArrowError::InvalidArgumentError(format!("timestamp {secs} out of range"))
        })?;

        let mut reading = Reading::new(
            timestamp,
            value_at(&latitudes, row).unwrap_or(f64::NAN),
            value_at(&longitudes, row).unwrap_or(f64::NAN),
        );
        for (field, column) in NUMERIC_FIELDS.iter().zip(&numeric) {
            let value = column.as_ref().and_then(|c| value_at(c, row));
            (field.set)(&mut reading, value);
        }
        readings.push(reading);
    }
    Ok(readings)
}

fn required_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a ArrayRef, ArrowError> {
    batch
        .column_by_name(name)
        .ok_or_else(|| ArrowError::SchemaError(format!("missing column '{name}'")))
}

fn float_column(batch: &RecordBatch, name: &str) -> Result<Float64Array, ArrowError> {
    let column = required_column(batch, name)?;
    let casted = cast(column, &DataType::Float64)?;
    Ok(casted.as_primitive::<Float64Type>().clone())
}

fn value_at(array: &Float64Array, row: usize) -> Option<f64> {
    if array.is_null(row) {
        None
    } else {
        Some(array.value(row))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::Int32Array;
    use chrono::{TimeZone, Utc};

    fn sample(secs: u32, millis: u32) -> Reading {
        let ts = Utc.with_ymd_and_hms(2026, 10, 18, 12, 0, secs).unwrap()
            + chrono::Duration::milliseconds(millis as i64);
        let mut r = Reading::new(ts, 30.0626, 31.4916);
        r.temperature = Some(24.5);
        r.raw_temperature = Some(27.1);
        r.pm2_5 = Some(12.0);
        r
    }

    #[test]
    fn schema_has_all_columns() {
        let schema = readings_schema();
        assert_eq!(schema.fields().len(), 3 + NUMERIC_FIELDS.len());
        assert_eq!(schema.field(0).name(), TIMESTAMP_COLUMN);
        assert!(!schema.field(0).is_nullable());
        assert!(schema.field_with_name("particles_50um").unwrap().is_nullable());
    }

    #[test]
    fn encode_truncates_to_whole_seconds() {
        let batch = readings_to_batch(&[sample(7, 950)]).unwrap();
        let ts = batch
            .column(0)
            .as_primitive::<TimestampSecondType>()
            .value(0);
        assert_eq!(ts, sample(7, 0).timestamp.timestamp());

        let decoded = batch_to_readings(&batch).unwrap();
        assert_eq!(decoded[0].timestamp, sample(7, 0).timestamp);
    }

    #[test]
    fn nulls_survive_decode() {
        let readings = vec![sample(1, 0), Reading::new(sample(2, 0).timestamp, 1.0, 2.0)];
        let decoded = batch_to_readings(&readings_to_batch(&readings).unwrap()).unwrap();
        assert_eq!(decoded, readings);
        assert!(decoded[1].temperature.is_none());
    }

    #[test]
    fn empty_batch_encodes() {
        let batch = readings_to_batch(&[]).unwrap();
        assert_eq!(batch.num_rows(), 0);
        assert!(batch_to_readings(&batch).unwrap().is_empty());
    }

    #[test]
    fn decode_tolerates_missing_and_integer_columns() {
        let schema = Arc::new(Schema::new(vec![
            Field::new(
                TIMESTAMP_COLUMN,
                DataType::Timestamp(TimeUnit::Millisecond, None),
                false,
            ),
            Field::new(LATITUDE_COLUMN, DataType::Float64, false),
            Field::new(LONGITUDE_COLUMN, DataType::Float64, false),
            Field::new("proximity", DataType::Int32, true),
        ]));
        let batch = RecordBatch::try_new(
            schema,
            vec![
                Arc::new(arrow::array::TimestampMillisecondArray::from(vec![
                    1_760_788_807_500i64,
                ])),
                Arc::new(Float64Array::from(vec![30.0])),
                Arc::new(Float64Array::from(vec![31.0])),
                Arc::new(Int32Array::from(vec![Some(12)])),
            ],
        )
        .unwrap();

        let decoded = batch_to_readings(&batch).unwrap();
        assert_eq!(decoded[0].timestamp.timestamp(), 1_760_788_807);
        assert_eq!(decoded[0].proximity, Some(12.0));
        assert!(decoded[0].pm1.is_none());
    }

    #[test]
    fn decode_requires_timestamp() {
        let schema = Arc::new(Schema::new(vec![Field::new(
            LATITUDE_COLUMN,
            DataType::Float64,
            false,
        )]));
        let batch =
            RecordBatch::try_new(schema, vec![Arc::new(Float64Array::from(vec![1.0]))]).unwrap();
        assert!(batch_to_readings(&batch).is_err());
    }
}
