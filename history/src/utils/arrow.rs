use arrow::array::{
    Array, BooleanArray, Float64Array, Int32Array, Int64Array, StringArray, TimestampMicrosecondArray,
    TimestampMillisecondArray, TimestampNanosecondArray, TimestampSecondArray, UInt64Array,
};
use arrow::datatypes::{DataType, TimeUnit};
use arrow::record_batch::RecordBatch;
use chrono::{DateTime, Utc};
use common::{Error, Result};
use serde_json::{Number, Value};

pub fn batches_to_json(batches: &[RecordBatch]) -> Result<Vec<Value>> {
    let mut json_rows = Vec::new();

    for batch in batches {
        let schema = batch.schema();
        for row_idx in 0..batch.num_rows() {
            let mut row = serde_json::Map::new();

            for (col_idx, field) in schema.fields().iter().enumerate() {
                let value = arrow_array_to_json(batch.column(col_idx).as_ref(), row_idx)?;
                row.insert(field.name().clone(), value);
            }

            json_rows.push(Value::Object(row));
        }
    }

    Ok(json_rows)
}

fn downcast<T: 'static>(array: &dyn Array) -> Result<&T> {
    array
        .as_any()
        .downcast_ref::<T>()
        .ok_or_else(|| Error::Other(format!("Unexpected array for type {}", array.data_type())))
}

fn timestamp(datetime: Option<DateTime<Utc>>) -> Value {
    datetime.map_or(Value::Null, |dt| Value::String(dt.to_rfc3339()))
}

pub fn arrow_array_to_json(array: &dyn Array, index: usize) -> Result<Value> {
    if array.is_null(index) {
        return Ok(Value::Null);
    }

    Ok(match array.data_type() {
        DataType::Boolean => Value::Bool(downcast::<BooleanArray>(array)?.value(index)),
        DataType::Int32 => Value::Number(Number::from(downcast::<Int32Array>(array)?.value(index))),
        DataType::Int64 => Value::Number(Number::from(downcast::<Int64Array>(array)?.value(index))),
        DataType::UInt64 => Value::Number(Number::from(downcast::<UInt64Array>(array)?.value(index))),
        DataType::Float64 => Number::from_f64(downcast::<Float64Array>(array)?.value(index))
            .map_or(Value::Null, Value::Number),
        DataType::Utf8 => Value::String(downcast::<StringArray>(array)?.value(index).to_string()),
        DataType::Timestamp(unit, _) => match unit {
            TimeUnit::Second => {
                timestamp(DateTime::from_timestamp(downcast::<TimestampSecondArray>(array)?.value(index), 0))
            }
            TimeUnit::Millisecond => timestamp(DateTime::from_timestamp_millis(
                downcast::<TimestampMillisecondArray>(array)?.value(index),
            )),
            TimeUnit::Microsecond => timestamp(DateTime::from_timestamp_micros(
                downcast::<TimestampMicrosecondArray>(array)?.value(index),
            )),
            TimeUnit::Nanosecond => timestamp(Some(DateTime::from_timestamp_nanos(
                downcast::<TimestampNanosecondArray>(array)?.value(index),
            ))),
        },
        _ => Value::Null,
    })
}
