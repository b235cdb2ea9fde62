use chrono::{DateTime, Datelike, Timelike, Utc};
use common::Result;
use datafusion::arrow::array::{Array, Int32Array, Int64Array, TimestampMillisecondArray};
use datafusion::arrow::datatypes::{DataType, TimeUnit};
use datafusion::common::DataFusionError;
use datafusion::execution::context::SessionContext;
use datafusion::logical_expr::{ColumnarValue, ScalarUDF, Volatility, create_udf};
use std::sync::Arc;

pub const EPOCH_MILLIS_TO_TIMESTAMP: &str = "epoch_millis_to_timestamp";
pub const HOUR_OF_DAY: &str = "hour_of_day";
pub const DAY_OF_MONTH: &str = "day_of_month";
pub const ISO_WEEK: &str = "iso_week";
pub const MONTH_OF_YEAR: &str = "month_of_year";
pub const CALENDAR_YEAR: &str = "calendar_year";
pub const ISO_WEEKDAY: &str = "iso_weekday";

/// Registers all UDFs with the SessionContext
pub fn register_udfs(ctx: &SessionContext) -> Result<()> {
    ctx.register_udf(epoch_millis_to_timestamp());
    for udf in calendar_udfs() {
        ctx.register_udf(udf);
    }

    Ok(())
}

/// Calendar decomposition of one instant, in UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalendarFields {
    pub hour: i32,
    pub day: i32,
    pub week: i32,
    pub month: i32,
    pub year: i32,
    /// Monday = 1 .. Sunday = 7
    pub weekday: i32,
}

impl CalendarFields {
    pub fn from_epoch_millis(millis: i64) -> Option<Self> {
        DateTime::<Utc>::from_timestamp_millis(millis).map(|dt| Self::from_datetime(&dt))
    }

    pub fn from_datetime(dt: &DateTime<Utc>) -> Self {
        Self {
            hour: dt.hour() as i32,
            day: dt.day() as i32,
            week: dt.iso_week().week() as i32,
            month: dt.month() as i32,
            year: dt.year(),
            weekday: dt.weekday().number_from_monday() as i32,
        }
    }
}

/// `ts` (epoch milliseconds) to `Timestamp(Millisecond)`. Values outside
/// the representable calendar range become null.
pub fn epoch_millis_to_timestamp() -> ScalarUDF {
    create_udf(
        EPOCH_MILLIS_TO_TIMESTAMP,
        vec![DataType::Int64],
        DataType::Timestamp(TimeUnit::Millisecond, None),
        Volatility::Immutable,
        Arc::new(convert_to_timestamp),
    )
}

pub fn hour_of_day() -> ScalarUDF {
    calendar_udf(HOUR_OF_DAY, |f| f.hour)
}

pub fn day_of_month() -> ScalarUDF {
    calendar_udf(DAY_OF_MONTH, |f| f.day)
}

pub fn iso_week() -> ScalarUDF {
    calendar_udf(ISO_WEEK, |f| f.week)
}

pub fn month_of_year() -> ScalarUDF {
    calendar_udf(MONTH_OF_YEAR, |f| f.month)
}

pub fn calendar_year() -> ScalarUDF {
    calendar_udf(CALENDAR_YEAR, |f| f.year)
}

pub fn iso_weekday() -> ScalarUDF {
    calendar_udf(ISO_WEEKDAY, |f| f.weekday)
}

fn calendar_udfs() -> Vec<ScalarUDF> {
    vec![
        hour_of_day(),
        day_of_month(),
        iso_week(),
        month_of_year(),
        calendar_year(),
        iso_weekday(),
    ]
}

fn calendar_udf(name: &str, part: fn(&CalendarFields) -> i32) -> ScalarUDF {
    create_udf(
        name,
        vec![DataType::Timestamp(TimeUnit::Millisecond, None)],
        DataType::Int32,
        Volatility::Immutable,
        Arc::new(move |args: &[ColumnarValue]| extract_calendar_part(args, part)),
    )
}

/// Converts Unix timestamp (milliseconds) to Arrow Timestamp
fn convert_to_timestamp(
    args: &[ColumnarValue],
) -> datafusion::error::Result<ColumnarValue> {
    let arrays = ColumnarValue::values_to_arrays(args)?;
    let int_array = arrays[0]
        .as_any()
        .downcast_ref::<Int64Array>()
        .ok_or_else(|| DataFusionError::Internal("Expected int64 array".to_string()))?;

    let result: TimestampMillisecondArray = int_array
        .iter()
        .map(|opt_ts| {
            opt_ts.and_then(|ts| DateTime::from_timestamp_millis(ts).map(|dt| dt.timestamp_millis()))
        })
        .collect();

    Ok(ColumnarValue::Array(Arc::new(result)))
}

fn extract_calendar_part(
    args: &[ColumnarValue],
    part: fn(&CalendarFields) -> i32,
) -> datafusion::error::Result<ColumnarValue> {
    let arrays = ColumnarValue::values_to_arrays(args)?;
    let ts_array = arrays[0]
        .as_any()
        .downcast_ref::<TimestampMillisecondArray>()
        .ok_or_else(|| {
            DataFusionError::Internal("Expected millisecond timestamp array".to_string())
        })?;

    let result: Int32Array = ts_array
        .iter()
        .map(|opt_ts| {
            opt_ts
                .and_then(CalendarFields::from_epoch_millis)
                .map(|fields| part(&fields))
        })
        .collect();

    Ok(ColumnarValue::Array(Arc::new(result)))
}
