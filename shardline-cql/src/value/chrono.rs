use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, TimeZone, Timelike, Utc};

use crate::{
    error::ConversionError,
    value::{CqlDate, CqlTime, CqlTimestamp, CqlValue, FromCqlValue},
};

const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

impl From<NaiveDate> for CqlDate {
    fn from(value: NaiveDate) -> Self {
        Self::from_days_since_epoch(value.num_days_from_ce() - UNIX_EPOCH_DAYS_FROM_CE)
    }
}

impl TryFrom<CqlDate> for NaiveDate {
    type Error = ConversionError;
    fn try_from(value: CqlDate) -> Result<Self, Self::Error> {
        value
            .days_since_epoch()
            .checked_add(UNIX_EPOCH_DAYS_FROM_CE)
            .and_then(NaiveDate::from_num_days_from_ce_opt)
            .ok_or(ConversionError::OutOfRange("NaiveDate"))
    }
}

impl From<NaiveTime> for CqlTime {
    fn from(value: NaiveTime) -> Self {
        Self(value.num_seconds_from_midnight() as i64 * 1_000_000_000 + value.nanosecond() as i64)
    }
}

impl TryFrom<CqlTime> for NaiveTime {
    type Error = ConversionError;
    fn try_from(value: CqlTime) -> Result<Self, Self::Error> {
        if !(0..CqlTime::MAX_NANOS).contains(&value.0) {
            return Err(ConversionError::OutOfRange("NaiveTime"));
        }
        NaiveTime::from_num_seconds_from_midnight_opt(
            (value.0 / 1_000_000_000) as u32,
            (value.0 % 1_000_000_000) as u32,
        )
        .ok_or(ConversionError::OutOfRange("NaiveTime"))
    }
}

impl<Tz: TimeZone> From<DateTime<Tz>> for CqlTimestamp {
    fn from(value: DateTime<Tz>) -> Self {
        Self(value.timestamp_millis())
    }
}

impl TryFrom<CqlTimestamp> for DateTime<Utc> {
    type Error = ConversionError;
    fn try_from(value: CqlTimestamp) -> Result<Self, Self::Error> {
        Utc.timestamp_millis_opt(value.0)
            .single()
            .ok_or(ConversionError::OutOfRange("DateTime<Utc>"))
    }
}

impl From<CqlTime> for Duration {
    fn from(value: CqlTime) -> Self {
        Duration::nanoseconds(value.0)
    }
}

macro_rules! from_cql_chrono {
    ($($tp:ty: $inner:ty),*) => {
        $(
        impl FromCqlValue for $tp {
            fn from_cql(value: Option<CqlValue>) -> Result<Self, ConversionError> {
                <$inner>::from_cql(value)?.try_into()
            }
        }
        )*
    };
}
from_cql_chrono!(NaiveDate: CqlDate, NaiveTime: CqlTime, DateTime<Utc>: CqlTimestamp);
