use anyhow::{Context, Result};
use chrono::{DateTime, Utc};

use crate::dispatch::FunctionType;
use crate::gesture::GestureType;

pub fn parse_datetime(value: &str, field: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .with_context(|| format!("failed to parse {field}"))
}

pub fn parse_gesture(value: &str) -> Result<GestureType> {
    value
        .parse()
        .with_context(|| format!("gesture_mappings.gesture holds '{value}'"))
}

pub fn parse_function(value: &str) -> Result<FunctionType> {
    value
        .parse()
        .with_context(|| format!("gesture_mappings.function holds '{value}'"))
}
