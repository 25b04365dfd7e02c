//! Kind checks and coercion of untyped JSON values against catalog fields.

use crate::schema::field::{FieldDescriptor, FieldKind};
use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use serde_json::{Number, Value};

/// Coarse compatibility check applied to update payloads.
///
/// Numbers satisfy any numeric kind, structured fields accept anything,
/// null is only accepted by nullable fields and datetimes need a parseable string.
pub fn accepts(field: &FieldDescriptor, value: &Value) -> bool {
    if field.kind.is_structured() {
        return true;
    }
    match (field.kind, value) {
        (_, Value::Null) => field.nullable,
        (FieldKind::String, Value::String(_)) => true,
        (FieldKind::Integer | FieldKind::Float, Value::Number(_)) => true,
        (FieldKind::Boolean, Value::Bool(_)) => true,
        (FieldKind::DateTime, Value::String(s)) => parse_datetime(s).is_some(),
        _ => false,
    }
}

/// Canonical storage form of an accepted value. Datetimes become RFC 3339 UTC,
/// numbers take the field's kind and integers round half to even like a
/// PostgreSQL `::bigint` cast.
pub fn normalize(field: &FieldDescriptor, value: Value) -> Value {
    match (field.kind, &value) {
        (FieldKind::DateTime, Value::String(s)) => match parse_datetime(s) {
            Some(dt) => Value::String(format_datetime(&dt)),
            None => value,
        },
        (FieldKind::Integer, Value::Number(n)) if n.as_i64().is_none() => {
            match n.as_f64().map(f64::round_ties_even) {
                Some(f) if f >= i64::MIN as f64 && f < i64::MAX as f64 => Value::Number((f as i64).into()),
                _ => value,
            }
        }
        (FieldKind::Float, Value::Number(n)) if !n.is_f64() => n
            .as_f64()
            .and_then(Number::from_f64)
            .map(Value::Number)
            .unwrap_or(value),
        _ => value,
    }
}

/// Coerce a client-supplied scalar to `kind`. `None` when it cannot be.
pub fn coerce(kind: FieldKind, value: &Value) -> Option<Value> {
    match kind {
        FieldKind::String => match value {
            Value::String(s) => Some(Value::String(s.clone())),
            Value::Number(n) => Some(Value::String(n.to_string())),
            Value::Bool(b) => Some(Value::String(b.to_string())),
            _ => None,
        },
        FieldKind::Integer => match value {
            Value::Number(_) => Some(value.clone()),
            Value::String(s) => parse_number(s.trim(), true),
            _ => None,
        },
        FieldKind::Float => match value {
            Value::Number(_) => Some(value.clone()),
            Value::String(s) => parse_number(s.trim(), false),
            _ => None,
        },
        FieldKind::Boolean => match value {
            Value::Bool(_) => Some(value.clone()),
            Value::String(s) => parse_bool(s).map(Value::Bool),
            Value::Number(n) => match n.as_i64() {
                Some(0) => Some(Value::Bool(false)),
                Some(1) => Some(Value::Bool(true)),
                _ => None,
            },
            _ => None,
        },
        FieldKind::DateTime => match value {
            Value::String(s) => parse_datetime(s).map(|dt| Value::String(format_datetime(&dt))),
            _ => None,
        },
        FieldKind::Object | FieldKind::Array | FieldKind::Map => None,
    }
}

fn parse_number(s: &str, prefer_int: bool) -> Option<Value> {
    if prefer_int {
        if let Ok(i) = s.parse::<i64>() {
            return Some(Value::Number(i.into()));
        }
    }
    let f = s.parse::<f64>().ok()?;
    Number::from_f64(f).map(Value::Number)
}

pub fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" | "t" | "y" => Some(true),
        "false" | "no" | "off" | "0" | "f" | "n" => Some(false),
        _ => None,
    }
}

/// RFC 3339 first, then the common date and date-time layouts (taken as UTC).
pub fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for layout in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, layout) {
            return Some(naive.and_utc());
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|naive| naive.and_utc());
    }
    DateTime::parse_from_rfc2822(s)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

pub fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}
