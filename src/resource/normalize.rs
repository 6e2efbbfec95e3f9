//! Value Normalization
//!
//! Converts the loosely typed values found in GCP API responses into the one
//! canonical string form stored in a [`Resource`](super::Resource)'s raw data.
//! Output rendering never inspects types; everything it sees went through here.

use chrono::{DateTime, SecondsFormat, TimeZone, Utc};
use serde_json::Value;

/// Canonical string form of a value for a report cell.
///
/// Normalizing a string that is already normalized returns it unchanged.
pub trait Normalize {
    fn normalize(&self) -> String;
}

impl Normalize for str {
    fn normalize(&self) -> String {
        self.to_string()
    }
}

impl Normalize for String {
    fn normalize(&self) -> String {
        self.clone()
    }
}

impl Normalize for bool {
    fn normalize(&self) -> String {
        let text = if *self { "true" } else { "false" };
        text.to_string()
    }
}

macro_rules! normalize_integers {
    ($($t:ty),*) => {
        $(
            impl Normalize for $t {
                fn normalize(&self) -> String {
                    self.to_string()
                }
            }
        )*
    };
}

normalize_integers!(i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize);

impl Normalize for f64 {
    fn normalize(&self) -> String {
        // Display for f64 never switches to exponent notation
        if self.is_finite() {
            self.to_string()
        } else {
            String::new()
        }
    }
}

impl Normalize for f32 {
    fn normalize(&self) -> String {
        f64::from(*self).normalize()
    }
}

impl<Tz: TimeZone> Normalize for DateTime<Tz> {
    fn normalize(&self) -> String {
        self.with_timezone(&Utc)
            .to_rfc3339_opts(SecondsFormat::Secs, true)
    }
}

impl<T: Normalize + ?Sized> Normalize for &T {
    fn normalize(&self) -> String {
        (**self).normalize()
    }
}

impl<T: Normalize> Normalize for Option<T> {
    fn normalize(&self) -> String {
        match self {
            Some(value) => value.normalize(),
            None => String::new(),
        }
    }
}

impl<T: Normalize> Normalize for [T] {
    fn normalize(&self) -> String {
        self.iter()
            .map(Normalize::normalize)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl<T: Normalize> Normalize for Vec<T> {
    fn normalize(&self) -> String {
        self.as_slice().normalize()
    }
}

impl Normalize for Value {
    fn normalize(&self) -> String {
        match self {
            Value::Null => String::new(),
            Value::Bool(b) => b.normalize(),
            Value::Number(n) => normalize_number(n),
            Value::String(s) => s.clone(),
            Value::Array(items) if items.iter().all(is_scalar) => items.normalize(),
            Value::Array(_) | Value::Object(_) => pretty_json(self),
        }
    }
}

/// A list of key/value pairs rendered as `Key=Value` lines.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyValues(pub Vec<(String, String)>);

impl KeyValues {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entry, normalizing its value.
    pub fn push(&mut self, key: impl Into<String>, value: impl Normalize) {
        self.0.push((key.into(), value.normalize()));
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Normalize> FromIterator<(K, V)> for KeyValues {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.normalize()))
                .collect(),
        )
    }
}

impl Normalize for KeyValues {
    fn normalize(&self) -> String {
        self.0
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Normalize an RFC 3339 timestamp as returned by GCP APIs.
///
/// Text that does not parse is returned as-is, which also keeps this
/// idempotent on its own output.
pub fn timestamp(raw: &str) -> String {
    match DateTime::parse_from_rfc3339(raw) {
        Ok(parsed) => parsed.normalize(),
        Err(_) => raw.to_string(),
    }
}

/// Normalize an optional JSON field holding an RFC 3339 timestamp.
pub fn timestamp_value(value: Option<&Value>) -> String {
    value
        .and_then(Value::as_str)
        .map(timestamp)
        .unwrap_or_default()
}

/// Render a JSON object of scalars (labels, metadata) as sorted `Key=Value` lines.
pub fn labels(value: Option<&Value>) -> String {
    let Some(map) = value.and_then(Value::as_object) else {
        return String::new();
    };

    let mut entries: Vec<(&String, &Value)> = map.iter().collect();
    entries.sort_by(|a, b| a.0.cmp(b.0));
    entries
        .into_iter()
        .map(|(k, v)| (k.as_str(), v.normalize()))
        .collect::<KeyValues>()
        .normalize()
}

/// Extract short name from GCP resource URL
/// e.g., "https://www.googleapis.com/compute/v1/projects/my-project/zones/us-central1-a" -> "us-central1-a"
pub fn short_name(url: &str) -> String {
    url.rsplit('/').next().unwrap_or(url).to_string()
}

fn normalize_number(n: &serde_json::Number) -> String {
    if let Some(i) = n.as_i64() {
        i.normalize()
    } else if let Some(u) = n.as_u64() {
        u.normalize()
    } else {
        n.as_f64().normalize()
    }
}

fn is_scalar(value: &Value) -> bool {
    !matches!(value, Value::Array(_) | Value::Object(_))
}

fn pretty_json(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}
