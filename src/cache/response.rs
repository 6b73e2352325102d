use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A raw API response plus the time the original request was made.
///
/// The on-disk form keeps `time` as a string of epoch millis:
/// `{"time":"1728478389141","response":"..."}`. A missing or non-numeric
/// `time` reads as 0 and a missing `response` as `None`; either fails
/// `is_valid`, so such entries act as cache misses instead of read errors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedResponse {
    #[serde(
        serialize_with = "millis_to_string",
        deserialize_with = "millis_lenient",
        default
    )]
    time: i64,
    #[serde(default)]
    response: Option<String>,
}

impl CachedResponse {
    pub fn new(time: i64, response: String) -> Self {
        Self {
            time,
            response: Some(response),
        }
    }

    /// Epoch millis of the original request.
    pub fn time(&self) -> i64 {
        self.time
    }

    /// The raw payload. Entries without one never pass `is_valid`.
    pub fn response(&self) -> &str {
        self.response.as_deref().unwrap_or_default()
    }

    /// An entry with a zero or unparseable timestamp, or no payload, is
    /// corrupt and must be refetched.
    pub fn is_valid(&self) -> bool {
        self.time > 0 && self.response.is_some()
    }
}

fn millis_to_string<S: Serializer>(time: &i64, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&time.to_string())
}

fn millis_lenient<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    // Accept both "1728478389141" and a bare number; anything else reads as
    // 0 so the entry is handled as corrupt rather than failing the read.
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::String(text) => text.trim().parse().unwrap_or(0),
        serde_json::Value::Number(number) => number.as_i64().unwrap_or(0),
        _ => 0,
    })
}
