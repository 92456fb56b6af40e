/// Integer identifiers used by the backend (filters, rows, subject services).
pub type DbId = i64;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Identifier of bundles and vouchers (GUIDs on the backend).
pub type Guid = uuid::Uuid;

/// Parse a backend date or timestamp.
///
/// Accepts RFC 3339, `YYYY-MM-DD HH:MM:SS` (or with a `T`), with or
/// without fractional seconds, and bare `YYYY-MM-DD` dates (midnight
/// UTC). Values without an offset are taken as UTC.
pub fn parse_timestamp(raw: &str) -> Option<Timestamp> {
    use chrono::{NaiveDate, NaiveDateTime, TimeZone, Utc};

    let raw = raw.trim();
    if let Ok(ts) = chrono::DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
}

/// `deserialize_with` helper for optional backend timestamps.
///
/// `null`, a missing key and an empty string read as `None`; any other
/// value must parse with [`parse_timestamp`].
pub mod lenient_timestamp {
    use serde::de::Error;
    use serde::{Deserialize, Deserializer};

    use super::{parse_timestamp, Timestamp};

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Timestamp>, D::Error> {
        let Some(raw) = Option::<String>::deserialize(deserializer)? else {
            return Ok(None);
        };
        if raw.trim().is_empty() {
            return Ok(None);
        }
        parse_timestamp(&raw)
            .map(Some)
            .ok_or_else(|| D::Error::custom(format!("invalid date or timestamp '{raw}'")))
    }
}
