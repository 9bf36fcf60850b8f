//! Field-level serde adapters for use with `#[serde(with = "...")]`.

/// `chrono::NaiveDate` as a `YYYY-MM-DD` string.
///
/// Unparsable input is a deserialization error.
///
/// ```
/// use chrono::NaiveDate;
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Serialize, Deserialize)]
/// struct Invoice {
///     #[serde(with = "jsonrest_http::converters::date_only")]
///     due: NaiveDate,
/// }
/// ```
pub mod date_only {
    use chrono::NaiveDate;
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub const FORMAT: &str = "%Y-%m-%d";

    pub fn serialize<S: Serializer>(date: &NaiveDate, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&date.format(FORMAT))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDate, D::Error> {
        let text = String::deserialize(deserializer)?;
        parse(&text).map_err(de::Error::custom)
    }

    pub(crate) fn parse(text: &str) -> Result<NaiveDate, String> {
        NaiveDate::parse_from_str(text, FORMAT)
            .map_err(|err| format!("invalid date '{text}', expected YYYY-MM-DD: {err}"))
    }
}

/// `Option<chrono::NaiveDate>` as a `YYYY-MM-DD` string or `null`.
pub mod date_only_option {
    use chrono::NaiveDate;
    use serde::{de, Deserialize, Deserializer, Serializer};

    use super::date_only;

    pub fn serialize<S: Serializer>(
        date: &Option<NaiveDate>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match date {
            Some(date) => date_only::serialize(date, serializer),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<NaiveDate>, D::Error> {
        Option::<String>::deserialize(deserializer)?
            .map(|text| date_only::parse(&text).map_err(de::Error::custom))
            .transpose()
    }
}

/// A value embedded as a JSON-encoded string inside the surrounding document.
///
/// `{"payload": "{\"a\":1}"}` maps to a field holding `{"a": 1}`. Wrap the
/// field type in `Option` to accept `null`; `None` is written as `null`.
pub mod stringified {
    use serde::{de, ser, de::DeserializeOwned, Deserialize, Deserializer, Serialize, Serializer};

    /// Writes `value` as JSON text, or a plain `null` when it encodes to null.
    pub fn serialize<T: Serialize, S: Serializer>(value: &T, serializer: S) -> Result<S::Ok, S::Error> {
        let encoded = serde_json::to_string(value).map_err(ser::Error::custom)?;
        if encoded == "null" {
            return serializer.serialize_none();
        }
        serializer.serialize_str(&encoded)
    }

    pub fn deserialize<'de, T: DeserializeOwned, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<T, D::Error> {
        match Option::<String>::deserialize(deserializer)? {
            Some(encoded) => serde_json::from_str(&encoded).map_err(de::Error::custom),
            None => serde_json::from_value(serde_json::Value::Null).map_err(de::Error::custom),
        }
    }
}
