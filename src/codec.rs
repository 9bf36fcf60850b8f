use serde::{de::DeserializeOwned, Serialize};
use serde_json::{Map, Value as JsonValue};

use crate::{ClientOptions, NullHandling, PropertyNaming, RestError, Result};

/// JSON (de)serialization with configurable null handling and member naming.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct JsonCodec {
    null_handling: NullHandling,
    property_naming: PropertyNaming,
}

impl JsonCodec {
    pub fn new(null_handling: NullHandling, property_naming: PropertyNaming) -> Self {
        Self {
            null_handling,
            property_naming,
        }
    }

    pub fn from_options(options: &ClientOptions) -> Self {
        Self::new(options.null_handling, options.property_naming)
    }

    /// Serializes `value` to a JSON string, applying the codec settings.
    pub fn serialize<T: Serialize + ?Sized>(&self, value: &T) -> Result<String> {
        let shaped = self.to_shaped_value(value)?;
        serde_json::to_string(&shaped).map_err(RestError::Serialize)
    }

    /// Deserializes a response body. An empty body is read as `null`.
    pub fn deserialize<T: DeserializeOwned>(&self, body: &str) -> Result<T> {
        let input = if body.trim().is_empty() { "null" } else { body };
        serde_json::from_str(input).map_err(|source| RestError::Deserialize {
            source,
            body: body.to_owned(),
        })
    }

    /// Flattens `value` into string pairs for use as query parameters.
    ///
    /// The value must serialize to an object whose members are scalars.
    pub fn to_flat_string_map<T: Serialize + ?Sized>(
        &self,
        value: &T,
    ) -> Result<Vec<(String, String)>> {
        let object = match self.to_shaped_value(value)? {
            JsonValue::Object(object) => object,
            JsonValue::Null => return Ok(Vec::new()),
            other => {
                return Err(RestError::invalid(format!(
                    "query object must serialize to a JSON object, got {}",
                    json_kind(&other)
                )))
            }
        };

        let mut pairs = Vec::with_capacity(object.len());
        for (key, value) in object {
            let rendered = match value {
                JsonValue::String(text) => text,
                JsonValue::Number(number) => number.to_string(),
                JsonValue::Bool(flag) => flag.to_string(),
                JsonValue::Null => String::new(),
                other => {
                    return Err(RestError::invalid(format!(
                        "query member '{key}' must be a scalar, got {}",
                        json_kind(&other)
                    )))
                }
            };
            pairs.push((key, rendered));
        }
        Ok(pairs)
    }

    /// Form-encodes `value` as a query string without the leading `?`.
    pub fn to_query_string<T: Serialize + ?Sized>(&self, value: &T) -> Result<String> {
        let pairs = self.to_flat_string_map(value)?;
        Ok(url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(pairs)
            .finish())
    }

    fn to_shaped_value<T: Serialize + ?Sized>(&self, value: &T) -> Result<JsonValue> {
        let mut value = serde_json::to_value(value).map_err(RestError::Serialize)?;
        if self.null_handling == NullHandling::Omit {
            strip_nulls(&mut value);
        }
        if self.property_naming == PropertyNaming::CamelCase {
            value = camel_case_keys(value);
        }
        Ok(value)
    }
}

fn strip_nulls(value: &mut JsonValue) {
    match value {
        JsonValue::Object(object) => {
            object.retain(|_, member| !member.is_null());
            object.values_mut().for_each(strip_nulls);
        }
        JsonValue::Array(items) => items.iter_mut().for_each(strip_nulls),
        _ => {}
    }
}

fn camel_case_keys(value: JsonValue) -> JsonValue {
    match value {
        JsonValue::Object(object) => JsonValue::Object(
            object
                .into_iter()
                .map(|(key, member)| (to_camel_case(&key), camel_case_keys(member)))
                .collect::<Map<_, _>>(),
        ),
        JsonValue::Array(items) => {
            JsonValue::Array(items.into_iter().map(camel_case_keys).collect())
        }
        other => other,
    }
}

/// Lowercases the leading uppercase run of `name`, keeping the last capital
/// of an acronym that starts the next word (`"URLValue"` → `"urlValue"`).
pub(crate) fn to_camel_case(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let run = chars.iter().take_while(|c| c.is_uppercase()).count();
    if run == 0 {
        return name.to_owned();
    }
    let keep_last = run > 1 && chars.get(run).is_some_and(|c| c.is_lowercase());
    let lower_until = if keep_last { run - 1 } else { run };

    chars
        .iter()
        .enumerate()
        .flat_map(|(index, c)| {
            let lowered: Vec<char> = if index < lower_until {
                c.to_lowercase().collect()
            } else {
                vec![*c]
            };
            lowered
        })
        .collect()
}

fn json_kind(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "boolean",
        JsonValue::Number(_) => "number",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "array",
        JsonValue::Object(_) => "object",
    }
}
