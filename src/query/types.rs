//! Data carried through the extraction pipeline.

use crate::query::error::ExtractionError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Optional date bounds named by the LLM.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<String>,
}

/// Structured interpretation of a single query.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Extraction {
    pub entities: Vec<String>,
    pub parameter: Option<String>,
    #[serde(default)]
    pub dates: DateRange,
}

impl Extraction {
    /// 完了テキストをJSONとして解析
    pub fn from_content(content: &str) -> Result<Self, ExtractionError> {
        let value: Value =
            serde_json::from_str(content.trim()).map_err(ExtractionError::InvalidJson)?;
        Self::from_value(value)
    }

    /// Validate an already-parsed JSON document.
    ///
    /// `entities` must be an array of strings and `parameter` must be present
    /// (string or null). `dates` and its `start`/`end` members are optional;
    /// null counts as absent. Unknown keys are ignored.
    pub fn from_value(value: Value) -> Result<Self, ExtractionError> {
        let mut object = match value {
            Value::Object(object) => object,
            other => {
                return Err(ExtractionError::schema(format!(
                    "expected a JSON object, got {}",
                    type_name(&other)
                )))
            }
        };

        let entities = match object.remove("entities") {
            Some(Value::Array(items)) => items
                .into_iter()
                .enumerate()
                .map(|(i, item)| match item {
                    Value::String(s) => Ok(s),
                    other => Err(ExtractionError::schema(format!(
                        "entities[{}] must be a string, got {}",
                        i,
                        type_name(&other)
                    ))),
                })
                .collect::<Result<Vec<_>, _>>()?,
            Some(other) => {
                return Err(ExtractionError::schema(format!(
                    "'entities' must be an array, got {}",
                    type_name(&other)
                )))
            }
            None => return Err(ExtractionError::schema("missing required key 'entities'")),
        };

        let parameter = match object.remove("parameter") {
            Some(Value::String(s)) => Some(s),
            Some(Value::Null) => None,
            Some(other) => {
                return Err(ExtractionError::schema(format!(
                    "'parameter' must be a string, got {}",
                    type_name(&other)
                )))
            }
            None => return Err(ExtractionError::schema("missing required key 'parameter'")),
        };

        let dates = match object.remove("dates") {
            None | Some(Value::Null) => DateRange::default(),
            Some(Value::Object(mut dates)) => DateRange {
                start: optional_string(&mut dates, "start")?,
                end: optional_string(&mut dates, "end")?,
            },
            Some(other) => {
                return Err(ExtractionError::schema(format!(
                    "'dates' must be an object, got {}",
                    type_name(&other)
                )))
            }
        };

        Ok(Self {
            entities,
            parameter,
            dates,
        })
    }
}

fn optional_string(
    object: &mut Map<String, Value>,
    key: &str,
) -> Result<Option<String>, ExtractionError> {
    match object.remove(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(other) => Err(ExtractionError::schema(format!(
            "'dates.{}' must be a string, got {}",
            key,
            type_name(&other)
        ))),
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// エンティティ毎の結果（指標と期間）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricResult {
    pub entity: String,
    pub parameter: Option<String>,
    pub start_date: String,
    pub end_date: String,
}

/// A completed query and what it produced. Never mutated once stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interaction {
    pub query: String,
    pub results: Vec<MetricResult>,
}
