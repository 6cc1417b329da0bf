use std::collections::{BTreeMap, HashMap};

use serde_json::Value;

/// A custom field value as Jira hands it back.
///
/// Jira's JSON gives no stable type for a custom field: the same numeric
/// field can arrive as `1`, `1.0` or `"1"` depending on the field type and
/// the endpoint. Anything that is not one of the shapes below decodes as
/// `Missing`.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum FieldValue {
    #[default]
    Missing,
    Str(String),
    Num(f64),
    StrList(Vec<String>),
}

impl FieldValue {
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::String(s) => FieldValue::Str(s.clone()),
            Value::Number(n) => n.as_f64().map_or(FieldValue::Missing, FieldValue::Num),
            Value::Array(items) => items
                .iter()
                .map(|v| v.as_str().map(String::from))
                .collect::<Option<Vec<_>>>()
                .map_or(FieldValue::Missing, FieldValue::StrList),
            _ => FieldValue::Missing,
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            FieldValue::Missing => Value::Null,
            FieldValue::Str(s) => Value::String(s.clone()),
            FieldValue::Num(n) => {
                if n.fract() == 0.0 && n.abs() < i64::MAX as f64 {
                    Value::from(*n as i64)
                } else {
                    Value::from(*n)
                }
            }
            FieldValue::StrList(items) => Value::from(items.clone()),
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, FieldValue::Missing)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_str_list(&self) -> Option<&[String]> {
        match self {
            FieldValue::StrList(items) => Some(items),
            _ => None,
        }
    }

    /// Integer view of a numeric or numeric-string value. Fractional and
    /// out-of-range numbers have no integer view.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            FieldValue::Num(n) => f64_to_i64(*n),
            FieldValue::Str(s) => {
                let s = s.trim();
                s.parse::<i64>()
                    .ok()
                    .or_else(|| s.parse::<f64>().ok().and_then(f64_to_i64))
            }
            _ => None,
        }
    }
}

fn f64_to_i64(n: f64) -> Option<i64> {
    if n.is_finite() && n.fract() == 0.0 && n >= i64::MIN as f64 && n < i64::MAX as f64 {
        Some(n as i64)
    } else {
        None
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::Str(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::Str(s)
    }
}

impl From<i64> for FieldValue {
    fn from(n: i64) -> Self {
        FieldValue::Num(n as f64)
    }
}

impl From<Vec<String>> for FieldValue {
    fn from(items: Vec<String>) -> Self {
        FieldValue::StrList(items)
    }
}

static MISSING: FieldValue = FieldValue::Missing;

/// A Jira issue mirrored from GitHub.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TargetIssue {
    pub id: String,
    pub key: String,
    pub summary: String,
    pub description: String,
    pub issue_type: Option<String>,
    /// Custom fields keyed by `customfield_<N>`.
    pub custom: HashMap<String, FieldValue>,
    pub comments: Vec<TargetComment>,
}

impl TargetIssue {
    pub fn field(&self, key: &str) -> &FieldValue {
        self.custom.get(key).unwrap_or(&MISSING)
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct TargetComment {
    pub id: String,
    pub body: String,
}

/// Full set of fields written on create or update. Updates always
/// overwrite every tracked field.
#[derive(Debug, Clone, PartialEq)]
pub struct IssueFields {
    pub summary: String,
    pub description: String,
    pub issue_type: String,
    pub custom: BTreeMap<String, FieldValue>,
}
