//! Argument parameter schemas and validation.
//!
//! Declarations carry the object-shaped subset of JSON Schema the chat
//! tool protocol actually uses: typed properties, required fields, enum
//! restrictions, and an additional-properties switch. Validation runs
//! locally before a call ever reaches a backend.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::collections::BTreeMap;
use thiserror::Error;

/// Schema for a tool's argument object.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParameterSchema {
    #[serde(default)]
    pub properties: BTreeMap<String, PropertySchema>,

    #[serde(default)]
    pub required: Vec<String>,

    /// Whether fields outside `properties` are tolerated.
    #[serde(default, alias = "additionalProperties")]
    pub additional_properties: bool,
}

/// Schema for one property of the argument object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PropertySchema {
    #[serde(rename = "type")]
    pub kind: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, rename = "enum", skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<String>>,
}

/// A schema violation, phrased so the model can correct itself.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Violation {
    #[error("arguments must be a JSON object, got {0}")]
    NotAnObject(&'static str),

    #[error("missing required field '{0}'")]
    MissingRequired(String),

    #[error("unexpected field '{0}'")]
    UnexpectedField(String),

    #[error("field '{field}' must be of type {expected}, got {got}")]
    WrongType {
        field: String,
        expected: String,
        got: &'static str,
    },

    #[error("field '{field}' must be one of {allowed:?}, got '{got}'")]
    NotInEnum {
        field: String,
        allowed: Vec<String>,
        got: String,
    },
}

impl ParameterSchema {
    /// Validate an argument payload against this schema.
    pub fn validate(&self, arguments: &Value) -> Result<(), Violation> {
        let Some(object) = arguments.as_object() else {
            return Err(Violation::NotAnObject(type_name(arguments)));
        };

        for field in &self.required {
            if !object.contains_key(field) {
                return Err(Violation::MissingRequired(field.clone()));
            }
        }

        for (field, value) in object {
            let Some(property) = self.properties.get(field) else {
                if self.additional_properties {
                    continue;
                }
                return Err(Violation::UnexpectedField(field.clone()));
            };
            property.validate(field, value)?;
        }

        Ok(())
    }

    /// Render as the JSON Schema object advertised to the model.
    pub fn to_value(&self) -> Value {
        let properties: Map<String, Value> = self
            .properties
            .iter()
            .map(|(name, property)| (name.clone(), property.to_value()))
            .collect();

        json!({
            "type": "object",
            "properties": properties,
            "required": self.required,
            "additionalProperties": self.additional_properties,
        })
    }
}

impl PropertySchema {
    fn validate(&self, field: &str, value: &Value) -> Result<(), Violation> {
        let matches = match self.kind.as_str() {
            "string" => value.is_string(),
            "number" => value.is_number(),
            "integer" => value.is_i64() || value.is_u64(),
            "boolean" => value.is_boolean(),
            "array" => value.is_array(),
            "object" => value.is_object(),
            // Unknown kinds are not enforced.
            _ => true,
        };
        if !matches {
            return Err(Violation::WrongType {
                field: field.to_string(),
                expected: self.kind.clone(),
                got: type_name(value),
            });
        }

        if let (Some(allowed), Some(s)) = (&self.enum_values, value.as_str()) {
            if !allowed.iter().any(|a| a == s) {
                return Err(Violation::NotInEnum {
                    field: field.to_string(),
                    allowed: allowed.clone(),
                    got: s.to_string(),
                });
            }
        }

        Ok(())
    }

    fn to_value(&self) -> Value {
        let mut object = Map::new();
        object.insert("type".to_string(), Value::String(self.kind.clone()));
        if let Some(description) = &self.description {
            object.insert("description".to_string(), Value::String(description.clone()));
        }
        if let Some(allowed) = &self.enum_values {
            object.insert(
                "enum".to_string(),
                Value::Array(allowed.iter().cloned().map(Value::String).collect()),
            );
        }
        Value::Object(object)
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ping_schema() -> ParameterSchema {
        let mut properties = BTreeMap::new();
        properties.insert(
            "message".to_string(),
            PropertySchema {
                kind: "string".to_string(),
                description: Some("The message to send".to_string()),
                enum_values: Some(vec!["ping".to_string()]),
            },
        );
        ParameterSchema {
            properties,
            required: vec!["message".to_string()],
            additional_properties: false,
        }
    }

    #[test]
    fn accepts_conforming_arguments() {
        let schema = ping_schema();
        assert!(schema.validate(&json!({"message": "ping"})).is_ok());
    }

    #[test]
    fn rejects_missing_required_field() {
        let schema = ping_schema();
        assert_eq!(
            schema.validate(&json!({})),
            Err(Violation::MissingRequired("message".to_string()))
        );
    }

    #[test]
    fn rejects_wrong_type() {
        let schema = ping_schema();
        let err = schema.validate(&json!({"message": 7})).unwrap_err();
        assert!(matches!(err, Violation::WrongType { .. }));
    }

    #[test]
    fn rejects_value_outside_enum() {
        let schema = ping_schema();
        let err = schema.validate(&json!({"message": "pong"})).unwrap_err();
        assert!(matches!(err, Violation::NotInEnum { .. }));
    }

    #[test]
    fn rejects_unexpected_field_when_closed() {
        let schema = ping_schema();
        let err = schema
            .validate(&json!({"message": "ping", "extra": 1}))
            .unwrap_err();
        assert_eq!(err, Violation::UnexpectedField("extra".to_string()));
    }

    #[test]
    fn rejects_non_object_payload() {
        let schema = ping_schema();
        let err = schema.validate(&json!("ping")).unwrap_err();
        assert_eq!(err, Violation::NotAnObject("string"));
    }

    #[test]
    fn renders_json_schema() {
        let value = ping_schema().to_value();
        assert_eq!(value["type"], "object");
        assert_eq!(value["required"][0], "message");
        assert_eq!(value["properties"]["message"]["enum"][0], "ping");
        assert_eq!(value["additionalProperties"], false);
    }
}
