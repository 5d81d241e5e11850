//! Input schemas for tool calls.
//!
//! Tools describe their arguments as a flat list of fields. The schema converts
//! to and from the JSON-Schema objects used by MCP servers and by Gemini
//! function declarations, and validates call arguments before invocation.

use super::types::{ToolArguments, ToolError};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    String,
    Integer,
    Number,
    Boolean,
    Array,
    Object,
}

impl FieldKind {
    /// Map a JSON-Schema `type` keyword. Unknown types fall back to string.
    pub fn from_json_type(json_type: &str) -> Self {
        match json_type {
            "integer" => Self::Integer,
            "number" => Self::Number,
            "boolean" => Self::Boolean,
            "array" => Self::Array,
            "object" => Self::Object,
            _ => Self::String,
        }
    }

    pub fn as_json_type(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Array => "array",
            Self::Object => "object",
        }
    }

    fn accepts(self, value: &Value) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Integer => value.is_i64() || value.is_u64(),
            Self::Number => value.is_number(),
            Self::Boolean => value.is_boolean(),
            Self::Array => value.is_array(),
            Self::Object => value.is_object(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    pub kind: FieldKind,
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl FieldSpec {
    pub fn required(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
            required: true,
            description: None,
        }
    }

    pub fn optional(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
            required: false,
            description: None,
        }
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputSchema {
    pub fields: Vec<FieldSpec>,
}

impl InputSchema {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn field(mut self, field: FieldSpec) -> Self {
        self.fields.push(field);
        self
    }

    pub fn get(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|field| field.name == name)
    }

    /// Build from a JSON-Schema object (`properties` + `required`).
    pub fn from_json_schema(schema: &Value) -> Self {
        let required: Vec<&str> = schema
            .get("required")
            .and_then(Value::as_array)
            .map(|names| names.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default();

        let Some(properties) = schema.get("properties").and_then(Value::as_object) else {
            return Self::empty();
        };

        let fields = properties
            .iter()
            .map(|(name, definition)| FieldSpec {
                name: name.clone(),
                kind: FieldKind::from_json_type(
                    definition
                        .get("type")
                        .and_then(Value::as_str)
                        .unwrap_or("string"),
                ),
                required: required.contains(&name.as_str()),
                description: definition
                    .get("description")
                    .and_then(Value::as_str)
                    .map(ToString::to_string),
            })
            .collect();

        Self { fields }
    }

    pub fn to_json_schema(&self) -> Value {
        let mut properties = Map::new();
        for field in &self.fields {
            let mut definition = Map::new();
            definition.insert("type".into(), json!(field.kind.as_json_type()));
            if let Some(description) = &field.description {
                definition.insert("description".into(), json!(description));
            }
            properties.insert(field.name.clone(), Value::Object(definition));
        }

        let required: Vec<&str> = self
            .fields
            .iter()
            .filter(|field| field.required)
            .map(|field| field.name.as_str())
            .collect();

        json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }

    /// Check required fields are present and every known field has the right type.
    /// Unknown fields are tolerated; `null` counts as absent.
    pub fn validate(&self, arguments: &ToolArguments) -> Result<(), ToolError> {
        for field in &self.fields {
            match arguments.get(&field.name) {
                None | Some(Value::Null) if field.required => {
                    return Err(ToolError::invalid_arguments(format!(
                        "missing required field '{}'",
                        field.name
                    )));
                }
                None | Some(Value::Null) => {}
                Some(value) if !field.kind.accepts(value) => {
                    return Err(ToolError::invalid_arguments(format!(
                        "field '{}' must be of type {}",
                        field.name,
                        field.kind.as_json_type()
                    )));
                }
                Some(_) => {}
            }
        }
        Ok(())
    }
}
