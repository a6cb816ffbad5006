//! # Declarative output shapes
//!
//! A [`Shape`] describes the structured object an agent expects back from a
//! model call: field names, their types, and numeric ranges. The same
//! description is rendered as a JSON Schema for the provider (so the model
//! is asked for exactly that object) and checked against whatever comes back,
//! independently of the transport that produced it.

use crate::error::{schema_violation, Error, Result};
use serde_json::{Map, Value};

/// The type of a single shape field
#[derive(Debug, Clone, PartialEq)]
pub enum FieldKind {
    /// A string; `non_empty` rejects blank values after trimming
    String { non_empty: bool },
    /// A finite number, optionally bounded (inclusive)
    Number { min: Option<f64>, max: Option<f64> },
}

/// One named field of a [`Shape`]
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: &'static str,
    pub description: &'static str,
    pub kind: FieldKind,
}

/// Expected structure of a model's answer
#[derive(Debug, Clone, PartialEq)]
pub struct Shape {
    name: &'static str,
    fields: Vec<Field>,
}

impl Shape {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            fields: Vec::new(),
        }
    }

    pub fn string(mut self, name: &'static str, description: &'static str) -> Self {
        self.fields.push(Field {
            name,
            description,
            kind: FieldKind::String { non_empty: false },
        });
        self
    }

    pub fn non_empty_string(mut self, name: &'static str, description: &'static str) -> Self {
        self.fields.push(Field {
            name,
            description,
            kind: FieldKind::String { non_empty: true },
        });
        self
    }

    pub fn number(
        mut self,
        name: &'static str,
        description: &'static str,
        min: Option<f64>,
        max: Option<f64>,
    ) -> Self {
        self.fields.push(Field {
            name,
            description,
            kind: FieldKind::Number { min, max },
        });
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Render as a JSON Schema object (all fields required, no extras)
    pub fn to_json_schema(&self) -> Value {
        let mut properties = Map::new();
        for field in &self.fields {
            let property = match &field.kind {
                FieldKind::String { non_empty } => {
                    let mut p = serde_json::json!({
                        "type": "string",
                        "description": field.description,
                    });
                    if *non_empty {
                        p["minLength"] = 1.into();
                    }
                    p
                }
                FieldKind::Number { min, max } => {
                    let mut p = serde_json::json!({
                        "type": "number",
                        "description": field.description,
                    });
                    if let Some(min) = min {
                        p["minimum"] = (*min).into();
                    }
                    if let Some(max) = max {
                        p["maximum"] = (*max).into();
                    }
                    p
                }
            };
            properties.insert(field.name.to_string(), property);
        }

        serde_json::json!({
            "type": "object",
            "properties": properties,
            "required": self.fields.iter().map(|f| f.name).collect::<Vec<_>>(),
            "additionalProperties": false,
        })
    }

    /// Check `value` against the shape.
    ///
    /// Returns the declared fields only; unknown keys are dropped.
    pub fn validate(&self, value: &Value) -> Result<Map<String, Value>> {
        let object = value.as_object().ok_or_else(|| {
            Error::new(
                crate::error::ErrorKind::SchemaViolation,
                format!("expected an object for '{}', got {}", self.name, type_name(value)),
            )
        })?;

        let mut validated = Map::new();
        for field in &self.fields {
            let found = object
                .get(field.name)
                .ok_or_else(|| schema_violation(field.name, format!("missing field '{}'", field.name)))?;
            check_field(field, found)?;
            validated.insert(field.name.to_string(), found.clone());
        }
        Ok(validated)
    }
}

fn check_field(field: &Field, value: &Value) -> Result<()> {
    match &field.kind {
        FieldKind::String { non_empty } => {
            let s = value.as_str().ok_or_else(|| {
                schema_violation(field.name, format!("expected string, got {}", type_name(value)))
            })?;
            if *non_empty && s.trim().is_empty() {
                return Err(schema_violation(field.name, "must not be empty"));
            }
        }
        FieldKind::Number { min, max } => {
            let n = value
                .as_f64()
                .filter(|n| n.is_finite())
                .ok_or_else(|| {
                    schema_violation(field.name, format!("expected number, got {}", type_name(value)))
                })?;
            if let Some(min) = min {
                if n < *min {
                    return Err(schema_violation(field.name, format!("value {} below minimum {}", n, min)));
                }
            }
            if let Some(max) = max {
                if n > *max {
                    return Err(schema_violation(field.name, format!("value {} exceeds maximum {}", n, max)));
                }
            }
        }
    }
    Ok(())
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
