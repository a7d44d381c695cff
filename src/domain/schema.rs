//! Record schemas as declared by the hosting pipeline.
//!
//! Schemas travel through configuration as JSON in the Avro-style record layout:
//!
//! ```text
//! {"type":"record","name":"output","fields":[
//!     {"name":"a","type":"string"},
//!     {"name":"b","type":["string","null"]},
//!     {"name":"ts","type":{"type":"long","logicalType":"timestamp-micros"}}
//! ]}
//! ```

use crate::utils::error::{Result, TransformError};
use serde_json::{json, Map, Value};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldType {
    Null,
    Boolean,
    Int,
    Long,
    Float,
    Double,
    Bytes,
    String,
    Enum,
    Array,
    Map,
    Record,
    Union,
}

impl FieldType {
    fn from_primitive(name: &str) -> Option<Self> {
        match name {
            "null" => Some(FieldType::Null),
            "boolean" => Some(FieldType::Boolean),
            "int" => Some(FieldType::Int),
            "long" => Some(FieldType::Long),
            "float" => Some(FieldType::Float),
            "double" => Some(FieldType::Double),
            "bytes" => Some(FieldType::Bytes),
            "string" => Some(FieldType::String),
            _ => None,
        }
    }

    fn from_complex(name: &str) -> Option<Self> {
        match name {
            "enum" => Some(FieldType::Enum),
            "array" => Some(FieldType::Array),
            "map" => Some(FieldType::Map),
            "record" => Some(FieldType::Record),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            FieldType::Null => "null",
            FieldType::Boolean => "boolean",
            FieldType::Int => "int",
            FieldType::Long => "long",
            FieldType::Float => "float",
            FieldType::Double => "double",
            FieldType::Bytes => "bytes",
            FieldType::String => "string",
            FieldType::Enum => "enum",
            FieldType::Array => "array",
            FieldType::Map => "map",
            FieldType::Record => "record",
            FieldType::Union => "union",
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Type of a single field, already unwrapped from its `"null"` union.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSchema {
    pub field_type: FieldType,
    pub nullable: bool,
    pub logical_type: Option<String>,
    /// Original JSON for complex types, kept so the schema can be written back.
    definition: Option<Value>,
}

impl FieldSchema {
    pub fn of(field_type: FieldType) -> Self {
        Self {
            field_type,
            nullable: field_type == FieldType::Null,
            logical_type: None,
            definition: None,
        }
    }

    pub fn nullable_of(field_type: FieldType) -> Self {
        Self {
            nullable: true,
            ..Self::of(field_type)
        }
    }

    pub fn logical(field_type: FieldType, logical_type: &str) -> Self {
        Self {
            logical_type: Some(logical_type.to_string()),
            ..Self::of(field_type)
        }
    }

    pub fn with_nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    /// True when the non-null part of the type is `field_type` with no logical type on top.
    pub fn is_plain(&self, field_type: FieldType) -> bool {
        self.field_type == field_type && self.logical_type.is_none()
    }

    pub fn display_name(&self) -> String {
        match &self.logical_type {
            Some(logical) => logical.clone(),
            None => self.field_type.name().to_string(),
        }
    }

    fn parse(value: &Value) -> Result<Self> {
        match value {
            Value::String(name) => FieldType::from_primitive(name)
                .map(Self::of)
                .ok_or_else(|| TransformError::schema(format!("Unknown type '{}'", name))),
            Value::Array(members) => {
                let nullable = members.iter().any(|m| m.as_str() == Some("null"));
                let non_null: Vec<&Value> =
                    members.iter().filter(|m| m.as_str() != Some("null")).collect();
                match non_null.as_slice() {
                    [] => Ok(Self::of(FieldType::Null)),
                    [single] => Ok(Self::parse(single)?.with_nullable(nullable)),
                    _ => Ok(Self {
                        field_type: FieldType::Union,
                        nullable,
                        logical_type: None,
                        definition: Some(value.clone()),
                    }),
                }
            }
            Value::Object(object) => {
                let type_name = object
                    .get("type")
                    .and_then(Value::as_str)
                    .ok_or_else(|| TransformError::schema("Type definition is missing 'type'"))?;
                if let Some(primitive) = FieldType::from_primitive(type_name) {
                    let logical_type = object
                        .get("logicalType")
                        .and_then(Value::as_str)
                        .map(str::to_string);
                    return Ok(Self {
                        logical_type,
                        ..Self::of(primitive)
                    });
                }
                let complex = FieldType::from_complex(type_name)
                    .ok_or_else(|| TransformError::schema(format!("Unknown type '{}'", type_name)))?;
                Ok(Self {
                    definition: Some(value.clone()),
                    ..Self::of(complex)
                })
            }
            other => Err(TransformError::schema(format!(
                "Unsupported type definition: {}",
                other
            ))),
        }
    }

    fn to_json(&self) -> Value {
        if self.field_type == FieldType::Union {
            if let Some(definition) = &self.definition {
                return definition.clone();
            }
        }
        let base = match (&self.definition, &self.logical_type) {
            (Some(definition), _) => definition.clone(),
            (None, Some(logical)) => json!({ "type": self.field_type.name(), "logicalType": logical }),
            (None, None) => Value::String(self.field_type.name().to_string()),
        };
        if self.nullable && self.field_type != FieldType::Null {
            json!([base, "null"])
        } else {
            base
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    pub schema: FieldSchema,
}

impl Field {
    pub fn of(name: impl Into<String>, schema: FieldSchema) -> Self {
        Self {
            name: name.into(),
            schema,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    name: String,
    fields: Vec<Field>,
}

impl Schema {
    /// Builds a record schema. Field names must be unique.
    pub fn record_of(name: impl Into<String>, fields: Vec<Field>) -> Result<Self> {
        let name = name.into();
        for (i, field) in fields.iter().enumerate() {
            if fields[..i].iter().any(|f| f.name == field.name) {
                return Err(TransformError::schema(format!(
                    "Field '{}' is declared more than once in record '{}'",
                    field.name, name
                )));
            }
        }
        Ok(Self { name, fields })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn parse_json(text: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(text)
            .map_err(|e| TransformError::schema(format!("Unable to parse schema: {}", e)))?;
        Self::from_value(&value)
    }

    pub fn from_value(value: &Value) -> Result<Self> {
        let object = value
            .as_object()
            .ok_or_else(|| TransformError::schema("Schema must be a JSON object"))?;
        if object.get("type").and_then(Value::as_str) != Some("record") {
            return Err(TransformError::schema("Schema type must be 'record'"));
        }
        let name = object
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or("record");
        let raw_fields = object
            .get("fields")
            .and_then(Value::as_array)
            .ok_or_else(|| TransformError::schema("Record schema must contain a 'fields' array"))?;

        let mut fields = Vec::with_capacity(raw_fields.len());
        for raw in raw_fields {
            let field_name = raw
                .get("name")
                .and_then(Value::as_str)
                .ok_or_else(|| TransformError::schema("Every field must have a 'name'"))?;
            let field_type = raw.get("type").ok_or_else(|| {
                TransformError::schema(format!("Field '{}' has no 'type'", field_name))
            })?;
            fields.push(Field::of(field_name, FieldSchema::parse(field_type)?));
        }
        Self::record_of(name, fields)
    }

    pub fn to_value(&self) -> Value {
        let fields: Vec<Value> = self
            .fields
            .iter()
            .map(|f| {
                let mut entry = Map::new();
                entry.insert("name".to_string(), Value::String(f.name.clone()));
                entry.insert("type".to_string(), f.schema.to_json());
                Value::Object(entry)
            })
            .collect();
        json!({ "type": "record", "name": self.name, "fields": fields })
    }

    pub fn to_json(&self) -> String {
        self.to_value().to_string()
    }
}

impl fmt::Display for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_json())
    }
}
