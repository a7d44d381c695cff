use crate::domain::schema::{FieldType, Schema};
use crate::utils::error::{Result, TransformError};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;

/// A structured record: values keyed by field name, typed by its schema.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    schema: Arc<Schema>,
    data: HashMap<String, Value>,
}

impl Record {
    pub fn builder(schema: Arc<Schema>) -> RecordBuilder {
        RecordBuilder {
            schema,
            data: HashMap::new(),
        }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Value of a field, `None` when the field is unset or null.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.data.get(name).filter(|v| !v.is_null())
    }

    /// Builds a record from a JSON object. Keys that are not in the schema are ignored.
    pub fn from_json(schema: Arc<Schema>, value: &Value) -> Result<Self> {
        let object = value
            .as_object()
            .ok_or_else(|| TransformError::record("Record must be a JSON object"))?;

        let mut builder = Record::builder(Arc::clone(&schema));
        for field in schema.fields() {
            if let Some(v) = object.get(&field.name) {
                builder.set(&field.name, v.clone())?;
            }
        }
        for key in object.keys().filter(|k| schema.field(k).is_none()) {
            tracing::debug!("Ignoring key '{}' not declared in schema '{}'", key, schema.name());
        }
        builder.build()
    }

    /// Every schema field in declaration order, unset fields as `null`.
    pub fn to_json(&self) -> Value {
        let mut object = Map::new();
        for field in self.schema.fields() {
            let value = self.data.get(&field.name).cloned().unwrap_or(Value::Null);
            object.insert(field.name.clone(), value);
        }
        Value::Object(object)
    }
}

#[derive(Debug, Clone)]
pub struct RecordBuilder {
    schema: Arc<Schema>,
    data: HashMap<String, Value>,
}

impl RecordBuilder {
    pub fn set(&mut self, name: &str, value: Value) -> Result<&mut Self> {
        let field = self.schema.field(name).ok_or_else(|| {
            TransformError::record(format!(
                "Field '{}' is not present in schema '{}'",
                name,
                self.schema.name()
            ))
        })?;
        if value.is_null() && !field.schema.nullable {
            return Err(TransformError::record(format!(
                "Field '{}' is not nullable",
                name
            )));
        }
        self.data.insert(name.to_string(), value);
        Ok(self)
    }

    /// Sets a field from its string form, converting to the field's primitive type.
    pub fn convert_and_set(&mut self, name: &str, text: &str) -> Result<&mut Self> {
        let field_type = self
            .schema
            .field(name)
            .map(|f| f.schema.field_type)
            .ok_or_else(|| {
                TransformError::record(format!(
                    "Field '{}' is not present in schema '{}'",
                    name,
                    self.schema.name()
                ))
            })?;

        let converted = match field_type {
            FieldType::String => Value::String(text.to_string()),
            FieldType::Int | FieldType::Long => text
                .parse::<i64>()
                .map(Value::from)
                .map_err(|e| convert_error(name, text, field_type, e))?,
            FieldType::Float | FieldType::Double => text
                .parse::<f64>()
                .map(Value::from)
                .map_err(|e| convert_error(name, text, field_type, e))?,
            FieldType::Boolean => text
                .parse::<bool>()
                .map(Value::from)
                .map_err(|e| convert_error(name, text, field_type, e))?,
            other => {
                return Err(TransformError::record(format!(
                    "Field '{}' of type '{}' cannot be set from a string",
                    name, other
                )))
            }
        };
        self.set(name, converted)
    }

    /// Fails when a non-nullable field was never given a value.
    pub fn build(self) -> Result<Record> {
        for field in self.schema.fields() {
            let missing = self.data.get(&field.name).map_or(true, Value::is_null);
            if missing && !field.schema.nullable {
                return Err(TransformError::record(format!(
                    "Field '{}' is not nullable but no value was provided",
                    field.name
                )));
            }
        }
        Ok(Record {
            schema: self.schema,
            data: self.data,
        })
    }
}

fn convert_error(name: &str, text: &str, field_type: FieldType, e: impl std::fmt::Display) -> TransformError {
    TransformError::record(format!(
        "Cannot convert '{}' to {} for field '{}': {}",
        text, field_type, name, e
    ))
}

/// A record that could not be processed, as sent to the error channel.
#[derive(Debug, Clone, PartialEq)]
pub struct InvalidEntry {
    pub error_code: i32,
    pub error_message: String,
    pub invalid_record: Record,
}

impl InvalidEntry {
    pub fn new(error_code: i32, error_message: impl Into<String>, invalid_record: Record) -> Self {
        Self {
            error_code,
            error_message: error_message.into(),
            invalid_record,
        }
    }

    pub fn to_json(&self) -> Value {
        serde_json::json!({
            "errorCode": self.error_code,
            "errorMessage": self.error_message,
            "invalidRecord": self.invalid_record.to_json(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::schema::{Field, FieldSchema};
    use serde_json::json;

    fn schema() -> Arc<Schema> {
        Arc::new(
            Schema::record_of(
                "test",
                vec![
                    Field::of("name", FieldSchema::of(FieldType::String)),
                    Field::of("count", FieldSchema::nullable_of(FieldType::Long)),
                ],
            )
            .unwrap(),
        )
    }

    #[test]
    fn test_builder_enforces_schema() {
        let mut builder = Record::builder(schema());
        assert!(builder.set("unknown", json!(1)).is_err());
        assert!(builder.set("name", Value::Null).is_err());
        builder.set("count", Value::Null).unwrap();
        assert!(builder.clone().build().is_err());

        builder.set("name", json!("x")).unwrap();
        let record = builder.build().unwrap();
        assert_eq!(record.get("name"), Some(&json!("x")));
        assert_eq!(record.get("count"), None);
    }

    #[test]
    fn test_convert_and_set() {
        let mut builder = Record::builder(schema());
        builder.convert_and_set("name", "2024-07-04").unwrap();
        builder.convert_and_set("count", "42").unwrap();
        assert!(builder.convert_and_set("count", "2024-07-04").is_err());

        let record = builder.build().unwrap();
        assert_eq!(record.get("count"), Some(&json!(42)));
    }

    #[test]
    fn test_json_conversion() {
        let record = Record::from_json(schema(), &json!({"name": "a", "extra": true})).unwrap();
        assert_eq!(record.to_json(), json!({"name": "a", "count": null}));

        assert!(Record::from_json(schema(), &json!({"count": 1})).is_err());
        assert!(Record::from_json(schema(), &json!(["name"])).is_err());
    }
}
