//! Per-record date conversion.
//!
//! A [`DateConverter`] is built once from a validated configuration and is then
//! applied to every record. It holds no mutable state and can be shared across threads.

use crate::config::{TimeUnit, PROPERTY_SOURCE_FORMAT};
use crate::core::pattern::DatePattern;
use crate::domain::model::{InvalidEntry, Record, RecordBuilder};
use crate::domain::ports::Emitter;
use crate::domain::schema::{FieldType, Schema};
use crate::utils::error::{Result, TransformError};
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;

/// Error code attached to records routed to the error channel.
pub const INVALID_ENTRY_CODE: i32 = 31;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldMapping {
    pub source: String,
    pub target: String,
}

/// What happened to one source/target pair of a record.
#[derive(Debug, Clone, PartialEq)]
pub enum MappingOutcome {
    /// The target was set, possibly to null.
    Written,
    /// The source field is not declared by the record's schema.
    Skipped,
    /// The whole record belongs on the error channel.
    Rejected(InvalidEntry),
}

#[derive(Debug, Clone, PartialEq)]
pub enum RecordOutcome {
    Emitted(Record),
    Rejected(InvalidEntry),
}

#[derive(Debug, Clone, Copy)]
enum SourceKind {
    Epoch,
    Text,
}

#[derive(Debug)]
pub struct DateConverter {
    source_pattern: Option<DatePattern>,
    target_pattern: DatePattern,
    time_unit: TimeUnit,
    mappings: Vec<FieldMapping>,
    targets: HashSet<String>,
    output_schema: Arc<Schema>,
}

impl DateConverter {
    pub fn new(
        source_pattern: Option<DatePattern>,
        target_pattern: DatePattern,
        time_unit: TimeUnit,
        mappings: Vec<FieldMapping>,
        output_schema: Arc<Schema>,
    ) -> Result<Self> {
        for mapping in &mappings {
            if output_schema.field(&mapping.target).is_none() {
                return Err(TransformError::ConfigError {
                    message: format!(
                        "Target field '{}' is not present in output schema.",
                        mapping.target
                    ),
                });
            }
        }
        let targets = mappings.iter().map(|m| m.target.clone()).collect();
        Ok(Self {
            source_pattern,
            target_pattern,
            time_unit,
            mappings,
            targets,
            output_schema,
        })
    }

    pub fn mappings(&self) -> &[FieldMapping] {
        &self.mappings
    }

    /// Runs the conversion and forwards the result to the matching channel.
    pub fn transform<E: Emitter>(&self, input: &Record, emitter: &mut E) -> Result<()> {
        match self.convert(input)? {
            RecordOutcome::Emitted(record) => emitter.emit(record),
            RecordOutcome::Rejected(entry) => emitter.emit_error(entry),
        }
    }

    /// Converts one record.
    ///
    /// `Err` means the record could not be processed at all: a source field of an
    /// unsupported type, or a value that does not match the configured patterns.
    pub fn convert(&self, input: &Record) -> Result<RecordOutcome> {
        let mut builder = Record::builder(Arc::clone(&self.output_schema));

        for field in self.output_schema.fields() {
            if self.targets.contains(&field.name) {
                continue;
            }
            if let Some(value) = input.get(&field.name) {
                builder.set(&field.name, value.clone())?;
            }
        }

        for mapping in &self.mappings {
            match self.apply_mapping(input, mapping, &mut builder)? {
                MappingOutcome::Written | MappingOutcome::Skipped => {}
                MappingOutcome::Rejected(entry) => return Ok(RecordOutcome::Rejected(entry)),
            }
        }

        Ok(RecordOutcome::Emitted(builder.build()?))
    }

    fn apply_mapping(
        &self,
        input: &Record,
        mapping: &FieldMapping,
        builder: &mut RecordBuilder,
    ) -> Result<MappingOutcome> {
        let Some(source_field) = input.schema().field(&mapping.source) else {
            tracing::debug!(
                "Source field '{}' is not in the input schema, skipping '{}'",
                mapping.source,
                mapping.target
            );
            return Ok(MappingOutcome::Skipped);
        };

        let schema = &source_field.schema;
        let kind = if schema.is_plain(FieldType::Long) {
            SourceKind::Epoch
        } else if schema.is_plain(FieldType::String) {
            SourceKind::Text
        } else {
            return Err(TransformError::UnsupportedSourceType {
                field: mapping.source.clone(),
                found: schema.display_name(),
            });
        };

        let raw = input.get(&mapping.source);
        let attempt = self
            .render(kind, &mapping.source, raw)
            .and_then(|rendered| builder.convert_and_set(&mapping.target, &rendered).map(|_| ()));

        match attempt {
            Ok(()) => Ok(MappingOutcome::Written),
            Err(cause) => self.recover(input, mapping, raw, cause, builder),
        }
    }

    fn render(&self, kind: SourceKind, source: &str, raw: Option<&Value>) -> Result<String> {
        let instant = match kind {
            SourceKind::Epoch => self.epoch_instant(source, raw)?,
            SourceKind::Text => {
                let text = raw.and_then(Value::as_str).ok_or_else(|| {
                    TransformError::record(format!("Field '{}' has no string value", source))
                })?;
                let pattern = self.source_pattern.as_ref().ok_or_else(|| {
                    TransformError::MissingConfigError {
                        field: PROPERTY_SOURCE_FORMAT.to_string(),
                    }
                })?;
                pattern.parse(text)?
            }
        };
        self.target_pattern.format(&instant)
    }

    fn epoch_instant(&self, source: &str, raw: Option<&Value>) -> Result<DateTime<Utc>> {
        let value = raw.and_then(Value::as_i64).ok_or_else(|| {
            TransformError::record(format!("Field '{}' has no long value", source))
        })?;
        self.time_unit
            .to_millis(value)
            .and_then(DateTime::<Utc>::from_timestamp_millis)
            .ok_or_else(|| {
                TransformError::record(format!(
                    "Timestamp {} in field '{}' is out of range",
                    value, source
                ))
            })
    }

    /// Null or blank sources become null targets when allowed, otherwise the record
    /// is rejected; any other value that failed is fatal for the record.
    fn recover(
        &self,
        input: &Record,
        mapping: &FieldMapping,
        raw: Option<&Value>,
        cause: TransformError,
        builder: &mut RecordBuilder,
    ) -> Result<MappingOutcome> {
        if !is_blank(raw) {
            return Err(TransformError::ConversionError {
                field: mapping.source.clone(),
                value: raw.map(value_text).unwrap_or_default(),
                format: self.target_pattern.as_str().to_string(),
                cause: cause.to_string(),
            });
        }

        let nullable = self
            .output_schema
            .field(&mapping.target)
            .is_some_and(|f| f.schema.nullable);
        if nullable {
            builder.set(&mapping.target, Value::Null)?;
            return Ok(MappingOutcome::Written);
        }

        tracing::warn!(
            "Field '{}' is empty and '{}' is not nullable, routing record to error output",
            mapping.source,
            mapping.target
        );
        let message = format!("{} -> {} : {}", mapping.source, mapping.target, cause);
        Ok(MappingOutcome::Rejected(InvalidEntry::new(
            INVALID_ENTRY_CODE,
            message,
            input.clone(),
        )))
    }
}

fn is_blank(raw: Option<&Value>) -> bool {
    match raw {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.trim().is_empty(),
        Some(_) => false,
    }
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
