#[cfg(feature = "cli")]
pub mod cli;
pub mod toml_config;

use crate::domain::schema::Schema;
use crate::utils::error::{Result, TransformError};
use regex::Regex;
use std::collections::HashMap;

pub const PROPERTY_SOURCE_FIELDS: &str = "sourceFields";
pub const PROPERTY_SOURCE_FORMAT: &str = "sourceFormat";
pub const PROPERTY_TARGET_FIELDS: &str = "targetFields";
pub const PROPERTY_TARGET_FORMAT: &str = "targetFormat";
pub const PROPERTY_TIME_UNIT: &str = "secondsOrMilliseconds";
pub const PROPERTY_SCHEMA: &str = "schema";

const MACRO_PATTERN: &str = r"\$\{([^}]+)\}";

fn macro_regex() -> Result<Regex> {
    Regex::new(MACRO_PATTERN).map_err(|e| TransformError::ConfigError {
        message: format!("Invalid macro pattern: {}", e),
    })
}

/// A plugin property, either known now or bound late through `${name}` macros.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Property {
    Resolved(String),
    Deferred(String),
}

impl Property {
    /// Classifies raw configuration text; anything holding a `${...}` is deferred.
    pub fn from_raw(raw: &str) -> Result<Self> {
        if macro_regex()?.is_match(raw) {
            Ok(Property::Deferred(raw.to_string()))
        } else {
            Ok(Property::Resolved(raw.to_string()))
        }
    }

    pub fn is_deferred(&self) -> bool {
        matches!(self, Property::Deferred(_))
    }

    pub fn resolved(&self) -> Option<&str> {
        match self {
            Property::Resolved(value) => Some(value),
            Property::Deferred(_) => None,
        }
    }

    pub fn raw(&self) -> &str {
        match self {
            Property::Resolved(value) | Property::Deferred(value) => value,
        }
    }

    fn resolve(&self, macros: &HashMap<String, String>) -> Result<Property> {
        let expression = match self {
            Property::Resolved(_) => return Ok(self.clone()),
            Property::Deferred(expression) => expression,
        };

        let re = macro_regex()?;
        if let Some(missing) = re
            .captures_iter(expression)
            .map(|caps| caps[1].to_string())
            .find(|name| !macros.contains_key(name))
        {
            return Err(TransformError::MissingConfigError {
                field: format!("macro '{}'", missing),
            });
        }
        let value = re.replace_all(expression, |caps: &regex::Captures| macros[&caps[1]].clone());
        Ok(Property::Resolved(value.into_owned()))
    }
}

/// How a numeric source field counts time since the epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimeUnit {
    Seconds,
    #[default]
    Milliseconds,
}

impl TimeUnit {
    /// `"Seconds"` selects seconds, any other flag means milliseconds.
    pub fn from_flag(flag: Option<&str>) -> Self {
        match flag {
            Some("Seconds") => TimeUnit::Seconds,
            _ => TimeUnit::Milliseconds,
        }
    }

    pub fn as_flag(&self) -> &'static str {
        match self {
            TimeUnit::Seconds => "Seconds",
            TimeUnit::Milliseconds => "Milliseconds",
        }
    }

    /// Epoch milliseconds for a raw value, `None` on overflow.
    pub fn to_millis(&self, value: i64) -> Option<i64> {
        match self {
            TimeUnit::Seconds => value.checked_mul(1000),
            TimeUnit::Milliseconds => Some(value),
        }
    }
}

/// Configuration of the date transform stage.
#[derive(Debug, Clone, PartialEq)]
pub struct DateTransformConfig {
    pub source_fields: Property,
    pub source_format: Option<Property>,
    pub target_fields: Property,
    pub target_format: Option<Property>,
    pub time_unit: TimeUnit,
    /// Output schema as JSON.
    pub schema: Option<String>,
}

impl DateTransformConfig {
    pub fn builder() -> DateTransformConfigBuilder {
        DateTransformConfigBuilder::default()
    }

    /// Trimmed source field names, `None` while the list is deferred.
    pub fn source_fields(&self) -> Option<Vec<String>> {
        self.source_fields.resolved().map(split_fields)
    }

    pub fn target_fields(&self) -> Option<Vec<String>> {
        self.target_fields.resolved().map(split_fields)
    }

    /// Parsed output schema, `None` when no schema is configured.
    pub fn output_schema(&self) -> Result<Option<Schema>> {
        match self.schema.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(json) => Schema::parse_json(json).map(Some),
        }
    }

    pub fn is_fully_resolved(&self) -> bool {
        self.deferred_properties().is_empty()
    }

    pub fn deferred_properties(&self) -> Vec<&'static str> {
        let mut deferred = Vec::new();
        if self.source_fields.is_deferred() {
            deferred.push(PROPERTY_SOURCE_FIELDS);
        }
        if self.source_format.as_ref().is_some_and(Property::is_deferred) {
            deferred.push(PROPERTY_SOURCE_FORMAT);
        }
        if self.target_fields.is_deferred() {
            deferred.push(PROPERTY_TARGET_FIELDS);
        }
        if self.target_format.as_ref().is_some_and(Property::is_deferred) {
            deferred.push(PROPERTY_TARGET_FORMAT);
        }
        deferred
    }

    /// Substitutes macro values into every deferred property.
    pub fn resolve(&self, macros: &HashMap<String, String>) -> Result<Self> {
        let resolve_opt = |p: &Option<Property>| p.as_ref().map(|p| p.resolve(macros)).transpose();
        Ok(Self {
            source_fields: self.source_fields.resolve(macros)?,
            source_format: resolve_opt(&self.source_format)?,
            target_fields: self.target_fields.resolve(macros)?,
            target_format: resolve_opt(&self.target_format)?,
            time_unit: self.time_unit,
            schema: self.schema.clone(),
        })
    }
}

fn split_fields(list: &str) -> Vec<String> {
    list.split(',').map(|f| f.trim().to_string()).collect()
}

#[derive(Debug, Clone, Default)]
pub struct DateTransformConfigBuilder {
    source_fields: Option<Property>,
    source_format: Option<Property>,
    target_fields: Option<Property>,
    target_format: Option<Property>,
    time_unit: TimeUnit,
    schema: Option<String>,
}

impl DateTransformConfigBuilder {
    pub fn source_fields(mut self, fields: &str) -> Self {
        self.source_fields = Some(Property::Resolved(fields.to_string()));
        self
    }

    pub fn source_format(mut self, format: &str) -> Self {
        self.source_format = Some(Property::Resolved(format.to_string()));
        self
    }

    pub fn target_fields(mut self, fields: &str) -> Self {
        self.target_fields = Some(Property::Resolved(fields.to_string()));
        self
    }

    pub fn target_format(mut self, format: &str) -> Self {
        self.target_format = Some(Property::Resolved(format.to_string()));
        self
    }

    /// Sets any property from raw text, marking it deferred when it holds a macro.
    pub fn property(mut self, name: &str, raw: &str) -> Result<Self> {
        match name {
            PROPERTY_SOURCE_FIELDS => self.source_fields = Some(Property::from_raw(raw)?),
            PROPERTY_SOURCE_FORMAT => self.source_format = Some(Property::from_raw(raw)?),
            PROPERTY_TARGET_FIELDS => self.target_fields = Some(Property::from_raw(raw)?),
            PROPERTY_TARGET_FORMAT => self.target_format = Some(Property::from_raw(raw)?),
            PROPERTY_TIME_UNIT => self.time_unit = TimeUnit::from_flag(Some(raw)),
            PROPERTY_SCHEMA => self.schema = Some(raw.to_string()),
            other => {
                return Err(TransformError::InvalidConfigValueError {
                    field: other.to_string(),
                    value: raw.to_string(),
                    reason: "Unknown property".to_string(),
                })
            }
        }
        Ok(self)
    }

    pub fn time_unit(mut self, unit: TimeUnit) -> Self {
        self.time_unit = unit;
        self
    }

    pub fn schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    pub fn build(self) -> Result<DateTransformConfig> {
        Ok(DateTransformConfig {
            source_fields: self.source_fields.ok_or_else(|| TransformError::MissingConfigError {
                field: PROPERTY_SOURCE_FIELDS.to_string(),
            })?,
            source_format: self.source_format,
            target_fields: self.target_fields.ok_or_else(|| TransformError::MissingConfigError {
                field: PROPERTY_TARGET_FIELDS.to_string(),
            })?,
            target_format: self.target_format,
            time_unit: self.time_unit,
            schema: self.schema,
        })
    }
}
