use crate::config::{
    DateTransformConfig, PROPERTY_SCHEMA, PROPERTY_SOURCE_FIELDS, PROPERTY_SOURCE_FORMAT,
    PROPERTY_TARGET_FIELDS, PROPERTY_TARGET_FORMAT, PROPERTY_TIME_UNIT,
};
use crate::domain::schema::Schema;
use crate::utils::error::{Result, TransformError};
use crate::utils::validation::{validate_field_list, validate_non_empty_string, Validate};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Stage configuration file:
///
/// ```toml
/// [pipeline]
/// name = "orders"
///
/// [transform]
/// sourceFields = "created"
/// sourceFormat = "MM/dd/yy"
/// targetFields = "created_iso"
/// targetFormat = "${format}"
/// secondsOrMilliseconds = "Milliseconds"
/// schema = '''{"type":"record","name":"output","fields":[...]}'''
///
/// [input]
/// schema = '''{"type":"record","name":"input","fields":[...]}'''
///
/// [macros]
/// format = "yyyy-MM-dd"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TomlConfig {
    pub pipeline: Option<PipelineInfo>,
    pub transform: TransformProperties,
    pub input: Option<InputConfig>,
    pub macros: Option<HashMap<String, String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineInfo {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransformProperties {
    pub source_fields: String,
    pub source_format: Option<String>,
    pub target_fields: String,
    pub target_format: Option<String>,
    pub seconds_or_milliseconds: Option<String>,
    pub schema: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputConfig {
    pub schema: String,
}

impl TomlConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(TransformError::IoError)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| TransformError::ConfigError {
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// Replaces `${VAR}` with the environment variable of that name. Unknown names
    /// stay in place and are later treated as macros.
    fn substitute_env_vars(content: &str) -> Result<String> {
        use regex::Regex;
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| TransformError::ConfigError {
            message: format!("Invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn pipeline_name(&self) -> &str {
        self.pipeline
            .as_ref()
            .map(|p| p.name.as_str())
            .unwrap_or("date-transform")
    }

    pub fn transform_config(&self) -> Result<DateTransformConfig> {
        let t = &self.transform;
        let mut builder = DateTransformConfig::builder()
            .property(PROPERTY_SOURCE_FIELDS, &t.source_fields)?
            .property(PROPERTY_TARGET_FIELDS, &t.target_fields)?;
        let optional = [
            (PROPERTY_SOURCE_FORMAT, &t.source_format),
            (PROPERTY_TARGET_FORMAT, &t.target_format),
            (PROPERTY_TIME_UNIT, &t.seconds_or_milliseconds),
            (PROPERTY_SCHEMA, &t.schema),
        ];
        for (name, value) in optional {
            if let Some(value) = value {
                builder = builder.property(name, value)?;
            }
        }
        builder.build()
    }

    pub fn input_schema(&self) -> Result<Option<Schema>> {
        self.input
            .as_ref()
            .map(|input| Schema::parse_json(&input.schema))
            .transpose()
    }

    pub fn macros(&self) -> HashMap<String, String> {
        self.macros.clone().unwrap_or_default()
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        validate_field_list("transform.sourceFields", &self.transform.source_fields)?;
        validate_field_list("transform.targetFields", &self.transform.target_fields)?;
        if let Some(input) = &self.input {
            validate_non_empty_string("input.schema", &input.schema)?;
        }
        Ok(())
    }
}
