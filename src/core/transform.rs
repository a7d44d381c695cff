use crate::config::{
    DateTransformConfig, PROPERTY_SCHEMA, PROPERTY_SOURCE_FIELDS, PROPERTY_SOURCE_FORMAT,
    PROPERTY_TARGET_FIELDS, PROPERTY_TARGET_FORMAT,
};
use crate::core::converter::{DateConverter, FieldMapping};
use crate::core::failure::{FailureCollector, ValidationFailure};
use crate::core::pattern::DatePattern;
use crate::core::validator::validate_config;
use crate::domain::schema::Schema;
use crate::utils::error::{Result, TransformError};
use crate::utils::validation::{validate_required_field, Validate};
use std::sync::Arc;

/// The date transform stage: validation at configure and submit time, then a
/// compiled [`DateConverter`] for the run.
#[derive(Debug, Clone)]
pub struct DateTransform {
    config: DateTransformConfig,
}

impl DateTransform {
    pub fn new(config: DateTransformConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DateTransformConfig {
        &self.config
    }

    /// Validates at pipeline definition time and returns the declared output schema.
    ///
    /// Without an input schema the source field checks wait for [`Self::prepare_run`].
    pub fn configure_pipeline(
        &self,
        input_schema: Option<&Schema>,
        collector: &mut FailureCollector,
    ) -> Result<Option<Schema>> {
        validate_config(&self.config, input_schema, collector)?;
        collector.get_or_throw()?;
        self.config.output_schema()
    }

    /// Validates right before the run, when every macro must have a value.
    pub fn prepare_run(
        &self,
        input_schema: Option<&Schema>,
        collector: &mut FailureCollector,
    ) -> Result<()> {
        let deferred = self.config.deferred_properties();
        if !deferred.is_empty() {
            return Err(TransformError::ConfigError {
                message: format!("Unresolved macros in: {}", deferred.join(", ")),
            });
        }
        let Some(input_schema) = input_schema else {
            collector.add_failure(ValidationFailure::new("Input schema cannot be null."))?;
            return collector.get_or_throw();
        };
        validate_config(&self.config, Some(input_schema), collector)?;
        collector.get_or_throw()
    }

    /// Compiles the patterns and field mappings used for every record.
    pub fn initialize(&self) -> Result<DateConverter> {
        let config = &self.config;
        let unresolved = |field: &str| TransformError::MissingConfigError {
            field: format!("{} (unresolved macro)", field),
        };

        let target_format = validate_required_field(PROPERTY_TARGET_FORMAT, &config.target_format)?;
        let target_pattern = DatePattern::compile(
            target_format
                .resolved()
                .ok_or_else(|| unresolved(PROPERTY_TARGET_FORMAT))?,
        )?;
        let source_pattern = match &config.source_format {
            Some(format) => Some(DatePattern::compile(
                format
                    .resolved()
                    .ok_or_else(|| unresolved(PROPERTY_SOURCE_FORMAT))?,
            )?),
            None => None,
        };

        let sources = config
            .source_fields()
            .ok_or_else(|| unresolved(PROPERTY_SOURCE_FIELDS))?;
        let targets = config
            .target_fields()
            .ok_or_else(|| unresolved(PROPERTY_TARGET_FIELDS))?;
        if sources.len() != targets.len() {
            return Err(TransformError::ConfigError {
                message: "Target and source fields must contain the same number of fields."
                    .to_string(),
            });
        }

        let output_schema = config.output_schema()?.ok_or_else(|| {
            TransformError::MissingConfigError {
                field: PROPERTY_SCHEMA.to_string(),
            }
        })?;

        let mappings = sources
            .into_iter()
            .zip(targets)
            .map(|(source, target)| FieldMapping { source, target })
            .collect::<Vec<_>>();

        tracing::info!(
            "Initialized date transform: {} mapping(s), target format '{}', {} epochs",
            mappings.len(),
            target_pattern.as_str(),
            config.time_unit.as_flag().to_lowercase()
        );

        DateConverter::new(
            source_pattern,
            target_pattern,
            config.time_unit,
            mappings,
            Arc::new(output_schema),
        )
    }
}

/// Legacy single pass check: stops at the first problem and never looks at the input schema.
impl Validate for DateTransform {
    fn validate(&self) -> Result<()> {
        let mut collector = FailureCollector::fail_fast();
        validate_config(&self.config, None, &mut collector)
    }
}
