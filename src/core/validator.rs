//! Checks a [`DateTransformConfig`] before any record flows through the converter.
//!
//! Checks that depend on a deferred property are skipped; they run again once the
//! macros are resolved, right before the converter is initialized.

use crate::config::{
    DateTransformConfig, Property, PROPERTY_SCHEMA, PROPERTY_SOURCE_FIELDS,
    PROPERTY_SOURCE_FORMAT, PROPERTY_TARGET_FIELDS, PROPERTY_TARGET_FORMAT,
};
use crate::core::failure::{FailureCollector, ValidationFailure};
use crate::core::pattern::DatePattern;
use crate::domain::schema::{FieldType, Schema};
use crate::utils::error::Result;

const PATTERN_HINT: &str =
    "Use a letter based date pattern such as 'yyyy-MM-dd' or 'MM/dd/yy HH:mm:ss'.";

/// Runs every configuration check, adding one failure per problem found.
///
/// Returns `Err` only when the collector is in fail-fast mode; in collect-all mode
/// the caller raises the accumulated failures through `get_or_throw`.
pub fn validate_config(
    config: &DateTransformConfig,
    input_schema: Option<&Schema>,
    collector: &mut FailureCollector,
) -> Result<()> {
    validate_output_schema(config, collector)?;
    validate_target_format(config.target_format.as_ref(), collector)?;
    validate_pattern(config.source_format.as_ref(), PROPERTY_SOURCE_FORMAT, collector)?;
    validate_field_counts(config, collector)?;

    match input_schema {
        Some(schema) => validate_source_fields(config, schema, collector),
        None => {
            tracing::debug!("No input schema yet, source field checks postponed");
            Ok(())
        }
    }
}

fn validate_output_schema(
    config: &DateTransformConfig,
    collector: &mut FailureCollector,
) -> Result<()> {
    let schema = match config.output_schema() {
        Ok(Some(schema)) => schema,
        Ok(None) => {
            return collector.add_failure(
                ValidationFailure::new("Output schema must be specified.")
                    .with_config_property(PROPERTY_SCHEMA),
            )
        }
        Err(e) => {
            return collector.add_failure(
                ValidationFailure::new("Output schema cannot be parsed.")
                    .with_config_property(PROPERTY_SCHEMA)
                    .with_underlying(&e),
            )
        }
    };

    let Some(targets) = config.target_fields() else {
        return Ok(());
    };
    for target in targets {
        if schema.field(&target).is_none() {
            collector.add_failure(
                ValidationFailure::new(format!(
                    "Target field '{}' is not present in output schema.",
                    target
                ))
                .with_config_element(PROPERTY_TARGET_FIELDS, &target)
                .with_output_schema_field(&target),
            )?;
        }
    }
    Ok(())
}

/// The target format renders every converted value, so it has to be set.
fn validate_target_format(
    property: Option<&Property>,
    collector: &mut FailureCollector,
) -> Result<()> {
    match property {
        Some(format) if !format.raw().trim().is_empty() => {
            validate_pattern(Some(format), PROPERTY_TARGET_FORMAT, collector)
        }
        _ => collector.add_failure(
            ValidationFailure::new("Target format must be specified.")
                .with_corrective_action(PATTERN_HINT)
                .with_config_property(PROPERTY_TARGET_FORMAT),
        ),
    }
}

pub fn validate_pattern(
    property: Option<&Property>,
    property_name: &str,
    collector: &mut FailureCollector,
) -> Result<()> {
    let Some(pattern) = property.and_then(Property::resolved) else {
        return Ok(());
    };
    if let Err(e) = DatePattern::compile(pattern) {
        collector.add_failure(
            ValidationFailure::new(format!(
                "Field '{}' contains invalid date pattern '{}'.",
                property_name, pattern
            ))
            .with_corrective_action(PATTERN_HINT)
            .with_config_property(property_name)
            .with_underlying(&e),
        )?;
    }
    Ok(())
}

fn validate_field_counts(
    config: &DateTransformConfig,
    collector: &mut FailureCollector,
) -> Result<()> {
    if let (Some(sources), Some(targets)) = (config.source_fields(), config.target_fields()) {
        if sources.len() != targets.len() {
            collector.add_failure(
                ValidationFailure::new(
                    "Target and source fields must contain the same number of fields.",
                )
                .with_config_property(PROPERTY_SOURCE_FIELDS)
                .with_config_property(PROPERTY_TARGET_FIELDS),
            )?;
        }
    }
    Ok(())
}

fn validate_source_fields(
    config: &DateTransformConfig,
    input_schema: &Schema,
    collector: &mut FailureCollector,
) -> Result<()> {
    let Some(sources) = config.source_fields() else {
        return Ok(());
    };

    for source in sources {
        let Some(field) = input_schema.field(&source) else {
            collector.add_failure(
                ValidationFailure::new(format!(
                    "Source field '{}' is not present in input schema.",
                    source
                ))
                .with_config_property(PROPERTY_SOURCE_FIELDS)
                .with_input_schema_field(&source),
            )?;
            continue;
        };

        // Logical types are rejected even when stored as string or long.
        let supported = field.schema.is_plain(FieldType::String) || field.schema.is_plain(FieldType::Long);
        if !supported {
            collector.add_failure(
                ValidationFailure::new(format!(
                    "Source field '{}' is unexpected type '{}'.",
                    source,
                    field.schema.display_name()
                ))
                .with_corrective_action("Supported types are 'string' or 'long'.")
                .with_config_property(PROPERTY_SOURCE_FIELDS)
                .with_input_schema_field(&source),
            )?;
        }
    }
    Ok(())
}
