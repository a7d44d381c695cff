use crate::utils::error::{Result, TransformError};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureCause {
    ConfigProperty(String),
    ConfigElement { property: String, element: String },
    InputSchemaField(String),
    OutputSchemaField(String),
    /// Text of the error that triggered the failure.
    Underlying(String),
}

/// One problem found while validating a stage configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationFailure {
    pub message: String,
    pub corrective_action: Option<String>,
    pub causes: Vec<FailureCause>,
}

impl ValidationFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            corrective_action: None,
            causes: Vec::new(),
        }
    }

    pub fn with_corrective_action(mut self, action: impl Into<String>) -> Self {
        self.corrective_action = Some(action.into());
        self
    }

    pub fn with_config_property(mut self, property: &str) -> Self {
        self.causes.push(FailureCause::ConfigProperty(property.to_string()));
        self
    }

    pub fn with_config_element(mut self, property: &str, element: &str) -> Self {
        self.causes.push(FailureCause::ConfigElement {
            property: property.to_string(),
            element: element.to_string(),
        });
        self
    }

    pub fn with_input_schema_field(mut self, field: &str) -> Self {
        self.causes.push(FailureCause::InputSchemaField(field.to_string()));
        self
    }

    pub fn with_output_schema_field(mut self, field: &str) -> Self {
        self.causes.push(FailureCause::OutputSchemaField(field.to_string()));
        self
    }

    pub fn with_underlying(mut self, error: &TransformError) -> Self {
        self.causes.push(FailureCause::Underlying(error.to_string()));
        self
    }

    pub fn config_properties(&self) -> impl Iterator<Item = &str> {
        self.causes.iter().filter_map(|cause| match cause {
            FailureCause::ConfigProperty(p) => Some(p.as_str()),
            FailureCause::ConfigElement { property, .. } => Some(property.as_str()),
            _ => None,
        })
    }

    pub fn full_message(&self) -> String {
        match &self.corrective_action {
            Some(action) => format!("{} {}", self.message, action),
            None => self.message.clone(),
        }
    }
}

impl fmt::Display for ValidationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.full_message())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CollectionMode {
    /// Gather every failure, raise them together from `get_or_throw`.
    #[default]
    CollectAll,
    /// Raise the first failure as soon as it is added.
    FailFast,
}

#[derive(Debug, Default)]
pub struct FailureCollector {
    mode: CollectionMode,
    failures: Vec<ValidationFailure>,
}

impl FailureCollector {
    pub fn new(mode: CollectionMode) -> Self {
        Self {
            mode,
            failures: Vec::new(),
        }
    }

    pub fn collect_all() -> Self {
        Self::new(CollectionMode::CollectAll)
    }

    pub fn fail_fast() -> Self {
        Self::new(CollectionMode::FailFast)
    }

    /// Records a failure. In fail-fast mode this returns the failure as an error right away.
    pub fn add_failure(&mut self, failure: ValidationFailure) -> Result<()> {
        tracing::debug!("Validation failure: {}", failure);
        self.failures.push(failure);
        match self.mode {
            CollectionMode::CollectAll => Ok(()),
            CollectionMode::FailFast => self.get_or_throw(),
        }
    }

    pub fn failures(&self) -> &[ValidationFailure] {
        &self.failures
    }

    pub fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn get_or_throw(&self) -> Result<()> {
        if self.failures.is_empty() {
            Ok(())
        } else {
            Err(TransformError::ValidationFailed {
                failures: self.failures.clone(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collect_all_defers_errors() {
        let mut collector = FailureCollector::collect_all();
        assert!(collector.get_or_throw().is_ok());

        collector
            .add_failure(ValidationFailure::new("first").with_config_property("a"))
            .unwrap();
        collector
            .add_failure(ValidationFailure::new("second").with_corrective_action("Fix it."))
            .unwrap();

        let err = collector.get_or_throw().unwrap_err();
        assert_eq!(err.failures().len(), 2);
        assert!(err.to_string().contains("first second Fix it."));
    }

    #[test]
    fn test_fail_fast_raises_first_failure() {
        let mut collector = FailureCollector::fail_fast();
        let err = collector
            .add_failure(ValidationFailure::new("boom").with_config_element("targetFields", "b"))
            .unwrap_err();
        assert_eq!(err.failures().len(), 1);
        assert_eq!(err.failures()[0].config_properties().collect::<Vec<_>>(), ["targetFields"]);
    }
}
