use anyhow::Result;
use date_transform::config::{PROPERTY_SOURCE_FIELDS, PROPERTY_TARGET_FIELDS, PROPERTY_TARGET_FORMAT};
use date_transform::utils::validation::Validate;
use date_transform::{
    CollectingEmitter, DateTransform, DateTransformConfig, FailureCollector, Field, FieldSchema,
    FieldType, Property, Record, Schema, TransformError,
};
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;

const OUTPUT: &str = r#"{"type":"record","name":"output","fields":[
    {"name":"a","type":"string"},
    {"name":"b","type":"string"}
]}"#;

fn input_schema() -> Schema {
    Schema::record_of("input", vec![Field::of("a", FieldSchema::of(FieldType::String))]).unwrap()
}

fn config(sources: &str, targets: &str) -> DateTransformConfig {
    DateTransformConfig::builder()
        .source_fields(sources)
        .source_format("MM/dd/yy")
        .target_fields(targets)
        .target_format("yyyy-MM-dd")
        .schema(OUTPUT)
        .build()
        .unwrap()
}

#[test]
fn test_full_lifecycle() -> Result<()> {
    let stage = DateTransform::new(config("a", "b"));
    let input = input_schema();

    let output = stage.configure_pipeline(Some(&input), &mut FailureCollector::collect_all())?;
    assert_eq!(output, Some(Schema::parse_json(OUTPUT)?));

    stage.prepare_run(Some(&input), &mut FailureCollector::collect_all())?;
    let converter = stage.initialize()?;

    let mut emitter = CollectingEmitter::new();
    let record = Record::from_json(Arc::new(input), &json!({"a": "07/04/24"}))?;
    converter.transform(&record, &mut emitter)?;
    assert_eq!(emitter.emitted()[0].to_json(), json!({"a": "07/04/24", "b": "2024-07-04"}));
    Ok(())
}

#[test]
fn test_count_mismatch_fails_before_processing() {
    let stage = DateTransform::new(config("a", "a,b"));

    let err = stage
        .configure_pipeline(Some(&input_schema()), &mut FailureCollector::collect_all())
        .unwrap_err();
    let failure = &err.failures()[0];
    assert_eq!(
        failure.message,
        "Target and source fields must contain the same number of fields."
    );
    assert_eq!(
        failure.config_properties().collect::<Vec<_>>(),
        [PROPERTY_SOURCE_FIELDS, PROPERTY_TARGET_FIELDS]
    );

    assert!(matches!(stage.initialize(), Err(TransformError::ConfigError { .. })));
}

#[test]
fn test_invalid_patterns_fail_initialization() {
    for (source, target) in [("1234sdfg", "yyyy-MM-dd"), ("yyyy-MM-dd", "1234523909r")] {
        let config = DateTransformConfig::builder()
            .source_fields("a")
            .source_format(source)
            .target_fields("b")
            .target_format(target)
            .schema(OUTPUT)
            .build()
            .unwrap();
        let stage = DateTransform::new(config);

        assert!(matches!(
            stage.initialize(),
            Err(TransformError::InvalidDatePattern { .. })
        ));
        assert!(stage.validate().is_err());
    }
}

#[test]
fn test_missing_target_format_rejected_before_run() {
    let config = DateTransformConfig::builder()
        .source_fields("a")
        .source_format("MM/dd/yy")
        .target_fields("b")
        .schema(OUTPUT)
        .build()
        .unwrap();
    let stage = DateTransform::new(config);
    let input = input_schema();

    let err = stage
        .configure_pipeline(Some(&input), &mut FailureCollector::collect_all())
        .unwrap_err();
    assert_eq!(err.failures()[0].message, "Target format must be specified.");
    assert!(stage
        .prepare_run(Some(&input), &mut FailureCollector::collect_all())
        .is_err());
    assert!(stage.validate().is_err());
}

#[test]
fn test_missing_input_schema() -> Result<()> {
    let stage = DateTransform::new(config("a", "b"));

    // Definition time: source checks are postponed.
    stage.configure_pipeline(None, &mut FailureCollector::collect_all())?;

    let err = stage
        .prepare_run(None, &mut FailureCollector::collect_all())
        .unwrap_err();
    assert_eq!(err.failures()[0].message, "Input schema cannot be null.");
    Ok(())
}

#[test]
fn test_source_field_checks_against_input_schema() {
    let input = Schema::record_of(
        "input",
        vec![
            Field::of("flag", FieldSchema::of(FieldType::Boolean)),
            Field::of("day", FieldSchema::logical(FieldType::Int, "date")),
        ],
    )
    .unwrap();
    let stage = DateTransform::new(config("flag,day,gone", "a,b,b"));

    let err = stage
        .configure_pipeline(Some(&input), &mut FailureCollector::collect_all())
        .unwrap_err();
    let messages: Vec<String> = err.failures().iter().map(|f| f.full_message()).collect();
    assert_eq!(
        messages,
        [
            "Source field 'flag' is unexpected type 'boolean'. Supported types are 'string' or 'long'.",
            "Source field 'day' is unexpected type 'date'. Supported types are 'string' or 'long'.",
            "Source field 'gone' is not present in input schema.",
        ]
    );
}

#[test]
fn test_deferred_properties_are_checked_after_resolution() -> Result<()> {
    let config = DateTransformConfig::builder()
        .property(PROPERTY_SOURCE_FIELDS, "a")?
        .property(PROPERTY_TARGET_FIELDS, "${targets}")?
        .property(PROPERTY_TARGET_FORMAT, "${format}")?
        .schema(OUTPUT)
        .build()?;
    assert_eq!(config.target_fields, Property::Deferred("${targets}".to_string()));

    let stage = DateTransform::new(config);
    let input = input_schema();
    stage.configure_pipeline(Some(&input), &mut FailureCollector::collect_all())?;
    assert!(stage.prepare_run(Some(&input), &mut FailureCollector::collect_all()).is_err());
    assert!(stage.initialize().is_err());

    let bad_macros = HashMap::from([
        ("targets".to_string(), "b,missing".to_string()),
        ("format".to_string(), "yyyy".to_string()),
    ]);
    let resolved = DateTransform::new(stage.config().resolve(&bad_macros)?);
    let err = resolved
        .prepare_run(Some(&input), &mut FailureCollector::collect_all())
        .unwrap_err();
    assert_eq!(err.failures().len(), 2);

    let macros = HashMap::from([
        ("targets".to_string(), "b".to_string()),
        ("format".to_string(), "yyyy".to_string()),
    ]);
    let resolved = DateTransform::new(stage.config().resolve(&macros)?);
    resolved.prepare_run(Some(&input), &mut FailureCollector::collect_all())?;
    let converter = resolved.initialize()?;
    assert_eq!(converter.mappings()[0].target, "b");
    Ok(())
}
