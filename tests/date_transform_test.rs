use anyhow::Result;
use chrono::{DateTime, Utc};
use date_transform::{
    CollectingEmitter, DateConverter, DateTransform, DateTransformConfig, Field, FieldSchema,
    FieldType, Record, RecordOutcome, Schema, TimeUnit, TransformError, INVALID_ENTRY_CODE,
};
use serde_json::{json, Value};
use std::sync::Arc;

fn schema(name: &str, fields: Vec<(&str, FieldSchema)>) -> Arc<Schema> {
    let fields = fields.into_iter().map(|(n, s)| Field::of(n, s)).collect();
    Arc::new(Schema::record_of(name, fields).unwrap())
}

fn string() -> FieldSchema {
    FieldSchema::of(FieldType::String)
}

fn nullable_string() -> FieldSchema {
    FieldSchema::nullable_of(FieldType::String)
}

fn record(schema: &Arc<Schema>, values: Value) -> Record {
    Record::from_json(Arc::clone(schema), &values).unwrap()
}

fn converter(
    sources: &str,
    targets: &str,
    unit: TimeUnit,
    output: &Arc<Schema>,
) -> Result<DateConverter> {
    let config = DateTransformConfig::builder()
        .source_fields(sources)
        .source_format("MM/dd/yy")
        .target_fields(targets)
        .target_format("yyyy-MM-dd")
        .time_unit(unit)
        .schema(output.to_json())
        .build()?;
    Ok(DateTransform::new(config).initialize()?)
}

fn render_millis(millis: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(millis)
        .unwrap()
        .format("%Y-%m-%d")
        .to_string()
}

#[test]
fn test_string_date_is_reformatted() -> Result<()> {
    let input = schema("input", vec![("a", string())]);
    let output = schema("output", vec![("a", string()), ("b", string())]);
    let conv = converter("a", "b", TimeUnit::Milliseconds, &output)?;

    let mut emitter = CollectingEmitter::new();
    conv.transform(&record(&input, json!({"a": "07/04/24"})), &mut emitter)?;

    assert_eq!(emitter.emitted().len(), 1);
    assert!(emitter.errors().is_empty());
    assert_eq!(emitter.emitted()[0].to_json(), json!({"a": "07/04/24", "b": "2024-07-04"}));
    Ok(())
}

#[test]
fn test_epoch_seconds_are_scaled() -> Result<()> {
    let input = schema("input", vec![("a", FieldSchema::nullable_of(FieldType::Long))]);
    let output = schema("output", vec![("a", string()), ("b", string())]);
    let conv = converter("a", "b", TimeUnit::Seconds, &output)?;

    match conv.convert(&record(&input, json!({"a": 1_700_000_000_i64})))? {
        RecordOutcome::Emitted(out) => {
            assert_eq!(out.get("b"), Some(&json!(render_millis(1_700_000_000_000))));
            assert_eq!(out.get("b"), Some(&json!("2023-11-14")));
        }
        other => panic!("unexpected outcome {:?}", other),
    }
    Ok(())
}

#[test]
fn test_epoch_milliseconds_used_as_is() -> Result<()> {
    let input = schema("input", vec![("a", FieldSchema::of(FieldType::Long))]);
    let output = schema("output", vec![("b", string())]);
    let conv = converter("a", "b", TimeUnit::Milliseconds, &output)?;

    for millis in [0_i64, 86_399_999, 1_720_051_200_000, -86_400_000] {
        let mut emitter = CollectingEmitter::new();
        conv.transform(&record(&input, json!({ "a": millis })), &mut emitter)?;
        assert_eq!(emitter.emitted()[0].get("b"), Some(&json!(render_millis(millis))));
    }
    Ok(())
}

#[test]
fn test_multiple_fields_convert_independently() -> Result<()> {
    let input = schema(
        "input",
        vec![
            ("a", FieldSchema::of(FieldType::Long)),
            ("b", string()),
        ],
    );
    let output = schema("output", vec![("c", string()), ("d", string())]);
    let conv = converter("a, b", "c, d", TimeUnit::Seconds, &output)?;

    let mut emitter = CollectingEmitter::new();
    conv.transform(
        &record(&input, json!({"a": 1_700_000_000_i64, "b": "12/31/99"})),
        &mut emitter,
    )?;

    let out = &emitter.emitted()[0];
    assert_eq!(out.get("c"), Some(&json!("2023-11-14")));
    assert_eq!(out.get("d"), Some(&json!("1999-12-31")));
    Ok(())
}

#[test]
fn test_passthrough_fields_are_copied() -> Result<()> {
    let input = schema(
        "input",
        vec![
            ("id", FieldSchema::of(FieldType::Long)),
            ("name", nullable_string()),
            ("a", string()),
            ("b", nullable_string()),
            ("ignored", string()),
        ],
    );
    let output = schema(
        "output",
        vec![
            ("id", FieldSchema::of(FieldType::Long)),
            ("name", nullable_string()),
            ("b", string()),
            ("extra", nullable_string()),
        ],
    );
    let conv = converter("a", "b", TimeUnit::Milliseconds, &output)?;

    let input_record = record(
        &input,
        json!({"id": 7, "name": null, "a": "01/02/03", "b": "stale", "ignored": "x"}),
    );
    let mut emitter = CollectingEmitter::new();
    conv.transform(&input_record, &mut emitter)?;

    assert_eq!(
        emitter.emitted()[0].to_json(),
        json!({"id": 7, "name": null, "b": "2003-01-02", "extra": null})
    );
    Ok(())
}

#[test]
fn test_null_source_with_nullable_target_writes_null() -> Result<()> {
    let input = schema("input", vec![("a", nullable_string())]);
    let output = schema("output", vec![("a", nullable_string()), ("b", nullable_string())]);
    let conv = converter("a", "b", TimeUnit::Milliseconds, &output)?;

    for values in [json!({"a": null}), json!({"a": ""}), json!({})] {
        let mut emitter = CollectingEmitter::new();
        conv.transform(&record(&input, values), &mut emitter)?;
        assert_eq!(emitter.emitted().len(), 1);
        assert!(emitter.errors().is_empty());
        assert_eq!(emitter.emitted()[0].get("b"), None);
    }
    Ok(())
}

#[test]
fn test_null_source_with_required_target_goes_to_error_output() -> Result<()> {
    let input = schema("input", vec![("a", nullable_string())]);
    let output = schema("output", vec![("a", nullable_string()), ("b", string())]);
    let conv = converter("a", "b", TimeUnit::Milliseconds, &output)?;

    let mut emitter = CollectingEmitter::new();
    conv.transform(&record(&input, json!({"a": "03/15/21"})), &mut emitter)?;
    let error_record = record(&input, json!({"a": null}));
    conv.transform(&error_record, &mut emitter)?;

    assert_eq!(emitter.emitted().len(), 1);
    assert_eq!(emitter.emitted()[0].get("b"), Some(&json!("2021-03-15")));
    assert_eq!(emitter.errors().len(), 1);
    assert_eq!(emitter.errors()[0].invalid_record, error_record);
    assert_eq!(emitter.errors()[0].error_code, INVALID_ENTRY_CODE);
    assert!(emitter.errors()[0].error_message.starts_with("a -> b : "));
    Ok(())
}

#[test]
fn test_blank_string_with_required_target_goes_to_error_output() -> Result<()> {
    let input = schema("input", vec![("a", nullable_string())]);
    let output = schema("output", vec![("a", nullable_string()), ("b", string())]);
    let conv = converter("a", "b", TimeUnit::Milliseconds, &output)?;

    for blank in ["", "   "] {
        let mut emitter = CollectingEmitter::new();
        let rejected = record(&input, json!({ "a": blank }));
        conv.transform(&rejected, &mut emitter)?;

        assert!(emitter.emitted().is_empty(), "value {:?}", blank);
        assert_eq!(emitter.errors().len(), 1, "value {:?}", blank);
        assert_eq!(emitter.errors()[0].invalid_record, rejected);
        assert_eq!(emitter.errors()[0].error_code, INVALID_ENTRY_CODE);
    }
    Ok(())
}

#[test]
fn test_null_long_with_required_target_goes_to_error_output() -> Result<()> {
    let input = schema("input", vec![("a", FieldSchema::nullable_of(FieldType::Long))]);
    let output = schema("output", vec![("b", string())]);
    let conv = converter("a", "b", TimeUnit::Seconds, &output)?;

    for values in [json!({"a": null}), json!({})] {
        let mut emitter = CollectingEmitter::new();
        conv.transform(&record(&input, values), &mut emitter)?;

        assert!(emitter.emitted().is_empty());
        assert_eq!(emitter.errors().len(), 1);
        assert!(emitter.errors()[0].error_message.starts_with("a -> b : "));
    }
    Ok(())
}

#[test]
fn test_unparseable_value_aborts_record() -> Result<()> {
    let input = schema("input", vec![("a", nullable_string())]);
    let output = schema("output", vec![("a", nullable_string()), ("b", nullable_string())]);
    let conv = converter("a", "b", TimeUnit::Milliseconds, &output)?;

    let mut emitter = CollectingEmitter::new();
    let err = conv
        .transform(&record(&input, json!({"a": "true"})), &mut emitter)
        .unwrap_err();

    match &err {
        TransformError::ConversionError { field, value, format, .. } => {
            assert_eq!(field, "a");
            assert_eq!(value, "true");
            assert_eq!(format, "yyyy-MM-dd");
        }
        other => panic!("unexpected error {:?}", other),
    }
    assert!(err.is_record_level());
    assert!(emitter.emitted().is_empty());
    assert!(emitter.errors().is_empty());
    Ok(())
}

#[test]
fn test_unsupported_source_type_aborts_record() -> Result<()> {
    let input = schema("input", vec![("a", FieldSchema::of(FieldType::Boolean))]);
    let output = schema("output", vec![("a", string()), ("b", string())]);
    let conv = converter("a", "b", TimeUnit::Milliseconds, &output)?;

    let mut emitter = CollectingEmitter::new();
    let err = conv
        .transform(&record(&input, json!({"a": true})), &mut emitter)
        .unwrap_err();

    assert!(matches!(err, TransformError::UnsupportedSourceType { ref found, .. } if found == "boolean"));
    assert!(emitter.emitted().is_empty());
    assert!(emitter.errors().is_empty());
    Ok(())
}

#[test]
fn test_logical_source_type_is_rejected_per_record() -> Result<()> {
    let input = schema(
        "input",
        vec![("a", FieldSchema::logical(FieldType::Long, "timestamp-micros"))],
    );
    let output = schema("output", vec![("b", string())]);
    let conv = converter("a", "b", TimeUnit::Milliseconds, &output)?;

    let err = conv.convert(&record(&input, json!({"a": 1}))).unwrap_err();
    assert!(matches!(err, TransformError::UnsupportedSourceType { .. }));
    Ok(())
}

#[test]
fn test_undeclared_source_field_is_skipped() -> Result<()> {
    let input = schema("input", vec![("other", string())]);
    let output = schema("output", vec![("other", string()), ("b", nullable_string())]);
    let conv = converter("a", "b", TimeUnit::Milliseconds, &output)?;

    match conv.convert(&record(&input, json!({"other": "x"})))? {
        RecordOutcome::Emitted(out) => {
            assert_eq!(out.to_json(), json!({"other": "x", "b": null}));
        }
        other => panic!("unexpected outcome {:?}", other),
    }
    Ok(())
}

#[test]
fn test_converter_is_shareable_across_threads() -> Result<()> {
    let input = schema("input", vec![("a", FieldSchema::of(FieldType::Long))]);
    let output = schema("output", vec![("b", string())]);
    let conv = Arc::new(converter("a", "b", TimeUnit::Seconds, &output)?);

    let handles: Vec<_> = (0..4_i64)
        .map(|day| {
            let conv = Arc::clone(&conv);
            let record = record(&input, json!({ "a": day * 86_400 }));
            std::thread::spawn(move || conv.convert(&record).map(|o| (day, o)))
        })
        .collect();

    for handle in handles {
        let (day, outcome) = handle.join().unwrap()?;
        match outcome {
            RecordOutcome::Emitted(out) => {
                assert_eq!(out.get("b"), Some(&json!(format!("1970-01-0{}", day + 1))));
            }
            other => panic!("unexpected outcome {:?}", other),
        }
    }
    Ok(())
}
