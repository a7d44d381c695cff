use anyhow::Context;
use clap::Parser;
use date_transform::config::toml_config::TomlConfig;
use date_transform::utils::{logger, validation::Validate};
use date_transform::{
    CliConfig, DateConverter, DateTransform, FailureCollector, JsonLinesEmitter, Record, Schema,
    TransformError,
};
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::sync::Arc;

fn main() {
    let args = CliConfig::parse();

    if args.json_logs {
        logger::init_json_logger();
    } else {
        logger::init_cli_logger(args.verbose);
    }

    if let Err(e) = run(&args) {
        tracing::error!("❌ date-transform failed: {:#}", e);
        if let Some(err) = e.downcast_ref::<TransformError>() {
            for failure in err.failures() {
                eprintln!("  - {}", failure);
            }
            eprintln!("💡 {}", err.recovery_suggestion());
        }
        std::process::exit(1);
    }
}

fn run(args: &CliConfig) -> anyhow::Result<()> {
    tracing::info!("📁 Loading configuration from: {}", args.config.display());
    let config = TomlConfig::from_file(&args.config)
        .with_context(|| format!("Failed to load config file '{}'", args.config.display()))?;
    config.validate()?;

    let input_schema = config.input_schema()?;
    let stage = DateTransform::new(config.transform_config()?);

    let mut collector = FailureCollector::collect_all();
    stage.configure_pipeline(input_schema.as_ref(), &mut collector)?;

    let stage = DateTransform::new(stage.config().resolve(&config.macros())?);
    let mut collector = FailureCollector::collect_all();
    stage.prepare_run(input_schema.as_ref(), &mut collector)?;
    tracing::info!("✅ Configuration of '{}' is valid", config.pipeline_name());

    if args.validate_only {
        return Ok(());
    }

    let converter = stage.initialize()?;
    let input_schema = Arc::new(
        input_schema.context("An [input] schema is required to read records")?,
    );

    let reader: Box<dyn BufRead> = match &args.input {
        Some(path) => Box::new(BufReader::new(
            File::open(path).with_context(|| format!("Cannot open input '{}'", path.display()))?,
        )),
        None => Box::new(BufReader::new(io::stdin())),
    };
    let errors: Box<dyn Write> = match &args.errors {
        Some(path) => Box::new(BufWriter::new(File::create(path)?)),
        None => Box::new(io::stderr()),
    };
    let mut emitter = JsonLinesEmitter::new(BufWriter::new(io::stdout().lock()), errors);

    let failed = process(reader, &input_schema, &converter, &mut emitter, args.fail_fast)?;
    emitter.flush()?;

    tracing::info!(
        "📊 {} record(s) emitted, {} rejected, {} failed",
        emitter.emitted_count(),
        emitter.error_count(),
        failed
    );
    if failed > 0 {
        anyhow::bail!("{} record(s) could not be converted", failed);
    }
    Ok(())
}

/// Converts every line and returns how many records failed outright.
fn process<O: Write, E: Write>(
    reader: Box<dyn BufRead>,
    input_schema: &Arc<Schema>,
    converter: &DateConverter,
    emitter: &mut JsonLinesEmitter<O, E>,
    fail_fast: bool,
) -> anyhow::Result<usize> {
    let mut failed = 0;
    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let line_no = index + 1;

        let result = serde_json::from_str(&line)
            .map_err(TransformError::from)
            .and_then(|value| Record::from_json(Arc::clone(input_schema), &value))
            .and_then(|record| converter.transform(&record, emitter));

        if let Err(e) = result {
            if fail_fast {
                return Err(anyhow::Error::new(e).context(format!("Line {}", line_no)));
            }
            tracing::error!("Line {}: {}", line_no, e);
            failed += 1;
        }
    }
    Ok(failed)
}
