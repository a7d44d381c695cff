use crate::core::Emitter;
use crate::domain::model::{InvalidEntry, Record};
use crate::utils::error::Result;
use std::io::Write;

/// Keeps both output channels in memory.
#[derive(Debug, Default)]
pub struct CollectingEmitter {
    emitted: Vec<Record>,
    errors: Vec<InvalidEntry>,
}

impl CollectingEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn emitted(&self) -> &[Record] {
        &self.emitted
    }

    pub fn errors(&self) -> &[InvalidEntry] {
        &self.errors
    }
}

impl Emitter for CollectingEmitter {
    fn emit(&mut self, record: Record) -> Result<()> {
        self.emitted.push(record);
        Ok(())
    }

    fn emit_error(&mut self, entry: InvalidEntry) -> Result<()> {
        self.errors.push(entry);
        Ok(())
    }
}

/// Writes records and rejected entries as one JSON document per line.
pub struct JsonLinesEmitter<O: Write, E: Write> {
    output: O,
    errors: E,
    emitted_count: usize,
    error_count: usize,
}

impl<O: Write, E: Write> JsonLinesEmitter<O, E> {
    pub fn new(output: O, errors: E) -> Self {
        Self {
            output,
            errors,
            emitted_count: 0,
            error_count: 0,
        }
    }

    pub fn emitted_count(&self) -> usize {
        self.emitted_count
    }

    pub fn error_count(&self) -> usize {
        self.error_count
    }

    pub fn flush(&mut self) -> Result<()> {
        self.output.flush()?;
        self.errors.flush()?;
        Ok(())
    }
}

impl<O: Write, E: Write> Emitter for JsonLinesEmitter<O, E> {
    fn emit(&mut self, record: Record) -> Result<()> {
        serde_json::to_writer(&mut self.output, &record.to_json())?;
        self.output.write_all(b"\n")?;
        self.emitted_count += 1;
        Ok(())
    }

    fn emit_error(&mut self, entry: InvalidEntry) -> Result<()> {
        serde_json::to_writer(&mut self.errors, &entry.to_json())?;
        self.errors.write_all(b"\n")?;
        self.error_count += 1;
        Ok(())
    }
}
