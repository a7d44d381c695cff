pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use crate::config::cli::CliConfig;

pub use crate::config::{DateTransformConfig, Property, TimeUnit};
pub use crate::core::converter::{
    DateConverter, FieldMapping, MappingOutcome, RecordOutcome, INVALID_ENTRY_CODE,
};
pub use crate::core::emitter::{CollectingEmitter, JsonLinesEmitter};
pub use crate::core::failure::{CollectionMode, FailureCollector, ValidationFailure};
pub use crate::core::pattern::DatePattern;
pub use crate::core::transform::DateTransform;
pub use crate::domain::model::{InvalidEntry, Record, RecordBuilder};
pub use crate::domain::ports::Emitter;
pub use crate::domain::schema::{Field, FieldSchema, FieldType, Schema};
pub use crate::utils::error::{Result, TransformError};
