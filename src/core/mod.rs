pub mod converter;
pub mod emitter;
pub mod failure;
pub mod pattern;
pub mod transform;
pub mod validator;

pub use crate::domain::model::{InvalidEntry, Record, RecordBuilder};
pub use crate::domain::ports::Emitter;
pub use crate::utils::error::Result;
