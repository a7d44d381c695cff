use crate::domain::model::{InvalidEntry, Record};
use crate::utils::error::Result;

/// Output channels of a transform: converted records and rejected ones.
pub trait Emitter {
    fn emit(&mut self, record: Record) -> Result<()>;
    fn emit_error(&mut self, entry: InvalidEntry) -> Result<()>;
}

impl<E: Emitter + ?Sized> Emitter for &mut E {
    fn emit(&mut self, record: Record) -> Result<()> {
        (**self).emit(record)
    }

    fn emit_error(&mut self, entry: InvalidEntry) -> Result<()> {
        (**self).emit_error(entry)
    }
}
