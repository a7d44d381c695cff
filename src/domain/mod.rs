// Domain layer: records, schemas and the output ports a transform writes to.

pub mod model;
pub mod ports;
pub mod schema;
