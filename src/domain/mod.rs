// Domain layer: records, collaborator-facing models and the ports every adapter implements.

pub mod model;
pub mod ports;
pub mod sheet;
