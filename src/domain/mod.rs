// Domain layer: slice geometry, correspondence records and the ports the engine talks through.

pub mod geometry;
pub mod model;
pub mod ports;
