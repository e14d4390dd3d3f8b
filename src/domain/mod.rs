// Domain layer: models shared by every stage and the ports the pipeline drives.

pub mod model;
pub mod ports;
