// Domain layer: core models and ports (interfaces). No runtime or HTTP types here.

pub mod model;
pub mod ports;
