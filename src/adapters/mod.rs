// Adapters layer: concrete implementations for external systems (container runtime, http).

pub mod docker;
pub mod http;
