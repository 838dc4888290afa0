//! Domain layer: entities, value objects and the ports adapters implement.

pub mod cohort;
pub mod payment;
pub mod ports;
pub mod profile;
pub mod user;
